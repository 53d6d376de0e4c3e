use crate::creature::flags;
use crate::dir::Dir;
use crate::grid::LEVEL_SIZE;
use crate::input::DirProvider;
use crate::movelaws::{may_enter, Mover};
use crate::state::floor_flags;
use crate::tile::{Floor, Kind};

use super::{cmm, neighbor, Lynx};

/// One entry in a monster's list of preferred moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Choice {
    Go(Dir),
    /// Turn a random number of quarter turns clockwise.
    WalkerTurn,
    /// Any cardinal direction, from the main generator.
    BlobTurn,
}

fn mover_for(id: Kind) -> Mover {
    match id {
        Kind::Chip => Mover::Chip,
        Kind::Block => Mover::Block,
        _ => Mover::Creature,
    }
}

/// Directions a thin wall or ice corner blocks on the way out.
fn blocked_exits(floor: Floor) -> Dir {
    match floor {
        Floor::WallNorth => Dir::N,
        Floor::WallWest => Dir::W,
        Floor::WallSouth => Dir::S,
        Floor::WallEast => Dir::E,
        Floor::WallSoutheast | Floor::IceWallNorthwest => Dir::S | Dir::E,
        Floor::IceWallNortheast => Dir::S | Dir::W,
        Floor::IceWallSouthwest => Dir::N | Dir::E,
        Floor::IceWallSoutheast => Dir::N | Dir::W,
        _ => Dir::NONE,
    }
}

impl Lynx {
    /// Whether creature `idx` may try to move in `dir`. Depending on `mode`
    /// this also pushes blocks, clears animations and exposes hidden walls.
    pub(super) fn can_make_move(&mut self, idx: usize, dir: Dir, mode: u8) -> bool {
        let (id, pos, boots) = {
            let cr = self.cr(idx);
            (cr.id, cr.pos, cr.boots)
        };
        let from = self.floor_at(pos);
        if dir.intersects(blocked_exits(from)) {
            return false;
        }
        if matches!(from, Floor::Beartrap | Floor::CloneMachine) && mode & cmm::RELEASING == 0 {
            return false;
        }
        if from.is_slide()
            && !(id == Kind::Chip && boots.force)
            && self.slide_dir(from, false) == dir.back()
        {
            return false;
        }

        let Some(to) = neighbor(pos, dir) else {
            return false;
        };
        let floor = match self.floor_at(to) {
            Floor::SwitchWallOpen if self.state.toggle_state => Floor::SwitchWallClosed,
            Floor::SwitchWallClosed if self.state.toggle_state => Floor::SwitchWallOpen,
            floor => floor,
        };

        match id {
            Kind::Chip => {
                if !may_enter(floor, Mover::Chip, dir) {
                    return false;
                }
                if floor == Floor::Socket && self.state.chips_needed > 0 {
                    return false;
                }
                if floor.is_door() && !self.cr(idx).has_key_for(floor) {
                    return false;
                }
                if self.cell_has(to, floor_flags::ANIMATED) {
                    return false;
                }
                if let Some(other) = self.lookup_creature(to, false) {
                    if self.cr(other).id == Kind::Block
                        && !self.can_push_block(other, dir, mode & !cmm::RELEASING)
                    {
                        return false;
                    }
                }
                if matches!(floor, Floor::HiddenWallTemp | Floor::BlueWallReal) {
                    if mode & cmm::START_MOVEMENT != 0 {
                        self.set_floor_at(to, Floor::Wall);
                    }
                    return false;
                }
            }
            Kind::Block => {
                if self.cr(idx).moving > 0 {
                    return false;
                }
                if !may_enter(floor, Mover::Block, dir) || self.cell_has(to, floor_flags::CLAIMED) {
                    return false;
                }
                if mode & cmm::CLEAR_ANIMATIONS != 0 && self.cell_has(to, floor_flags::ANIMATED) {
                    self.stop_animation_at(to);
                }
            }
            _ => {
                if !may_enter(floor, mover_for(id), dir)
                    || self.cell_has(to, floor_flags::CLAIMED)
                {
                    return false;
                }
                if floor == Floor::Fire && id != Kind::Fireball {
                    return false;
                }
                if mode & cmm::CLEAR_ANIMATIONS != 0 && self.cell_has(to, floor_flags::ANIMATED) {
                    self.stop_animation_at(to);
                }
            }
        }
        true
    }

    /// Whether the block at `block` can be shoved in `dir`. With a `mode` of
    /// `PUSH_BLOCKS_NOW` the block starts moving immediately.
    fn can_push_block(&mut self, block: usize, dir: Dir, mode: u8) -> bool {
        let pushing = mode & (cmm::PUSH_BLOCKS | cmm::PUSH_BLOCKS_NOW) != 0;
        if !self.can_make_move(block, dir, mode) {
            let cr = self.cr_mut(block);
            if cr.moving == 0 && pushing {
                cr.dir = dir;
            }
            return false;
        }
        if pushing {
            let cr = self.cr_mut(block);
            cr.dir = dir;
            cr.tdir = dir;
            cr.state |= flags::PUSHED;
            if mode & cmm::PUSH_BLOCKS_NOW != 0 {
                self.advance_creature(block, false);
            }
        }
        true
    }

    fn choose_creature_move(&mut self, idx: usize) {
        let (id, pos, dir) = {
            let cr = self.cr(idx);
            (cr.id, cr.pos, cr.dir)
        };
        if id.is_animation() {
            return;
        }
        self.cr_mut(idx).tdir = Dir::NONE;
        if id == Kind::Block || !self.cr(idx).fdir().is_none() {
            return;
        }
        if matches!(self.floor_at(pos), Floor::CloneMachine | Floor::Beartrap) {
            self.cr_mut(idx).tdir = dir;
            return;
        }

        use Choice::Go;
        let mut preferred = Dir::NONE;
        let choices: Vec<Choice> = match id {
            Kind::Tank => vec![Go(dir)],
            Kind::Ball => vec![Go(dir), Go(dir.back())],
            Kind::Glider => vec![Go(dir), Go(dir.left()), Go(dir.right()), Go(dir.back())],
            Kind::Fireball => vec![Go(dir), Go(dir.right()), Go(dir.left()), Go(dir.back())],
            Kind::Bug => vec![Go(dir.left()), Go(dir), Go(dir.right()), Go(dir.back())],
            Kind::Paramecium => vec![Go(dir.right()), Go(dir), Go(dir.left()), Go(dir.back())],
            Kind::Walker => vec![Go(dir), Choice::WalkerTurn],
            Kind::Blob => vec![Choice::BlobTurn],
            Kind::Teeth => {
                if (self.state.tick + u32::from(self.state.stepping)) & 4 != 0 {
                    return;
                }
                let Some(chip) = self.chip_pos() else {
                    return;
                };
                let dy = (chip / LEVEL_SIZE) as isize - (pos / LEVEL_SIZE) as isize;
                let dx = (chip % LEVEL_SIZE) as isize - (pos % LEVEL_SIZE) as isize;
                let vertical = match dy.signum() {
                    -1 => Dir::N,
                    1 => Dir::S,
                    _ => Dir::NONE,
                };
                let horizontal = match dx.signum() {
                    -1 => Dir::W,
                    1 => Dir::E,
                    _ => Dir::NONE,
                };
                let (first, second) = if dx.abs() > dy.abs() {
                    (horizontal, vertical)
                } else {
                    (vertical, horizontal)
                };
                preferred = first;
                vec![Go(first), Go(second)]
            }
            _ => Vec::new(),
        };

        for choice in choices {
            let dir = match choice {
                Go(d) if d.is_none() => break,
                Go(d) => d,
                Choice::WalkerTurn => {
                    let turns = self.state.walker_rng.next_u8() & 3;
                    (0..turns).fold(dir, |d, _| d.right())
                }
                Choice::BlobTurn => Dir::CLOCKWISE[usize::from(self.state.main_prng.random4())],
            };
            self.cr_mut(idx).tdir = dir;
            if self.can_make_move(idx, dir, cmm::CLEAR_ANIMATIONS) {
                return;
            }
        }

        if !preferred.is_none() {
            self.cr_mut(idx).tdir = preferred;
        }
    }

    /// Reads Chip's move from `input`. The input is always consumed, even
    /// when `discard` says Chip is being carried and may not choose.
    fn choose_chip_move(&mut self, idx: usize, discard: bool, input: &mut dyn DirProvider) {
        self.state.pushing = false;
        let dir = input.next_dir(&self.state);

        if dir.is_none() || discard || self.state.stuck {
            self.cr_mut(idx).tdir = Dir::NONE;
            return;
        }
        self.cr_mut(idx).tdir = dir;

        if dir.is_diagonal() {
            let facing = self.cr(idx).dir;
            let chosen = if facing.intersects(dir) {
                let ahead = self.can_make_move(idx, facing, cmm::PUSH_BLOCKS);
                let aside = self.can_make_move(idx, facing ^ dir, cmm::PUSH_BLOCKS);
                if !ahead && aside {
                    dir ^ facing
                } else {
                    facing
                }
            } else if self.can_make_move(idx, dir & (Dir::E | Dir::W), cmm::PUSH_BLOCKS) {
                dir & (Dir::E | Dir::W)
            } else {
                dir & (Dir::N | Dir::S)
            };
            self.cr_mut(idx).tdir = chosen;
        } else {
            self.can_make_move(idx, dir, cmm::PUSH_BLOCKS);
        }
    }

    /// Records any move forced by ice, slides or a teleport in the creature's
    /// forced direction. Returns true unless the creature may override it.
    fn forced_move(&mut self, idx: usize) -> bool {
        self.cr_mut(idx).set_fdir(Dir::NONE);
        if self.state.tick == 0 {
            return false;
        }
        let (id, pos, dir, boots) = {
            let cr = self.cr(idx);
            (cr.id, cr.pos, cr.dir, cr.boots)
        };
        let is_chip = id == Kind::Chip;
        let floor = self.floor_at(pos);

        if floor.is_ice() {
            if is_chip && (boots.skates || self.state.stuck) {
                return false;
            }
            if dir.is_none() {
                return false;
            }
            self.cr_mut(idx).set_fdir(dir);
            true
        } else if floor.is_slide() {
            if is_chip && boots.force {
                return false;
            }
            let slide = self.slide_dir(floor, true);
            let cr = self.cr_mut(idx);
            cr.set_fdir(slide);
            !cr.has(flags::SLIDE_TOKEN)
        } else if self.cr(idx).has(flags::TELEPORTED) {
            let cr = self.cr_mut(idx);
            cr.state &= !flags::TELEPORTED;
            cr.set_fdir(dir);
            true
        } else {
            false
        }
    }

    pub(super) fn choose_move(&mut self, idx: usize, input: &mut dyn DirProvider) {
        if self.cr(idx).id == Kind::Chip {
            let discard = self.forced_move(idx);
            self.choose_chip_move(idx, discard, input);
        } else if self.forced_move(idx) {
            self.cr_mut(idx).tdir = Dir::NONE;
        } else {
            self.choose_creature_move(idx);
        }
    }

    /// Notes the cell Chip is about to step into, for collision checks
    /// against creatures leaving it later in the same tick.
    pub(super) fn check_moving_to(&mut self) {
        self.chip_to_cr = None;
        self.chip_to_pos = self.state.creatures.first().and_then(|chip| {
            let dir = chip.tdir;
            if dir.is_none() || dir.is_diagonal() {
                None
            } else {
                neighbor(chip.pos, dir)
            }
        });
    }
}
