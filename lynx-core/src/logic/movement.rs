use tracing::warn;

use crate::creature::{flags, Boots};
use crate::dir::Dir;
use crate::link;
use crate::sound::Sound;
use crate::state::EndReason;
use crate::tile::{Floor, Kind};

use super::{cmm, neighbor, Lynx, MoveResult};

impl Lynx {
    /// Begins a move along `tdir`, or the forced direction if there is none.
    fn start_movement(&mut self, idx: usize, releasing: bool) -> MoveResult {
        let (id, pos, tdir, fdir, boots) = {
            let cr = self.cr(idx);
            (cr.id, cr.pos, cr.tdir, cr.fdir(), cr.boots)
        };
        let dir = if !tdir.is_none() {
            tdir
        } else if !fdir.is_none() {
            fdir
        } else {
            return MoveResult::Stalled;
        };
        self.cr_mut(idx).dir = dir;
        let from = self.floor_at(pos);
        let is_chip = id == Kind::Chip;

        if is_chip && !boots.force {
            let cr = self.cr_mut(idx);
            if from.is_slide() && tdir.is_none() {
                cr.state |= flags::SLIDE_TOKEN;
            } else if !from.is_ice() || boots.skates {
                cr.state &= !flags::SLIDE_TOKEN;
            }
        }

        let mut mode = cmm::PUSH_BLOCKS_NOW | cmm::CLEAR_ANIMATIONS | cmm::START_MOVEMENT;
        if releasing {
            mode |= cmm::RELEASING;
        }
        if !self.can_make_move(idx, dir, mode) {
            if is_chip {
                if !self.state.couldnt_move {
                    self.state.couldnt_move = true;
                    self.add_sound(Sound::CantMove);
                }
                self.state.pushing = true;
            }
            if from.is_ice() && !(is_chip && boots.skates) {
                self.cr_mut(idx).dir = dir.back();
                self.ice_wall_turn(idx);
            }
            return MoveResult::Stalled;
        }
        if is_chip && self.chip_to_pos.is_some() {
            self.state.chip_last_move_time = self.state.tick;
        }

        if !is_chip {
            self.unclaim(pos);
            if id != Kind::Block && Some(pos) == self.chip_to_pos {
                self.chip_to_cr = Some(idx);
            }
        } else if let Some(other) = self
            .chip_to_cr
            .filter(|&o| self.state.creatures.get(o).is_some_and(|cr| !cr.hidden))
        {
            self.cr_mut(other).moving = 8;
            let reason = self.collision_reason(other);
            self.remove_chip(reason, Some(other));
            return MoveResult::Died;
        }

        let Some(to) = neighbor(pos, dir) else {
            return MoveResult::Stalled;
        };
        let cr = self.cr_mut(idx);
        cr.pos = to;
        cr.moving += 8;
        if !is_chip {
            self.claim(to);
            if Some(to) == self.chip_pos() && !self.chip_hidden() {
                let reason = self.collision_reason(idx);
                self.remove_chip(reason, Some(idx));
                return MoveResult::Died;
            }
        } else {
            self.state.couldnt_move = false;
            if let Some(other) = self.lookup_creature(to, false) {
                let reason = self.collision_reason(other);
                self.remove_chip(reason, Some(other));
                return MoveResult::Died;
            }
        }

        if self.cr(idx).has(flags::PUSHED) {
            self.state.pushing = true;
        }
        MoveResult::Moved
    }

    /// Moves the creature one tick closer to its cell. Returns false once
    /// it has arrived.
    fn continue_movement(&mut self, idx: usize) -> bool {
        let (id, pos, boots) = {
            let cr = self.cr(idx);
            (cr.id, cr.pos, cr.boots)
        };
        if id.is_animation() || (id == Kind::Chip && self.state.stuck) {
            return true;
        }
        let is_chip = id == Kind::Chip;
        let floor = self.floor_at(pos);
        let mut speed = if id == Kind::Blob { 1 } else { 2 };
        if (floor.is_slide() && !(is_chip && boots.force))
            || (floor.is_ice() && !(is_chip && boots.skates))
        {
            speed *= 2;
        }
        let cr = self.cr_mut(idx);
        cr.moving -= speed;
        cr.frame = cr.moving.div_euclid(2);
        cr.moving > 0
    }

    /// Applies whatever the floor does to a creature that has just arrived.
    /// Returns false if the creature did not survive.
    fn end_movement(&mut self, idx: usize) -> bool {
        let (id, pos, boots) = {
            let cr = self.cr(idx);
            (cr.id, cr.pos, cr.boots)
        };
        if id.is_animation() {
            return true;
        }
        if id != Kind::Chip || !boots.skates {
            self.ice_wall_turn(idx);
        }
        let floor = self.floor_at(pos);

        match id {
            Kind::Chip => match floor {
                Floor::Water if !boots.flippers => {
                    self.remove_chip(EndReason::Water, None);
                    return false;
                }
                Floor::Fire if !boots.fire => {
                    self.remove_chip(EndReason::Fire, None);
                    return false;
                }
                Floor::Dirt | Floor::BlueWallFake => self.set_floor_at(pos, Floor::Empty),
                Floor::PopupWall => {
                    self.set_floor_at(pos, Floor::Wall);
                    self.add_sound(Sound::WallCreated);
                }
                door if door.is_door() => {
                    let chip = self.cr_mut(idx);
                    if !chip.has_key_for(door) {
                        warn!(?door, "opened a door without its key");
                    }
                    chip.use_key_for(door);
                    self.set_floor_at(pos, Floor::Empty);
                    self.add_sound(Sound::DoorOpened);
                }
                key if key.is_key() => {
                    self.cr_mut(idx).add_key_for(key);
                    self.set_floor_at(pos, Floor::Empty);
                    self.add_sound(Sound::KeyCollected);
                }
                item if item.is_boots() => {
                    self.cr_mut(idx).add_boots_for(item);
                    self.set_floor_at(pos, Floor::Empty);
                    self.add_sound(Sound::BootsCollected);
                }
                Floor::Burglar => {
                    self.cr_mut(idx).boots = Boots::default();
                    self.add_sound(Sound::BootsStolen);
                }
                Floor::IcChip => {
                    self.state.chips_needed = self.state.chips_needed.saturating_sub(1);
                    self.set_floor_at(pos, Floor::Empty);
                    self.add_sound(Sound::IcCollected);
                }
                Floor::Socket => {
                    self.set_floor_at(pos, Floor::Empty);
                    self.add_sound(Sound::SocketOpened);
                }
                Floor::Exit => {
                    self.cr_mut(idx).hidden = true;
                    self.state.completed = true;
                    self.state.end_reason = Some(EndReason::Exit);
                    self.add_sound(Sound::ChipWins);
                }
                _ => {}
            },
            Kind::Block => match floor {
                Floor::Water => {
                    self.set_floor_at(pos, Floor::Dirt);
                    self.add_sound(Sound::WaterSplash);
                    self.remove_creature(idx, Kind::WaterSplash);
                    return false;
                }
                Floor::KeyBlue => self.set_floor_at(pos, Floor::Empty),
                _ => {}
            },
            _ => match floor {
                Floor::Water if id != Kind::Glider => {
                    self.add_sound_from(Sound::WaterSplash, idx);
                    self.remove_creature(idx, Kind::WaterSplash);
                    return false;
                }
                Floor::KeyBlue => self.set_floor_at(pos, Floor::Empty),
                _ => {}
            },
        }

        match floor {
            Floor::Bomb => {
                self.set_floor_at(pos, Floor::Empty);
                if id == Kind::Chip {
                    self.add_sound(Sound::BombExplodes);
                    self.remove_chip(EndReason::Bomb, None);
                } else {
                    self.add_sound_from(Sound::BombExplodes, idx);
                    self.remove_creature(idx, Kind::BombExplosion);
                }
                return false;
            }
            Floor::ButtonBlue => {
                self.turn_tanks();
                self.add_sound_from(Sound::ButtonPushed, idx);
            }
            Floor::ButtonGreen => {
                self.state.toggle_state = !self.state.toggle_state;
                self.add_sound_from(Sound::ButtonPushed, idx);
            }
            Floor::ButtonRed => {
                let cloner = link::target_of(&self.state.clone_links, pos);
                if self.activate_cloner(cloner) {
                    self.add_sound_from(Sound::ButtonPushed, idx);
                }
            }
            Floor::ButtonBrown => self.add_sound_from(Sound::ButtonPushed, idx),
            Floor::Dirt | Floor::BlueWallFake | Floor::Socket => {
                self.set_floor_at(pos, Floor::Empty);
            }
            _ => {}
        }
        true
    }

    /// Starts, continues or finishes the current move of creature `idx`.
    /// `releasing` marks an out-of-turn move off a beartrap or clone machine,
    /// along the creature's facing.
    pub(super) fn advance_creature(&mut self, idx: usize, releasing: bool) -> MoveResult {
        let (moving, animation, idle) = {
            let cr = self.cr(idx);
            (cr.moving, cr.id.is_animation(), cr.tdir.is_none() && cr.fdir().is_none())
        };
        if moving <= 0 && !animation {
            let mut saved = Dir::NONE;
            if releasing {
                let cr = self.cr_mut(idx);
                saved = cr.tdir;
                cr.tdir = cr.dir;
            } else if idle {
                return MoveResult::Moved;
            }
            match self.start_movement(idx, releasing) {
                MoveResult::Died => return MoveResult::Died,
                MoveResult::Stalled => {
                    if releasing {
                        self.cr_mut(idx).tdir = saved;
                    }
                    return MoveResult::Stalled;
                }
                MoveResult::Moved => {
                    let cr = self.cr_mut(idx);
                    cr.hidden = false;
                    cr.tdir = Dir::NONE;
                }
            }
        }

        if !self.continue_movement(idx) && !self.end_movement(idx) {
            return MoveResult::Died;
        }
        MoveResult::Moved
    }
}
