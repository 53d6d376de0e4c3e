//! The Lynx ruleset.
//!
//! [`Lynx`] owns a [`GameState`] and advances it one tick at a time. The
//! order of every pass below is fixed by recorded solutions; reordering any
//! of them changes which creature wins a contested cell.

mod choose;
mod housekeeping;
mod movement;
mod special;
#[cfg(test)]
pub(crate) mod testkit;

use tracing::warn;

use crate::creature::{flags, Creature};
use crate::dir::Dir;
use crate::grid::{LEVEL_SIZE, MAP_CELLS};
use crate::input::DirProvider;
use crate::link::{self, Location};
use crate::sound::{self, Sound, SoundEvent};
use crate::state::{floor_flags, status, EndReason, GameState, Outcome};
use crate::tile::{Floor, Kind, Tile};
use crate::time::ENDGAME_TICKS;

/// Flags for `can_make_move`.
mod cmm {
    /// Leaving a beartrap or clone machine.
    pub const RELEASING: u8 = 0x01;
    pub const CLEAR_ANIMATIONS: u8 = 0x02;
    /// Last check before moving; exposes hidden walls.
    pub const START_MOVEMENT: u8 = 0x04;
    pub const PUSH_BLOCKS: u8 = 0x08;
    /// Push blocks right away instead of on the block's own turn.
    pub const PUSH_BLOCKS_NOW: u8 = 0x10;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MoveResult {
    Died,
    Stalled,
    Moved,
}

/// Cell one step from `pos`, if `dir` is cardinal and the step stays on the map.
fn neighbor(pos: usize, dir: Dir) -> Option<usize> {
    let (x, y) = (pos % LEVEL_SIZE, pos / LEVEL_SIZE);
    let (x, y) = match dir {
        Dir::N => (Some(x), y.checked_sub(1)),
        Dir::W => (x.checked_sub(1), Some(y)),
        Dir::S => (Some(x), Some(y + 1)),
        Dir::E => (Some(x + 1), Some(y)),
        _ => return None,
    };
    match (x, y) {
        (Some(x), Some(y)) if x < LEVEL_SIZE && y < LEVEL_SIZE => Some(y * LEVEL_SIZE + x),
        _ => None,
    }
}

#[derive(Clone, Debug)]
pub struct Lynx {
    pub state: GameState,
    last_stepping: u8,
    /// Cell Chip is stepping into this tick.
    chip_to_pos: Option<usize>,
    /// Creature that started moving out of `chip_to_pos` this tick.
    chip_to_cr: Option<usize>,
}

impl Lynx {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            last_stepping: 0,
            chip_to_pos: None,
            chip_to_cr: None,
        }
    }

    #[inline]
    fn cr(&self, idx: usize) -> &Creature {
        &self.state.creatures[idx]
    }

    #[inline]
    fn cr_mut(&mut self, idx: usize) -> &mut Creature {
        &mut self.state.creatures[idx]
    }

    fn chip_pos(&self) -> Option<usize> {
        self.state.creatures.first().map(|c| c.pos)
    }

    fn chip_hidden(&self) -> bool {
        self.state.creatures.first().map_or(true, |c| c.hidden)
    }

    #[inline]
    fn floor_at(&self, pos: usize) -> Floor {
        self.state.floor_at(pos)
    }

    #[inline]
    fn set_floor_at(&mut self, pos: usize, floor: Floor) {
        self.state.set_floor_at(pos, floor);
    }

    #[inline]
    fn cell_has(&self, pos: usize, flag: u8) -> bool {
        self.state.map.at(pos).has(flag)
    }

    #[inline]
    fn claim(&mut self, pos: usize) {
        self.state.map.at_mut(pos).set(floor_flags::CLAIMED);
    }

    #[inline]
    fn unclaim(&mut self, pos: usize) {
        self.state.map.at_mut(pos).clear(floor_flags::CLAIMED);
    }

    fn in_endgame(&self) -> bool {
        self.state.endgame_timer > 0
    }

    fn add_sound(&mut self, sound: Sound) {
        self.state.sounds.push(SoundEvent::full(sound));
    }

    /// Queues a sound made by creature `idx`, fading with distance from Chip.
    fn add_sound_from(&mut self, sound: Sound, idx: usize) {
        let source = self.cr(idx).pos;
        let volume = self.chip_pos().map_or(1.0, |chip| sound::volume(source, chip));
        self.state.sounds.push(SoundEvent { sound, volume });
    }

    /// Direction of a slide floor. A random slide turns its shared direction
    /// clockwise first when `advance` is set.
    fn slide_dir(&mut self, floor: Floor, advance: bool) -> Dir {
        match floor {
            Floor::SlideNorth => Dir::N,
            Floor::SlideWest => Dir::W,
            Floor::SlideSouth => Dir::S,
            Floor::SlideEast => Dir::E,
            Floor::SlideRandom => {
                if advance {
                    self.state.random_slide_dir = self.state.random_slide_dir.right();
                }
                self.state.random_slide_dir
            }
            _ => {
                warn!(?floor, "slide direction asked of a non-slide floor");
                Dir::NONE
            }
        }
    }

    fn ice_wall_turn(&mut self, idx: usize) {
        let floor = self.floor_at(self.cr(idx).pos);
        let cr = self.cr_mut(idx);
        cr.dir = match (floor, cr.dir) {
            (Floor::IceWallNortheast, Dir::S) => Dir::E,
            (Floor::IceWallNortheast, Dir::W) => Dir::N,
            (Floor::IceWallSouthwest, Dir::N) => Dir::W,
            (Floor::IceWallSouthwest, Dir::E) => Dir::S,
            (Floor::IceWallNorthwest, Dir::S) => Dir::W,
            (Floor::IceWallNorthwest, Dir::E) => Dir::N,
            (Floor::IceWallSoutheast, Dir::N) => Dir::E,
            (Floor::IceWallSoutheast, Dir::W) => Dir::S,
            (_, dir) => dir,
        };
    }

    /// Visible, non-animation creature at `pos`. Chip is skipped unless asked for.
    fn lookup_creature(&self, pos: usize, include_chip: bool) -> Option<usize> {
        let start = usize::from(!include_chip);
        self.state
            .creatures
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, cr)| cr.pos == pos && !cr.hidden && !cr.id.is_animation())
            .map(|(i, _)| i)
    }

    /// Reuses the first hidden slot after Chip, or appends a hidden creature.
    fn new_creature(&mut self) -> usize {
        if let Some(i) = self.state.creatures.iter().skip(1).position(|cr| cr.hidden) {
            return i + 1;
        }
        self.state.creatures.push(Creature {
            hidden: true,
            ..Creature::default()
        });
        self.state.creatures.len() - 1
    }

    fn turn_tanks(&mut self) {
        for i in 0..self.state.creatures.len() {
            let cr = self.cr(i);
            if cr.hidden || cr.id != Kind::Tank {
                continue;
            }
            let floor = self.floor_at(cr.pos);
            if floor == Floor::CloneMachine || floor.is_ice() {
                continue;
            }
            self.cr_mut(i).state ^= flags::REVERSE;
        }
    }

    /// Turns creature `idx` into an animation in the same slot.
    fn remove_creature(&mut self, idx: usize, animation: Kind) {
        let (id, pos) = (self.cr(idx).id, self.cr(idx).pos);
        if id != Kind::Chip {
            self.unclaim(pos);
        }
        let frame = if (self.state.tick + u32::from(self.state.stepping)) & 1 != 0 {
            12
        } else {
            11
        };
        let cr = self.cr_mut(idx);
        cr.id = animation;
        cr.frame = frame - 1;
        cr.hidden = false;
        cr.state = 0;
        cr.tdir = Dir::NONE;
        if cr.moving == 8 {
            if let Some(back) = cr.pos.checked_add_signed(-cr.dir.offset()) {
                cr.pos = back;
            }
            cr.moving = 0;
        }
        let pos = cr.pos;
        self.state.map.at_mut(pos).set(floor_flags::ANIMATED);
    }

    fn remove_animation(&mut self, idx: usize) {
        let pos = self.cr(idx).pos;
        self.cr_mut(idx).hidden = true;
        self.state.map.at_mut(pos).clear(floor_flags::ANIMATED);
        let len = self.state.creatures.len();
        if len > 1 && idx == len - 1 {
            self.state.creatures.pop();
        }
    }

    fn stop_animation_at(&mut self, pos: usize) -> bool {
        let found = self
            .state
            .creatures
            .iter()
            .position(|cr| !cr.hidden && cr.pos == pos && cr.id.is_animation());
        match found {
            Some(i) => {
                self.remove_animation(i);
                true
            }
            None => false,
        }
    }

    /// Kills Chip. `also` is a creature that dies in the same collision.
    fn remove_chip(&mut self, reason: EndReason, also: Option<usize>) {
        if !self.state.creatures.is_empty() {
            match reason {
                EndReason::Water => {
                    self.add_sound(Sound::WaterSplash);
                    self.remove_creature(0, Kind::WaterSplash);
                }
                EndReason::Bomb => {
                    self.add_sound(Sound::BombExplodes);
                    self.remove_creature(0, Kind::BombExplosion);
                }
                EndReason::Time => {
                    self.add_sound(Sound::TimeOut);
                    self.remove_creature(0, Kind::EntityExplosion);
                }
                EndReason::Fire => {
                    self.add_sound(Sound::ChipLoses);
                    self.remove_creature(0, Kind::EntityExplosion);
                }
                EndReason::Monster | EndReason::Block => {
                    self.add_sound(Sound::ChipLoses);
                    self.remove_creature(0, Kind::EntityExplosion);
                    if let Some(other) = also.filter(|&i| i != 0) {
                        self.remove_creature(other, Kind::EntityExplosion);
                    }
                }
                EndReason::Exit => {}
            }
        }
        self.state.end_reason = Some(reason);
        self.state.endgame_timer = ENDGAME_TICKS;
    }

    fn collision_reason(&self, idx: usize) -> EndReason {
        if self.cr(idx).id.is_monster() {
            EndReason::Monster
        } else {
            EndReason::Block
        }
    }

    /// Prepares a freshly loaded state for play: pulls creatures out of the
    /// map, marks traps and teleports, and checks the button wiring. Returns
    /// false if the level was marked invalid.
    pub fn init_game(&mut self) -> bool {
        let mut chip_idx = None;
        for pos in 0..MAP_CELLS {
            let cell = self.state.map.at_mut(pos);
            for layer in [&mut cell.top, &mut cell.bottom] {
                if *layer == Tile::Floor(Floor::BlockStatic) {
                    *layer = Tile::Creature(Kind::Block, Dir::N);
                }
                if layer.is_ms_special() && *layer != Tile::Floor(Floor::ExitedChip) {
                    *layer = Tile::Floor(Floor::Wall);
                }
            }

            if let Tile::Creature(kind, dir) = cell.top {
                if !kind.is_animation() {
                    cell.top = cell.bottom;
                    cell.bottom = Tile::Floor(Floor::Empty);
                    let mut cr = Creature::new(pos, kind, dir);
                    if kind == Kind::Chip {
                        if chip_idx.is_some() {
                            warn!(level = self.state.level_number, "multiple Chips on the map");
                        }
                        chip_idx = Some(self.state.creatures.len());
                        cr.dir = Dir::S;
                    } else {
                        self.claim(pos);
                    }
                    self.state.creatures.push(cr);
                }
            }

            let cell = self.state.map.at_mut(pos);
            match cell.top {
                Tile::Floor(Floor::Beartrap) => cell.set(floor_flags::BEARTRAP),
                Tile::Floor(Floor::Teleport) => cell.set(floor_flags::TELEPORT),
                _ => {}
            }
        }

        let chip_idx = match chip_idx {
            Some(i) => Some(i),
            None => {
                warn!(level = self.state.level_number, "Chip isn't on the map");
                self.state.status |= status::INVALID;
                self.state.creatures.len().checked_sub(1)
            }
        };
        if let Some(i) = chip_idx.filter(|&i| i > 0) {
            self.state.creatures.swap(0, i);
        }

        let mut traps = std::mem::take(&mut self.state.trap_links);
        for link in &mut traps {
            self.check_link(link, Floor::ButtonBrown, Floor::Beartrap);
        }
        self.state.trap_links = traps;
        let mut cloners = std::mem::take(&mut self.state.clone_links);
        for link in &mut cloners {
            self.check_link(link, Floor::ButtonRed, Floor::CloneMachine);
        }
        self.state.clone_links = cloners;

        self.state.endgame_timer = 0;
        self.state.toggle_state = false;
        self.state.couldnt_move = false;
        self.state.pushing = false;
        self.state.stuck = false;
        self.state.completed = false;
        self.chip_to_pos = None;
        self.chip_to_cr = None;
        self.state.walker_rng.reset();
        self.state.stepping = self.last_stepping;

        self.prepare_display();
        self.state.sounds.clear();
        !self.state.is_invalid()
    }

    fn check_link(&self, link: &mut link::Link, button: Floor, target: Floor) {
        let Location { x, y } = link.button;
        if !link.button.on_map() || !link.target.on_map() {
            warn!(x, y, ?button, "ignoring off-map wiring");
            link.disabled = true;
        } else if self.floor_at(link.button.index()) != button {
            warn!(x, y, ?button, "wiring has no button");
        } else if self.floor_at(link.target.index()) != target {
            let Location { x, y } = link.target;
            warn!(x, y, ?target, "disabling miswired button");
            link.disabled = true;
        }
    }

    /// Advances the game by one tick, asking `input` for Chip's move.
    pub fn advance(&mut self, input: &mut dyn DirProvider) -> Outcome {
        self.state.sounds.clear();
        self.initial_housekeeping();

        for i in (0..self.state.creatures.len()).rev() {
            if i >= self.state.creatures.len() {
                continue;
            }
            let cr = self.cr_mut(i);
            cr.set_fdir(Dir::NONE);
            cr.tdir = Dir::NONE;
            if i != 0 && cr.hidden {
                continue;
            }
            if cr.id.is_animation() {
                cr.frame = cr.frame.saturating_sub(1);
                if cr.frame < 0 {
                    self.remove_animation(i);
                }
                continue;
            }
            if i == 0 && self.in_endgame() {
                continue;
            }
            if self.cr(i).moving <= 0 {
                self.choose_move(i, input);
            }
        }

        if let Some(chip) = self.state.creatures.first() {
            if chip.fdir().is_none() && chip.tdir.is_none() {
                self.state.couldnt_move = false;
            } else {
                self.check_moving_to();
            }
        }

        for i in (0..self.state.creatures.len()).rev() {
            if i >= self.state.creatures.len() {
                continue;
            }
            if i == 0 && self.state.completed {
                continue;
            }
            if i != 0 && self.cr(i).hidden {
                continue;
            }
            if self.advance_creature(i, false) == MoveResult::Died {
                continue;
            }
            let cr = self.cr_mut(i);
            cr.tdir = Dir::NONE;
            cr.set_fdir(Dir::NONE);
            let (pos, moving) = (cr.pos, cr.moving);
            if self.floor_at(pos) == Floor::ButtonBrown && moving <= 0 {
                self.spring_trap(link::target_of(&self.state.trap_links, pos));
            }
        }

        for i in (0..self.state.creatures.len()).rev() {
            if i >= self.state.creatures.len() {
                continue;
            }
            let cr = self.cr(i);
            if cr.hidden || cr.moving != 0 {
                continue;
            }
            if self.floor_at(cr.pos) == Floor::Teleport {
                self.teleport_creature(i);
            }
        }

        self.prepare_display();
        self.state.tick += 1;

        if self.in_endgame() {
            self.state.endgame_timer -= 1;
            if self.state.endgame_timer == 0 {
                return if self.state.completed {
                    Outcome::Completed
                } else {
                    Outcome::Died
                };
            }
        }
        Outcome::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::testkit::{self, Builder, Game};
    use super::*;
    use crate::input::Constant;
    use crate::link::Link;

    #[test]
    fn neighbor_stays_on_the_map() {
        assert_eq!(neighbor(0, Dir::E), Some(1));
        assert_eq!(neighbor(0, Dir::S), Some(32));
        assert_eq!(neighbor(0, Dir::N), None);
        assert_eq!(neighbor(0, Dir::W), None);
        assert_eq!(neighbor(31, Dir::E), None);
        assert_eq!(neighbor(MAP_CELLS - 1, Dir::S), None);
        assert_eq!(neighbor(40, Dir::NE), None);
    }

    #[test]
    fn init_puts_chip_first_and_claims_monsters() {
        let game = Game::grid("G.C", &[('G', Tile::Creature(Kind::Glider, Dir::E))]);
        let state = &game.lynx.state;
        assert_eq!(state.creatures.len(), 2);
        assert_eq!(state.creatures[0].id, Kind::Chip);
        assert_eq!(state.creatures[0].pos, 2);
        assert_eq!(state.creatures[0].dir, Dir::S);
        assert_eq!(state.creatures[1].id, Kind::Glider);
        assert!(state.map.at(0).has(floor_flags::CLAIMED));
        assert!(!state.map.at(2).has(floor_flags::CLAIMED));
        assert_eq!(state.map.at(0).top, Tile::Floor(Floor::Empty));
        assert!(!state.is_invalid());
    }

    #[test]
    fn creature_on_top_exposes_the_buried_tile() {
        let game = Builder::new()
            .put(3, 3, Tile::Creature(Kind::Tank, Dir::N))
            .put_bottom(3, 3, Tile::Floor(Floor::CloneMachine))
            .put(0, 0, Tile::Creature(Kind::Chip, Dir::S))
            .start();
        let pos = Location::new(3, 3).index();
        assert_eq!(game.lynx.state.floor_at(pos), Floor::CloneMachine);
        assert_eq!(game.lynx.state.map.at(pos).bottom, Tile::Floor(Floor::Empty));
    }

    #[test]
    fn missing_chip_marks_level_invalid() {
        let mut game = Builder::new()
            .put(4, 0, Tile::Creature(Kind::Ball, Dir::E))
            .start();
        assert!(game.lynx.state.is_invalid());
        assert_eq!(game.lynx.state.creatures[0].id, Kind::Ball);
        assert_eq!(game.tick(), Outcome::Playing);
    }

    #[test]
    fn empty_level_still_advances() {
        let mut lynx = Lynx::new(GameState::new());
        assert!(!lynx.init_game());
        let mut input = Constant(Dir::E);
        for _ in 0..8 {
            assert_eq!(lynx.advance(&mut input), Outcome::Playing);
        }
        assert_eq!(lynx.state.tick, 8);
    }

    #[test]
    fn static_blocks_and_leftover_tiles_are_converted() {
        let game = Game::grid(
            "Cbd",
            &[
                ('b', Tile::Floor(Floor::BlockStatic)),
                ('d', Tile::Floor(Floor::DrownedChip)),
            ],
        );
        let state = &game.lynx.state;
        assert_eq!(state.creatures[1].id, Kind::Block);
        assert_eq!(state.creatures[1].dir, Dir::N);
        assert_eq!(state.floor_at(2), Floor::Wall);
    }

    #[test]
    fn bad_wiring_and_extra_chips_leave_the_level_valid() {
        let mut builder = Builder::new();
        builder.rows(
            "Cbt.rC",
            &[
                ('b', Tile::Floor(Floor::ButtonBrown)),
                ('t', Tile::Floor(Floor::Beartrap)),
                ('r', Tile::Floor(Floor::ButtonRed)),
            ],
        );
        builder.state.trap_links = vec![
            Link::new(Location::new(1, 0), Location::new(2, 0)),
            Link::new(Location::new(1, 0), Location::new(3, 0)),
            Link::new(Location::new(1, 40), Location::new(2, 0)),
            Link::new(Location::new(3, 0), Location::new(2, 0)),
        ];
        builder.state.clone_links = vec![Link::new(Location::new(4, 0), Location::new(3, 0))];
        let game = builder.start();
        let traps = &game.lynx.state.trap_links;
        assert!(!traps[0].disabled);
        assert!(traps[1].disabled);
        assert!(traps[2].disabled);
        // no button: reported but left enabled
        assert!(!traps[3].disabled);
        assert!(game.lynx.state.clone_links[0].disabled);
        // recorded solutions exist for levels like this, so they stay playable
        assert!(!game.lynx.state.is_invalid());
        assert_eq!(game.lynx.state.creatures.len(), 2);
    }

    #[test]
    fn same_input_gives_same_checksum() {
        let run = || {
            let mut game = testkit::arena().with_input(Constant(Dir::E));
            game.lynx.state.main_prng.restart(77);
            game.ticks(200);
            game.lynx.state.checksum()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn different_seed_changes_the_blob() {
        let run = |seed| {
            let mut game = testkit::arena();
            game.lynx.state.main_prng.restart(seed);
            game.ticks(120);
            game.lynx.state.checksum()
        };
        assert_ne!(run(1), run(2));
    }
}
