use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::creature::Creature;
use crate::dir::Dir;
use crate::grid::Grid2D;
use crate::link::Link;
use crate::rng::{Prng, WalkerRng};
use crate::sound::SoundEvent;
use crate::tile::{Floor, Tile};
use crate::time;

/// Bits of [`MapCell::state`].
pub mod floor_flags {
    pub const CLAIMED: u8 = 0x01;
    pub const ANIMATED: u8 = 0x02;
    /// There is or was a beartrap here.
    pub const BEARTRAP: u8 = 0x04;
    /// There is or was a teleport here.
    pub const TELEPORT: u8 = 0x08;
}

/// Bits of [`GameState::status`].
pub mod status {
    /// The level cannot be certified: no Chip, broken wiring, ...
    pub const INVALID: u8 = 0x02;
    pub const SHOW_HINT: u8 = 0x08;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapCell {
    pub top: Tile,
    pub bottom: Tile,
    pub state: u8,
}

impl MapCell {
    pub fn new(top: Tile, bottom: Tile) -> Self {
        Self {
            top,
            bottom,
            state: 0,
        }
    }

    #[inline]
    pub fn has(&self, flag: u8) -> bool {
        self.state & flag != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u8) {
        self.state |= flag;
    }

    #[inline]
    pub fn clear(&mut self, flag: u8) {
        self.state &= !flag;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EndReason {
    Exit = 1,
    Time = 2,
    Monster = 3,
    Block = 4,
    Fire = 5,
    Water = 6,
    Bomb = 7,
}

impl EndReason {
    pub const ALL: [EndReason; 7] = [
        EndReason::Exit,
        EndReason::Time,
        EndReason::Monster,
        EndReason::Block,
        EndReason::Fire,
        EndReason::Water,
        EndReason::Bomb,
    ];

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(code: u8) -> Option<EndReason> {
        EndReason::ALL.iter().copied().find(|r| r.as_u8() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Exit => "level completed",
            Self::Time => "out of time",
            Self::Monster => "caught by a creature",
            Self::Block => "crushed by a block",
            Self::Fire => "burned",
            Self::Water => "drowned",
            Self::Bomb => "blown up",
        }
    }
}

/// Result of advancing one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Playing,
    Died,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub level_number: u16,
    pub title: String,
    pub password: String,
    pub hint: String,

    pub map: Grid2D<MapCell>,
    /// Chip is always at index 0 once the game is initialized.
    pub creatures: Vec<Creature>,
    pub trap_links: Vec<Link>,
    pub clone_links: Vec<Link>,

    pub tick: u32,
    pub time_limit_ticks: u32,
    pub chips_needed: u16,
    pub status: u8,
    pub random_slide_dir: Dir,
    /// Step parity, `0..=7`, offsets the tick for teeth and animation timing.
    pub stepping: u8,
    pub main_prng: Prng,
    pub walker_rng: WalkerRng,

    pub toggle_state: bool,
    pub completed: bool,
    pub stuck: bool,
    pub pushing: bool,
    pub couldnt_move: bool,
    pub endgame_timer: u8,
    pub chip_last_move_time: u32,
    pub end_reason: Option<EndReason>,

    /// Sounds made during the last tick.
    pub sounds: Vec<SoundEvent>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            level_number: 0,
            title: String::new(),
            password: String::new(),
            hint: String::new(),
            map: Grid2D::square(MapCell::default()),
            creatures: Vec::new(),
            trap_links: Vec::new(),
            clone_links: Vec::new(),
            tick: 0,
            time_limit_ticks: 0,
            chips_needed: 0,
            status: 0,
            random_slide_dir: Dir::N,
            stepping: 0,
            main_prng: Prng::default(),
            walker_rng: WalkerRng::default(),
            toggle_state: false,
            completed: false,
            stuck: false,
            pushing: false,
            couldnt_move: false,
            endgame_timer: 0,
            chip_last_move_time: 0,
            end_reason: None,
            sounds: Vec::new(),
        }
    }

    pub fn chip(&self) -> Option<&Creature> {
        self.creatures.first()
    }

    /// The floor on top at `pos`; creature tiles left in the map read as `Nothing`.
    #[inline]
    pub fn floor_at(&self, pos: usize) -> Floor {
        self.map.at(pos).top.floor().unwrap_or(Floor::Nothing)
    }

    #[inline]
    pub fn set_floor_at(&mut self, pos: usize, floor: Floor) {
        self.map.at_mut(pos).top = Tile::Floor(floor);
    }

    pub fn time_left(&self) -> Option<i64> {
        time::seconds_left(self.time_limit_ticks, self.tick)
    }

    /// IC chips lying on either layer.
    pub fn count_chips(&self) -> usize {
        let chip = Tile::Floor(Floor::IcChip);
        self.map
            .as_slice()
            .iter()
            .filter(|c| c.top == chip || c.bottom == chip)
            .count()
    }

    pub fn is_invalid(&self) -> bool {
        self.status & status::INVALID != 0
    }

    pub fn show_hint(&self) -> bool {
        self.status & status::SHOW_HINT != 0
    }

    pub fn drain_sounds(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sounds)
    }

    pub fn checksum(&self) -> String {
        let mut h = Hasher::new();
        for cell in self.map.as_slice() {
            h.update(&[cell.top.code(), cell.bottom.code(), cell.state]);
        }
        h.update(&(self.creatures.len() as u32).to_le_bytes());
        for cr in &self.creatures {
            h.update(&(cr.pos as u32).to_le_bytes());
            h.update(&[
                cr.id.as_u8(),
                cr.dir.bits(),
                cr.moving as u8,
                cr.frame as u8,
                u8::from(cr.hidden),
                cr.state,
                cr.tdir.bits(),
                cr.boots.bits(),
            ]);
            for count in [cr.keys.red, cr.keys.blue, cr.keys.yellow, cr.keys.green] {
                h.update(&count.to_le_bytes());
            }
        }
        for link in self.trap_links.iter().chain(&self.clone_links) {
            for v in [link.button.x, link.button.y, link.target.x, link.target.y] {
                h.update(&v.to_le_bytes());
            }
            h.update(&[u8::from(link.disabled)]);
        }
        h.update(&self.tick.to_le_bytes());
        h.update(&self.time_limit_ticks.to_le_bytes());
        h.update(&self.chips_needed.to_le_bytes());
        h.update(&self.main_prng.value().to_le_bytes());
        h.update(&self.chip_last_move_time.to_le_bytes());
        h.update(&[
            self.status,
            self.random_slide_dir.bits(),
            self.stepping,
            self.walker_rng.r1,
            self.walker_rng.r2,
            u8::from(self.toggle_state),
            u8::from(self.completed),
            u8::from(self.stuck),
            u8::from(self.pushing),
            u8::from(self.couldnt_move),
            self.endgame_timer,
            self.end_reason.map_or(0, EndReason::as_u8),
        ]);
        h.finalize().to_hex().to_string()
    }
}
