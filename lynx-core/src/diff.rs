//! Reverse diffs between consecutive game states.
//!
//! `capture(before, after)` records just enough of `before` to rebuild it
//! from `after`; `apply` does the rebuilding in place. The record is a flat
//! stream of 5-bit field codes, each followed by that field's value. Map
//! cells and creatures open a nested group closed by [`field::END`], and the
//! whole stream ends with a zero code.

use thiserror::Error;

use crate::bits::{BitBuf, BitReader, BitWriter};
use crate::creature::{Boots, Creature, Keys};
use crate::dir::Dir;
use crate::grid::MAP_CELLS;
use crate::rng::WalkerRng;
use crate::sound::{Sound, SoundEvent};
use crate::state::{EndReason, GameState, MapCell};
use crate::tile::{Floor, Kind, Tile};

const CODE_BITS: u32 = 5;
const POS_BITS: u32 = 10;
const INDEX_BITS: u32 = 16;
const DIR_BITS: u32 = 4;

/// Field codes. Zero terminates the stream.
mod field {
    pub const FLAGS: u8 = 1;
    pub const MAIN_PRNG: u8 = 2;
    pub const WALKER_RNG: u8 = 3;
    pub const CHIPS_NEEDED: u8 = 4;
    pub const RANDOM_SLIDE_DIR: u8 = 5;
    pub const ENDGAME_TIMER: u8 = 6;
    pub const END_REASON: u8 = 7;
    pub const CHIP_LAST_MOVE_TIME: u8 = 8;
    pub const SOUNDS_RESET: u8 = 9;
    pub const SOUND: u8 = 10;
    pub const TICK: u8 = 11;
    pub const STATUS: u8 = 12;
    pub const STEPPING: u8 = 13;

    pub const MAP_POS: u8 = 14;
    pub const MAP_TOP: u8 = 15;
    pub const MAP_BOTTOM: u8 = 16;
    pub const MAP_STATE: u8 = 17;

    pub const CR_INDEX: u8 = 18;
    pub const CR_POS: u8 = 19;
    pub const CR_ID: u8 = 20;
    pub const CR_DIR: u8 = 21;
    pub const CR_MOVING: u8 = 22;
    pub const CR_FRAME: u8 = 23;
    pub const CR_HIDDEN: u8 = 24;
    pub const CR_STATE: u8 = 25;
    pub const CR_TDIR: u8 = 26;
    pub const CR_BOOTS: u8 = 27;
    pub const CR_KEYS: u8 = 28;
    pub const CR_ADD: u8 = 29;
    pub const CR_TRUNCATE: u8 = 30;

    pub const END: u8 = 31;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("diff ended in the middle of a record")]
    Truncated,
    #[error("unknown field code {code} at bit {bit}")]
    UnknownField { code: u8, bit: usize },
    #[error("map position {0} is off the map")]
    BadPosition(usize),
    #[error("creature index {index} out of range (have {len})")]
    BadCreature { index: usize, len: usize },
    #[error("invalid tile code {0:#04x}")]
    BadTile(u8),
    #[error("invalid creature kind {0:#04x}")]
    BadKind(u8),
    #[error("invalid sound id {0}")]
    BadSound(u8),
    #[error("invalid end reason {0}")]
    BadEndReason(u8),
}

/// One tick's worth of rewind information.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateDiff {
    bits: BitBuf,
}

impl StateDiff {
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    pub fn byte_size(&self) -> usize {
        self.bits.byte_size()
    }
}

fn flags_of(s: &GameState) -> u64 {
    [s.toggle_state, s.completed, s.stuck, s.pushing, s.couldnt_move]
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | u64::from(b) << i)
}

fn set_flags(s: &mut GameState, bits: u64) {
    let bit = |i: u32| bits & (1 << i) != 0;
    s.toggle_state = bit(0);
    s.completed = bit(1);
    s.stuck = bit(2);
    s.pushing = bit(3);
    s.couldnt_move = bit(4);
}

struct Writer(BitWriter);

impl Writer {
    fn code(&mut self, code: u8) {
        self.0.write(u64::from(code), CODE_BITS);
    }

    fn field(&mut self, code: u8, value: u64, width: u32) {
        self.code(code);
        self.0.write(value, width);
    }

    fn tile(&mut self, code: u8, tile: Tile) {
        self.code(code);
        self.0.write(u64::from(tile.code()), 8);
        if let Tile::Creature(_, dir) = tile {
            self.0.write(u64::from(dir.bits()), DIR_BITS);
        }
    }

    /// Fields of `cr` that differ from `other`, or all of them.
    fn creature(&mut self, cr: &Creature, other: Option<&Creature>) {
        let changed = |f: fn(&Creature) -> u64| other.map_or(true, |o| f(o) != f(cr));
        if changed(|c| c.pos as u64) {
            self.field(field::CR_POS, cr.pos as u64, POS_BITS);
        }
        if changed(|c| u64::from(c.id.as_u8())) {
            self.field(field::CR_ID, u64::from(cr.id.as_u8()), 8);
        }
        if changed(|c| u64::from(c.dir.bits())) {
            self.field(field::CR_DIR, u64::from(cr.dir.bits()), DIR_BITS);
        }
        if changed(|c| c.moving as u64) {
            self.code(field::CR_MOVING);
            self.0.write_signed(i64::from(cr.moving), 8);
        }
        if changed(|c| c.frame as u64) {
            self.code(field::CR_FRAME);
            self.0.write_signed(i64::from(cr.frame), 8);
        }
        if changed(|c| u64::from(c.hidden)) {
            self.field(field::CR_HIDDEN, u64::from(cr.hidden), 1);
        }
        if changed(|c| u64::from(c.state)) {
            self.field(field::CR_STATE, u64::from(cr.state), 8);
        }
        if changed(|c| u64::from(c.tdir.bits())) {
            self.field(field::CR_TDIR, u64::from(cr.tdir.bits()), DIR_BITS);
        }
        if changed(|c| u64::from(c.boots.bits())) {
            self.field(field::CR_BOOTS, u64::from(cr.boots.bits()), 4);
        }
        let keys = |k: &Keys| [k.red, k.blue, k.yellow, k.green];
        let ours = keys(&cr.keys);
        let theirs = other.map(|o| keys(&o.keys));
        for (color, &count) in ours.iter().enumerate() {
            if theirs.map_or(true, |t| t[color] != count) {
                self.code(field::CR_KEYS);
                self.0.write(color as u64, 2);
                self.0.write(u64::from(count), 16);
            }
        }
    }
}

/// Records what `after` needs to become `before` again.
pub fn capture(before: &GameState, after: &GameState) -> StateDiff {
    let mut w = Writer(BitWriter::new());

    if flags_of(before) != flags_of(after) {
        w.field(field::FLAGS, flags_of(before), 5);
    }
    if before.main_prng.value() != after.main_prng.value() {
        w.field(field::MAIN_PRNG, u64::from(before.main_prng.value()), 32);
    }
    if before.walker_rng != after.walker_rng {
        let WalkerRng { r1, r2 } = before.walker_rng;
        w.field(field::WALKER_RNG, u64::from(r1) | u64::from(r2) << 8, 16);
    }
    if before.chips_needed != after.chips_needed {
        w.field(field::CHIPS_NEEDED, u64::from(before.chips_needed), 16);
    }
    if before.random_slide_dir != after.random_slide_dir {
        w.field(
            field::RANDOM_SLIDE_DIR,
            u64::from(before.random_slide_dir.bits()),
            DIR_BITS,
        );
    }
    if before.endgame_timer != after.endgame_timer {
        w.field(field::ENDGAME_TIMER, u64::from(before.endgame_timer), 8);
    }
    if before.end_reason != after.end_reason {
        let code = before.end_reason.map_or(0, EndReason::as_u8);
        w.field(field::END_REASON, u64::from(code), 4);
    }
    if before.chip_last_move_time != after.chip_last_move_time {
        w.field(
            field::CHIP_LAST_MOVE_TIME,
            u64::from(before.chip_last_move_time),
            32,
        );
    }
    if before.sounds != after.sounds {
        w.code(field::SOUNDS_RESET);
        for event in &before.sounds {
            w.field(field::SOUND, u64::from(event.sound.as_u8()), 5);
            w.0.write(u64::from(event.volume.to_bits()), 32);
        }
    }
    if before.tick != after.tick {
        w.field(field::TICK, u64::from(before.tick), 32);
    }
    if before.status != after.status {
        w.field(field::STATUS, u64::from(before.status), 8);
    }
    if before.stepping != after.stepping {
        w.field(field::STEPPING, u64::from(before.stepping), 3);
    }

    let cells = before.map.as_slice().iter().zip(after.map.as_slice());
    for (pos, (b, a)) in cells.enumerate() {
        if b == a {
            continue;
        }
        w.field(field::MAP_POS, pos as u64, POS_BITS);
        if b.top != a.top {
            w.tile(field::MAP_TOP, b.top);
        }
        if b.bottom != a.bottom {
            w.tile(field::MAP_BOTTOM, b.bottom);
        }
        if b.state != a.state {
            w.field(field::MAP_STATE, u64::from(b.state), 8);
        }
        w.code(field::END);
    }

    for (i, (b, a)) in before.creatures.iter().zip(&after.creatures).enumerate() {
        if b != a {
            w.field(field::CR_INDEX, i as u64, INDEX_BITS);
            w.creature(b, Some(a));
            w.code(field::END);
        }
    }
    if after.creatures.len() > before.creatures.len() {
        w.field(field::CR_TRUNCATE, before.creatures.len() as u64, INDEX_BITS);
    }
    for cr in before.creatures.iter().skip(after.creatures.len()) {
        w.code(field::CR_ADD);
        w.creature(cr, None);
        w.code(field::END);
    }

    w.code(0);
    StateDiff {
        bits: w.0.finish(),
    }
}

struct Reader<'a>(BitReader<'a>);

impl Reader<'_> {
    fn value(&mut self, width: u32) -> Result<u64, DiffError> {
        self.0.read(width).ok_or(DiffError::Truncated)
    }

    fn code(&mut self) -> Result<u8, DiffError> {
        Ok(self.value(CODE_BITS)? as u8)
    }

    fn dir(&mut self) -> Result<Dir, DiffError> {
        Ok(Dir::from_bits(self.value(DIR_BITS)? as u8))
    }

    fn tile(&mut self) -> Result<Tile, DiffError> {
        let code = self.value(8)? as u8;
        if let Some(floor) = Floor::from_u8(code) {
            return Ok(Tile::Floor(floor));
        }
        let kind = Kind::from_code(code).ok_or(DiffError::BadTile(code))?;
        Ok(Tile::Creature(kind, self.dir()?))
    }

    fn unknown(&self, code: u8) -> DiffError {
        DiffError::UnknownField {
            code,
            bit: self.0.position().saturating_sub(CODE_BITS as usize),
        }
    }

    fn cell(&mut self, cell: &mut MapCell) -> Result<(), DiffError> {
        loop {
            match self.code()? {
                field::END => return Ok(()),
                field::MAP_TOP => cell.top = self.tile()?,
                field::MAP_BOTTOM => cell.bottom = self.tile()?,
                field::MAP_STATE => cell.state = self.value(8)? as u8,
                other => return Err(self.unknown(other)),
            }
        }
    }

    fn creature(&mut self, cr: &mut Creature) -> Result<(), DiffError> {
        loop {
            match self.code()? {
                field::END => return Ok(()),
                field::CR_POS => cr.pos = self.value(POS_BITS)? as usize,
                field::CR_ID => {
                    let code = self.value(8)? as u8;
                    cr.id = Kind::from_code(code).ok_or(DiffError::BadKind(code))?;
                }
                field::CR_DIR => cr.dir = self.dir()?,
                field::CR_MOVING => {
                    cr.moving = self.0.read_signed(8).ok_or(DiffError::Truncated)? as i8;
                }
                field::CR_FRAME => {
                    cr.frame = self.0.read_signed(8).ok_or(DiffError::Truncated)? as i8;
                }
                field::CR_HIDDEN => cr.hidden = self.value(1)? == 1,
                field::CR_STATE => cr.state = self.value(8)? as u8,
                field::CR_TDIR => cr.tdir = self.dir()?,
                field::CR_BOOTS => cr.boots = Boots::from_bits(self.value(4)? as u8),
                field::CR_KEYS => {
                    let color = self.value(2)?;
                    let count = self.value(16)? as u16;
                    match color {
                        0 => cr.keys.red = count,
                        1 => cr.keys.blue = count,
                        2 => cr.keys.yellow = count,
                        _ => cr.keys.green = count,
                    }
                }
                other => return Err(self.unknown(other)),
            }
        }
    }
}

/// Rewinds `state` by one tick using a diff captured against it.
///
/// On error `state` may be partly rewound.
pub fn apply(state: &mut GameState, diff: &StateDiff) -> Result<(), DiffError> {
    let mut r = Reader(BitReader::new(&diff.bits));
    loop {
        match r.code()? {
            0 => return Ok(()),
            field::FLAGS => set_flags(state, r.value(5)?),
            field::MAIN_PRNG => state.main_prng.set_value(r.value(32)? as u32),
            field::WALKER_RNG => {
                let v = r.value(16)?;
                state.walker_rng = WalkerRng {
                    r1: (v & 0xFF) as u8,
                    r2: (v >> 8) as u8,
                };
            }
            field::CHIPS_NEEDED => state.chips_needed = r.value(16)? as u16,
            field::RANDOM_SLIDE_DIR => state.random_slide_dir = r.dir()?,
            field::ENDGAME_TIMER => state.endgame_timer = r.value(8)? as u8,
            field::END_REASON => {
                let code = r.value(4)? as u8;
                state.end_reason = match code {
                    0 => None,
                    c => Some(EndReason::from_u8(c).ok_or(DiffError::BadEndReason(c))?),
                };
            }
            field::CHIP_LAST_MOVE_TIME => state.chip_last_move_time = r.value(32)? as u32,
            field::SOUNDS_RESET => state.sounds.clear(),
            field::SOUND => {
                let id = r.value(5)? as u8;
                let sound = Sound::from_u8(id).ok_or(DiffError::BadSound(id))?;
                let volume = f32::from_bits(r.value(32)? as u32);
                state.sounds.push(SoundEvent { sound, volume });
            }
            field::TICK => state.tick = r.value(32)? as u32,
            field::STATUS => state.status = r.value(8)? as u8,
            field::STEPPING => state.stepping = r.value(3)? as u8,
            field::MAP_POS => {
                let pos = r.value(POS_BITS)? as usize;
                if pos >= MAP_CELLS {
                    return Err(DiffError::BadPosition(pos));
                }
                r.cell(state.map.at_mut(pos))?;
            }
            field::CR_INDEX => {
                let index = r.value(INDEX_BITS)? as usize;
                let len = state.creatures.len();
                let cr = state
                    .creatures
                    .get_mut(index)
                    .ok_or(DiffError::BadCreature { index, len })?;
                r.creature(cr)?;
            }
            field::CR_TRUNCATE => {
                let len = r.value(INDEX_BITS)? as usize;
                if len > state.creatures.len() {
                    return Err(DiffError::BadCreature {
                        index: len,
                        len: state.creatures.len(),
                    });
                }
                state.creatures.truncate(len);
            }
            field::CR_ADD => {
                let mut cr = Creature::default();
                r.creature(&mut cr)?;
                state.creatures.push(cr);
            }
            other => return Err(r.unknown(other)),
        }
    }
}
