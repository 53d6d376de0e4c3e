//! Chip's Challenge `.dat` level sets.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::bytes::{nul_terminated, ByteReader};
use crate::grid::MAP_CELLS;
use crate::link::{Link, Location};
use crate::state::GameState;
use crate::tile::{Floor, Kind, Tile};
use crate::time::TICKS_PER_SECOND;

const MAGIC: [u32; 2] = [0x0002_AAAC, 0x0102_AAAC];

/// Raw `.dat` codes the link checks look at.
mod cc {
    pub const BLOCK: u8 = 0x0A;
    pub const CLONE_BLOCK: std::ops::RangeInclusive<u8> = 0x0E..=0x11;
    pub const BUTTON_RED: u8 = 0x24;
    pub const BUTTON_BROWN: u8 = 0x27;
    pub const BEARTRAP: u8 = 0x2B;
    pub const CLONE_MACHINE: u8 = 0x31;
    pub const MONSTERS: std::ops::RangeInclusive<u8> = 0x40..=0x63;
    pub const CHIP: std::ops::RangeInclusive<u8> = 0x6C..=0x6F;
    pub const CHIP_S: u8 = 0x6E;
}

#[derive(Debug, Error)]
pub enum LevelsetError {
    #[error("reading level set: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a Chip's Challenge level set (magic {0:#010x})")]
    BadMagic(u32),
    #[error("level set ends early at byte {0}")]
    Truncated(usize),
    #[error("level {level}: expected field 1, found {found}")]
    BadFirstField { level: u16, found: u16 },
    #[error("level {level}: layer holds {found} tiles instead of 1024")]
    LayerSize { level: u16, found: usize },
    #[error("level {level}: optional fields don't end where the level does")]
    LevelLength { level: u16 },
    #[error("level {level}: field {field} length {len} is not a multiple of {unit}")]
    FieldLength { level: u16, field: u8, len: u8, unit: u8 },
    #[error("expected {expected} levels, read {found}")]
    LevelCount { expected: u16, found: usize },
}

/// One level as stored in the file, with layers already mapped to engine tiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub number: u16,
    /// Seconds; zero means untimed.
    pub time_limit: u16,
    pub chips_required: u16,
    pub title: String,
    pub password: String,
    pub hint: String,
    pub top: Vec<Tile>,
    pub bottom: Vec<Tile>,
    pub trap_links: Vec<Link>,
    pub clone_links: Vec<Link>,
    /// The monster list. The Lynx rules move every monster on the map, so
    /// this is informational only.
    pub monsters: Vec<Location>,
}

impl Level {
    /// A fresh, uninitialized game state for this level.
    pub fn to_game_state(&self) -> GameState {
        let mut state = GameState::new();
        state.level_number = self.number;
        state.title = self.title.clone();
        state.password = self.password.clone();
        state.hint = self.hint.clone();
        state.chips_needed = self.chips_required;
        state.time_limit_ticks = u32::from(self.time_limit) * TICKS_PER_SECOND;
        for (cell, (&top, &bottom)) in state
            .map
            .as_mut_slice()
            .iter_mut()
            .zip(self.top.iter().zip(&self.bottom))
        {
            cell.top = top;
            cell.bottom = bottom;
        }
        state.trap_links = self.trap_links.clone();
        state.clone_links = self.clone_links.clone();
        state
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Levelset {
    pub levels: Vec<Level>,
}

impl Levelset {
    pub fn load(path: &Path) -> Result<Self, LevelsetError> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, LevelsetError> {
        let mut r = ByteReader::new(bytes);
        let magic = r.u32().ok_or(LevelsetError::Truncated(0))?;
        if !MAGIC.contains(&magic) {
            return Err(LevelsetError::BadMagic(magic));
        }
        let expected = r.u16().ok_or(LevelsetError::Truncated(r.offset()))?;
        let mut levels = Vec::with_capacity(usize::from(expected));
        while !r.is_empty() {
            levels.push(read_level(&mut r)?);
        }
        if levels.len() != usize::from(expected) {
            return Err(LevelsetError::LevelCount {
                expected,
                found: levels.len(),
            });
        }
        Ok(Self { levels })
    }

    /// Looks a level up by its number in the set (1-based, file order).
    pub fn level(&self, number: usize) -> Option<&Level> {
        number.checked_sub(1).and_then(|i| self.levels.get(i))
    }
}

struct LevelReader<'r, 'a> {
    r: &'r mut ByteReader<'a>,
    level: u16,
}

impl<'a> LevelReader<'_, 'a> {
    fn truncated(&self) -> LevelsetError {
        LevelsetError::Truncated(self.r.offset())
    }

    fn u8(&mut self) -> Result<u8, LevelsetError> {
        self.r.u8().ok_or_else(|| self.truncated())
    }

    fn u16(&mut self) -> Result<u16, LevelsetError> {
        self.r.u16().ok_or_else(|| self.truncated())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LevelsetError> {
        self.r.take(len).ok_or_else(|| self.truncated())
    }

    /// An RLE-packed layer of raw codes.
    fn layer(&mut self) -> Result<Vec<u8>, LevelsetError> {
        let len = self.u16()?;
        let data = self.take(usize::from(len))?;
        let mut codes = Vec::with_capacity(MAP_CELLS);
        let mut i = 0;
        while i < data.len() {
            match data[i] {
                0xFF => {
                    let (count, code) = match (data.get(i + 1), data.get(i + 2)) {
                        (Some(&n), Some(&c)) => (n, c),
                        _ => return Err(self.truncated()),
                    };
                    codes.extend(std::iter::repeat(code).take(usize::from(count)));
                    i += 3;
                }
                code @ 0x00..=0x6F => {
                    codes.push(code);
                    i += 1;
                }
                _ => i += 1,
            }
        }
        if codes.len() != MAP_CELLS {
            return Err(LevelsetError::LayerSize {
                level: self.level,
                found: codes.len(),
            });
        }
        Ok(codes)
    }

    /// Length-prefixed payload of an optional field, checked against `unit`.
    fn payload(&mut self, field: u8, unit: u8) -> Result<&'a [u8], LevelsetError> {
        let len = self.u8()?;
        if len % unit != 0 {
            return Err(LevelsetError::FieldLength {
                level: self.level,
                field,
                len,
                unit,
            });
        }
        self.take(usize::from(len))
    }
}

fn word(bytes: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]])
}

fn read_level(r: &mut ByteReader<'_>) -> Result<Level, LevelsetError> {
    let size = r.u16().ok_or(LevelsetError::Truncated(r.offset()))?;
    let level_end = r.offset() + usize::from(size);
    let mut lr = LevelReader { r, level: 0 };

    let number = lr.u16()?;
    lr.level = number;
    let time_limit = lr.u16()?;
    let chips_required = lr.u16()?;
    let first_field = lr.u16()?;
    if first_field != 1 {
        return Err(LevelsetError::BadFirstField {
            level: number,
            found: first_field,
        });
    }
    let top = lr.layer()?;
    let mut bottom = lr.layer()?;

    let optional = lr.u16()?;
    if lr.r.offset() + usize::from(optional) != level_end {
        return Err(LevelsetError::LevelLength { level: number });
    }

    for (pos, code) in bottom.iter_mut().enumerate() {
        let Location { x, y } = Location::from_pos(pos);
        if cc::CHIP.contains(code) {
            warn!(level = number, x, y, "Chip on the bottom layer");
            *code = cc::CHIP_S;
        } else if *code == cc::BLOCK {
            warn!(level = number, x, y, "block on the bottom layer");
        }
    }

    let mut level = Level {
        number,
        time_limit,
        chips_required,
        title: String::new(),
        password: String::new(),
        hint: String::new(),
        top: Vec::new(),
        bottom: Vec::new(),
        trap_links: Vec::new(),
        clone_links: Vec::new(),
        monsters: Vec::new(),
    };
    let either = |pos: usize, code: u8| top[pos] == code || bottom[pos] == code;

    while lr.r.offset() < level_end {
        let field = lr.u8()?;
        match field {
            3 => level.title = nul_terminated(lr.payload(field, 1)?),
            4 => {
                let data = lr.payload(field, 10)?;
                for rec in data.chunks_exact(10) {
                    let button = Location::new(word(rec, 0), word(rec, 1));
                    let trap = Location::new(word(rec, 2), word(rec, 3));
                    if !button.on_map() || !either(button.index(), cc::BUTTON_BROWN) {
                        warn!(level = number, %button, "trap wiring without a brown button");
                    } else if !trap.on_map() || !either(trap.index(), cc::BEARTRAP) {
                        warn!(level = number, %button, %trap, "brown button wired to no trap");
                    } else {
                        level.trap_links.push(Link::new(button, trap));
                    }
                }
            }
            5 => {
                let data = lr.payload(field, 8)?;
                for rec in data.chunks_exact(8) {
                    let button = Location::new(word(rec, 0), word(rec, 1));
                    let machine = Location::new(word(rec, 2), word(rec, 3));
                    let is_machine = machine.on_map() && {
                        let pos = machine.index();
                        bottom[pos] == cc::CLONE_MACHINE || cc::CLONE_BLOCK.contains(&top[pos])
                    };
                    if !button.on_map() || !either(button.index(), cc::BUTTON_RED) {
                        warn!(level = number, %button, "cloner wiring without a red button");
                    } else if !is_machine {
                        warn!(
                            level = number,
                            %button,
                            %machine,
                            "red button wired to no clone machine"
                        );
                    } else {
                        level.clone_links.push(Link::new(button, machine));
                    }
                }
            }
            6 => {
                let data = lr.payload(field, 1)?;
                level.password = data
                    .iter()
                    .take_while(|&&b| b != 0)
                    .map(|&b| char::from(b ^ 0x99))
                    .collect();
            }
            7 => level.hint = nul_terminated(lr.payload(field, 1)?),
            10 => {
                let data = lr.payload(field, 2)?;
                for pair in data.chunks_exact(2) {
                    let at = Location::new(u16::from(pair[0]), u16::from(pair[1]));
                    if at.on_map() && cc::MONSTERS.contains(&top[at.index()]) {
                        level.monsters.push(at);
                    } else {
                        warn!(level = number, %at, "monster list entry with no monster");
                    }
                }
            }
            other => {
                warn!(level = number, field = other, "skipping unknown level field");
                lr.payload(other, 1)?;
            }
        }
    }

    level.top = top.iter().map(|&c| Tile::from_cc(c).unwrap_or_default()).collect();
    level.bottom = bottom.iter().map(|&c| Tile::from_cc(c).unwrap_or_default()).collect();
    Ok(level)
}

/// Test fixtures: builds `.dat` bytes by hand.
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    pub struct LevelBytes {
        pub number: u16,
        pub time_limit: u16,
        pub chips: u16,
        pub top: Vec<u8>,
        pub bottom: Vec<u8>,
        pub fields: Vec<(u8, Vec<u8>)>,
    }

    impl LevelBytes {
        /// Empty floor everywhere, with `top` codes placed at `(x, y)`.
        pub fn new(number: u16, cells: &[(u16, u16, u8)]) -> Self {
            let mut top = vec![0u8; MAP_CELLS];
            for &(x, y, code) in cells {
                top[Location::new(x, y).index()] = code;
            }
            Self {
                number,
                time_limit: 0,
                chips: 0,
                top,
                bottom: vec![0u8; MAP_CELLS],
                fields: Vec::new(),
            }
        }

        fn rle(layer: &[u8]) -> Vec<u8> {
            let mut out = Vec::new();
            for run in layer.chunk_by(|a, b| a == b) {
                for part in run.chunks(255) {
                    if part.len() > 3 {
                        out.extend([0xFF, part.len() as u8, part[0]]);
                    } else {
                        out.extend_from_slice(part);
                    }
                }
            }
            out
        }

        pub fn encode(&self) -> Vec<u8> {
            let mut body = Vec::new();
            for v in [self.number, self.time_limit, self.chips, 1] {
                body.extend(v.to_le_bytes());
            }
            for layer in [&self.top, &self.bottom] {
                let packed = Self::rle(layer);
                body.extend((packed.len() as u16).to_le_bytes());
                body.extend(packed);
            }
            let mut optional = Vec::new();
            for (field, data) in &self.fields {
                optional.push(*field);
                optional.push(data.len() as u8);
                optional.extend(data);
            }
            body.extend((optional.len() as u16).to_le_bytes());
            body.extend(optional);

            let mut out = (body.len() as u16).to_le_bytes().to_vec();
            out.extend(body);
            out
        }
    }

    pub fn levelset(levels: &[LevelBytes]) -> Vec<u8> {
        let mut out = MAGIC[0].to_le_bytes().to_vec();
        out.extend((levels.len() as u16).to_le_bytes());
        for level in levels {
            out.extend(level.encode());
        }
        out
    }

    pub fn words(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    pub fn text(s: &str) -> Vec<u8> {
        let mut v = s.as_bytes().to_vec();
        v.push(0);
        v
    }
}
