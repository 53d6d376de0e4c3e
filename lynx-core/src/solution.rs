//! Tile World `.tws` solution files.

use std::path::Path;

use thiserror::Error;

use crate::bytes::{nul_terminated, ByteReader};
use crate::dir::Dir;
use crate::input::Action;

const MAGIC: u32 = 0x999B_3335;
const LYNX_RULESET: u8 = 1;
/// Level number, password, flags, info byte, seed and frame count.
const HEADER_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum SolutionError {
    #[error("reading solution file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a Tile World solution file (magic {0:#010x})")]
    BadMagic(u32),
    #[error("only the Lynx ruleset is supported, file uses ruleset {0}")]
    Ruleset(u8),
    #[error("solution file ends early at byte {0}")]
    Truncated(usize),
    #[error("level {level}: move at byte {offset} uses the mouse encoding")]
    MouseMove { level: u16, offset: usize },
}

/// One recorded solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub level: u16,
    pub password: String,
    /// First direction a random slide floor hands out.
    pub random_slide_dir: Dir,
    pub stepping: u8,
    pub prng_seed: u32,
    /// Ticks the recorded run took.
    pub frames: u32,
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolutionFile {
    pub set_name: String,
    pub last_level: u16,
    pub solutions: Vec<Solution>,
}

impl SolutionFile {
    pub fn load(path: &Path) -> Result<Self, SolutionError> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, SolutionError> {
        let mut r = ByteReader::new(bytes);
        let truncated = |r: &ByteReader<'_>| SolutionError::Truncated(r.offset());

        let magic = r.u32().ok_or_else(|| truncated(&r))?;
        if magic != MAGIC {
            return Err(SolutionError::BadMagic(magic));
        }
        let ruleset = r.u8().ok_or_else(|| truncated(&r))?;
        if ruleset != LYNX_RULESET {
            return Err(SolutionError::Ruleset(ruleset));
        }
        let last_level = r.u16().ok_or_else(|| truncated(&r))?;
        let extra = r.u8().ok_or_else(|| truncated(&r))?;
        r.take(usize::from(extra)).ok_or_else(|| truncated(&r))?;

        let mut file = SolutionFile {
            last_level,
            ..Self::default()
        };
        let mut first = true;
        while !r.is_empty() {
            let len = r.u32().ok_or_else(|| truncated(&r))?;
            let start = r.offset();
            let record = r.take(len as usize).ok_or_else(|| truncated(&r))?;
            if first && is_set_name(record) {
                file.set_name = nul_terminated(&record[HEADER_LEN..]);
            } else if let Some(solution) = read_record(record, start)? {
                file.solutions.push(solution);
            }
            first = false;
        }
        Ok(file)
    }

    /// The solution recorded for level `number`, if any.
    pub fn for_level(&self, number: u16) -> Option<&Solution> {
        self.solutions.iter().find(|s| s.level == number)
    }
}

fn is_set_name(record: &[u8]) -> bool {
    record.len() > HEADER_LEN && record[..6].iter().all(|&b| b == 0)
}

/// Decodes one record; short records only name a level and hold no moves.
fn read_record(record: &[u8], start: usize) -> Result<Option<Solution>, SolutionError> {
    if record.len() < HEADER_LEN {
        return Ok(None);
    }
    let mut r = ByteReader::new(record);
    let at = |r: &ByteReader<'_>| SolutionError::Truncated(start + r.offset());

    let level = r.u16().ok_or_else(|| at(&r))?;
    let password = r.take(4).ok_or_else(|| at(&r))?;
    let password = password.iter().map(|&b| char::from(b)).collect();
    r.u8().ok_or_else(|| at(&r))?;
    let info = r.u8().ok_or_else(|| at(&r))?;
    let prng_seed = r.u32().ok_or_else(|| at(&r))?;
    let frames = r.u32().ok_or_else(|| at(&r))?;

    let mut actions = Vec::new();
    let mut when: i64 = -1;
    while !r.is_empty() {
        let offset = start + r.offset();
        let b = r.u8().ok_or_else(|| at(&r))?;
        match b & 0x03 {
            0 => {
                for shift in [2, 4, 6] {
                    when += 4;
                    actions.push(Action {
                        tick: when,
                        dir: Dir::from_index(usize::from((b >> shift) & 0x03)),
                    });
                }
            }
            1 => {
                when += i64::from((b >> 5) & 0x07) + 1;
                actions.push(Action {
                    tick: when,
                    dir: Dir::from_index(usize::from((b >> 2) & 0x07)),
                });
            }
            2 => {
                let b2 = r.u8().ok_or_else(|| at(&r))?;
                when += i64::from((b >> 5) & 0x07) + (i64::from(b2) << 3) + 1;
                actions.push(Action {
                    tick: when,
                    dir: Dir::from_index(usize::from((b >> 2) & 0x07)),
                });
            }
            _ if b & 0x10 != 0 => return Err(SolutionError::MouseMove { level, offset }),
            _ => {
                let rest = r.take(3).ok_or_else(|| at(&r))?;
                let delta = i64::from(b >> 5)
                    | i64::from(rest[0]) << 3
                    | i64::from(rest[1]) << 11
                    | i64::from(rest[2]) << 19;
                when += delta + 1;
                actions.push(Action {
                    tick: when,
                    dir: Dir::from_index(usize::from((b >> 2) & 0x03)),
                });
            }
        }
    }

    Ok(Some(Solution {
        level,
        password,
        random_slide_dir: Dir::from_index(usize::from(info & 0x07)),
        stepping: (info >> 3) & 0x07,
        prng_seed,
        frames,
        actions,
    }))
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    pub fn header() -> Vec<u8> {
        let mut out = MAGIC.to_le_bytes().to_vec();
        out.push(LYNX_RULESET);
        out.extend(1u16.to_le_bytes());
        out.push(0);
        out
    }

    pub fn push_record(out: &mut Vec<u8>, record: &[u8]) {
        out.extend((record.len() as u32).to_le_bytes());
        out.extend_from_slice(record);
    }

    pub fn set_name(name: &str) -> Vec<u8> {
        let mut record = vec![0u8; HEADER_LEN];
        record.extend(name.bytes());
        record.push(0);
        record
    }

    pub fn solution(level: u16, info: u8, seed: u32, frames: u32, moves: &[u8]) -> Vec<u8> {
        let mut record = level.to_le_bytes().to_vec();
        record.extend(b"ABCD");
        record.push(0);
        record.push(info);
        record.extend(seed.to_le_bytes());
        record.extend(frames.to_le_bytes());
        record.extend_from_slice(moves);
        record
    }
}
