use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

use serde::{Deserialize, Serialize};

use crate::grid::LEVEL_SIZE;

/// A compass direction stored as a 4-bit mask. Diagonals are the union of
/// two cardinal bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dir(u8);

const DIR_TO_INDEX: [i8; 16] = [-1, 0, 1, 4, 2, -1, 5, -1, 3, 6, -1, -1, 7, -1, -1, -1];

impl Dir {
    pub const NONE: Dir = Dir(0);
    pub const N: Dir = Dir(1);
    pub const W: Dir = Dir(2);
    pub const S: Dir = Dir(4);
    pub const E: Dir = Dir(8);
    pub const NW: Dir = Dir(3);
    pub const SW: Dir = Dir(6);
    pub const NE: Dir = Dir(9);
    pub const SE: Dir = Dir(12);

    /// Index order shared by tile codes and solution files.
    pub const BY_INDEX: [Dir; 8] = [
        Dir::N,
        Dir::W,
        Dir::S,
        Dir::E,
        Dir::NW,
        Dir::SW,
        Dir::NE,
        Dir::SE,
    ];

    /// Clockwise order used by the blob's random pick.
    pub const CLOCKWISE: [Dir; 4] = [Dir::N, Dir::E, Dir::S, Dir::W];

    #[inline]
    pub const fn from_bits(bits: u8) -> Dir {
        Dir(bits & 0x0F)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn intersects(self, other: Dir) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn left(self) -> Dir {
        Dir(((self.0 << 1) | (self.0 >> 3)) & 15)
    }

    #[inline]
    pub fn back(self) -> Dir {
        Dir(((self.0 << 2) | (self.0 >> 2)) & 15)
    }

    #[inline]
    pub fn right(self) -> Dir {
        Dir(((self.0 << 3) | (self.0 >> 1)) & 15)
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        self.intersects(Dir::N | Dir::S) && self.intersects(Dir::E | Dir::W)
    }

    /// Position in [`Dir::BY_INDEX`], if this is one of the eight moves.
    pub fn index(self) -> Option<usize> {
        usize::try_from(DIR_TO_INDEX[usize::from(self.0)]).ok()
    }

    #[inline]
    pub fn from_index(index: usize) -> Dir {
        Dir::BY_INDEX[index & 7]
    }

    /// Linear map offset of a single step; zero for anything but N, W, S, E.
    pub fn offset(self) -> isize {
        const SIZE: isize = LEVEL_SIZE as isize;
        match self {
            Dir::N => -SIZE,
            Dir::W => -1,
            Dir::S => SIZE,
            Dir::E => 1,
            _ => 0,
        }
    }

    /// Parses `N`, `NW`, `e`, ... as used by the command line and tests.
    pub fn parse(text: &str) -> Option<Dir> {
        let dir = match text.to_ascii_uppercase().as_str() {
            "N" => Dir::N,
            "W" => Dir::W,
            "S" => Dir::S,
            "E" => Dir::E,
            "NW" => Dir::NW,
            "SW" => Dir::SW,
            "NE" => Dir::NE,
            "SE" => Dir::SE,
            "" | "." => Dir::NONE,
            _ => return None,
        };
        Some(dir)
    }
}

impl BitOr for Dir {
    type Output = Dir;

    fn bitor(self, rhs: Dir) -> Dir {
        Dir(self.0 | rhs.0)
    }
}

impl BitAnd for Dir {
    type Output = Dir;

    fn bitand(self, rhs: Dir) -> Dir {
        Dir(self.0 & rhs.0)
    }
}

impl BitXor for Dir {
    type Output = Dir;

    fn bitxor(self, rhs: Dir) -> Dir {
        Dir(self.0 ^ rhs.0)
    }
}

impl fmt::Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Dir::NONE => "-",
            Dir::N => "N",
            Dir::W => "W",
            Dir::S => "S",
            Dir::E => "E",
            Dir::NW => "NW",
            Dir::SW => "SW",
            Dir::NE => "NE",
            Dir::SE => "SE",
            _ => "?",
        };
        f.write_str(name)
    }
}
