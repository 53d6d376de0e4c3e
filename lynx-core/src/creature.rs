use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::tile::{Floor, Kind};

/// Bits of [`Creature::state`].
pub mod flags {
    /// Forced direction for the current tick.
    pub const FDIR_MASK: u8 = 0x0F;
    /// May step off a slide floor this tick.
    pub const SLIDE_TOKEN: u8 = 0x10;
    /// Turns around at the next chance.
    pub const REVERSE: u8 = 0x20;
    /// Block is being pushed by Chip.
    pub const PUSHED: u8 = 0x40;
    /// Arrived through a teleport last tick.
    pub const TELEPORTED: u8 = 0x80;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boots {
    pub flippers: bool,
    pub fire: bool,
    pub skates: bool,
    pub force: bool,
}

impl Boots {
    pub fn bits(self) -> u8 {
        u8::from(self.flippers)
            | u8::from(self.fire) << 1
            | u8::from(self.skates) << 2
            | u8::from(self.force) << 3
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            flippers: bits & 1 != 0,
            fire: bits & 2 != 0,
            skates: bits & 4 != 0,
            force: bits & 8 != 0,
        }
    }
}

/// Key counters, in red/blue/yellow/green order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keys {
    pub red: u16,
    pub blue: u16,
    pub yellow: u16,
    pub green: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    pub pos: usize,
    pub id: Kind,
    pub dir: Dir,
    /// Remaining sub-tile offset of the current move; positive while moving.
    pub moving: i8,
    pub frame: i8,
    pub hidden: bool,
    pub state: u8,
    /// Direction chosen this tick, before validation.
    pub tdir: Dir,
    pub boots: Boots,
    pub keys: Keys,
}

impl Default for Creature {
    fn default() -> Self {
        Self {
            pos: 0,
            id: Kind::Chip,
            dir: Dir::NONE,
            moving: 0,
            frame: 0,
            hidden: false,
            state: 0,
            tdir: Dir::NONE,
            boots: Boots::default(),
            keys: Keys::default(),
        }
    }
}

impl Creature {
    pub fn new(pos: usize, id: Kind, dir: Dir) -> Self {
        Self {
            pos,
            id,
            dir,
            ..Self::default()
        }
    }

    #[inline]
    pub fn fdir(&self) -> Dir {
        Dir::from_bits(self.state & flags::FDIR_MASK)
    }

    #[inline]
    pub fn set_fdir(&mut self, dir: Dir) {
        self.state = (self.state & !flags::FDIR_MASK) | (dir.bits() & flags::FDIR_MASK);
    }

    #[inline]
    pub fn has(&self, flag: u8) -> bool {
        self.state & flag != 0
    }

    /// Copies position and motion but not inventory; used for clones.
    pub fn copy_motion_from(&mut self, other: &Creature) {
        self.pos = other.pos;
        self.id = other.id;
        self.dir = other.dir;
        self.moving = other.moving;
        self.frame = other.frame;
        self.hidden = other.hidden;
        self.state = other.state;
        self.tdir = other.tdir;
    }

    pub fn has_key_for(&self, door: Floor) -> bool {
        match door {
            Floor::DoorRed => self.keys.red > 0,
            Floor::DoorBlue => self.keys.blue > 0,
            Floor::DoorYellow => self.keys.yellow > 0,
            Floor::DoorGreen => self.keys.green > 0,
            _ => false,
        }
    }

    /// Green keys are never used up.
    pub fn use_key_for(&mut self, door: Floor) {
        let count = match door {
            Floor::DoorRed => &mut self.keys.red,
            Floor::DoorBlue => &mut self.keys.blue,
            Floor::DoorYellow => &mut self.keys.yellow,
            _ => return,
        };
        *count = count.saturating_sub(1);
    }

    /// Counters wrap to zero past 255. Blue and yellow pickups test the red
    /// counter instead of their own, so those two can climb past 255.
    pub fn add_key_for(&mut self, key: Floor) {
        match key {
            Floor::KeyRed => {
                self.keys.red += 1;
                if self.keys.red > 255 {
                    self.keys.red = 0;
                }
            }
            Floor::KeyBlue => {
                self.keys.blue = self.keys.blue.wrapping_add(1);
                if self.keys.red > 255 {
                    self.keys.red = 0;
                }
            }
            Floor::KeyYellow => {
                self.keys.yellow = self.keys.yellow.wrapping_add(1);
                if self.keys.red > 255 {
                    self.keys.red = 0;
                }
            }
            Floor::KeyGreen => {
                self.keys.green += 1;
                if self.keys.green > 255 {
                    self.keys.green = 0;
                }
            }
            _ => {}
        }
    }

    pub fn add_boots_for(&mut self, boots: Floor) {
        match boots {
            Floor::BootsIce => self.boots.skates = true,
            Floor::BootsFire => self.boots.fire = true,
            Floor::BootsSlide => self.boots.force = true,
            Floor::BootsWater => self.boots.flippers = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_direction_shares_state_byte() {
        let mut cr = Creature::new(0, Kind::Glider, Dir::E);
        cr.state = flags::TELEPORTED | flags::SLIDE_TOKEN;
        cr.set_fdir(Dir::W);
        assert_eq!(cr.fdir(), Dir::W);
        assert!(cr.has(flags::TELEPORTED));
        cr.set_fdir(Dir::NONE);
        assert_eq!(cr.state, flags::TELEPORTED | flags::SLIDE_TOKEN);
    }

    #[test]
    fn doors_consume_keys_except_green() {
        let mut chip = Creature::default();
        chip.add_key_for(Floor::KeyRed);
        chip.add_key_for(Floor::KeyGreen);
        assert!(chip.has_key_for(Floor::DoorRed));
        assert!(!chip.has_key_for(Floor::DoorBlue));
        chip.use_key_for(Floor::DoorRed);
        chip.use_key_for(Floor::DoorGreen);
        assert_eq!(chip.keys.red, 0);
        assert_eq!(chip.keys.green, 1);
    }

    #[test]
    fn key_counters_wrap_like_the_lynx() {
        let mut chip = Creature::default();
        chip.keys.red = 255;
        chip.keys.blue = 255;
        chip.add_key_for(Floor::KeyBlue);
        assert_eq!(chip.keys.blue, 256);
        chip.add_key_for(Floor::KeyRed);
        assert_eq!(chip.keys.red, 0);
    }

    #[test]
    fn boots_pack_into_nibble() {
        let mut chip = Creature::default();
        chip.add_boots_for(Floor::BootsFire);
        chip.add_boots_for(Floor::BootsSlide);
        assert_eq!(chip.boots.bits(), 0b1010);
        assert_eq!(Boots::from_bits(0b1010), chip.boots);
    }
}
