use serde::{Deserialize, Serialize};

use crate::dir::Dir;

/// Floor, wall and item tiles (codes `0x00..=0x3F`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Floor {
    Nothing = 0x00,
    Empty = 0x01,
    SlideNorth = 0x02,
    SlideWest = 0x03,
    SlideSouth = 0x04,
    SlideEast = 0x05,
    SlideRandom = 0x06,
    Ice = 0x07,
    IceWallNorthwest = 0x08,
    IceWallNortheast = 0x09,
    IceWallSouthwest = 0x0A,
    IceWallSoutheast = 0x0B,
    Gravel = 0x0C,
    Dirt = 0x0D,
    Water = 0x0E,
    Fire = 0x0F,
    Bomb = 0x10,
    Beartrap = 0x11,
    Burglar = 0x12,
    HintButton = 0x13,
    ButtonBlue = 0x14,
    ButtonGreen = 0x15,
    ButtonRed = 0x16,
    ButtonBrown = 0x17,
    Teleport = 0x18,
    Wall = 0x19,
    WallNorth = 0x1A,
    WallWest = 0x1B,
    WallSouth = 0x1C,
    WallEast = 0x1D,
    WallSoutheast = 0x1E,
    HiddenWallPerm = 0x1F,
    HiddenWallTemp = 0x20,
    BlueWallReal = 0x21,
    BlueWallFake = 0x22,
    SwitchWallOpen = 0x23,
    SwitchWallClosed = 0x24,
    PopupWall = 0x25,
    CloneMachine = 0x26,
    DoorRed = 0x27,
    DoorBlue = 0x28,
    DoorYellow = 0x29,
    DoorGreen = 0x2A,
    Socket = 0x2B,
    Exit = 0x2C,
    IcChip = 0x2D,
    KeyRed = 0x2E,
    KeyBlue = 0x2F,
    KeyYellow = 0x30,
    KeyGreen = 0x31,
    BootsIce = 0x32,
    BootsSlide = 0x33,
    BootsFire = 0x34,
    BootsWater = 0x35,
    BlockStatic = 0x36,
    DrownedChip = 0x37,
    BurnedChip = 0x38,
    BombedChip = 0x39,
    ExitedChip = 0x3A,
    ExitExtra1 = 0x3B,
    ExitExtra2 = 0x3C,
    OverlayBuffer = 0x3D,
    FloorReserved2 = 0x3E,
    FloorReserved1 = 0x3F,
}

impl Floor {
    pub const ALL: [Floor; 64] = [
        Floor::Nothing,
        Floor::Empty,
        Floor::SlideNorth,
        Floor::SlideWest,
        Floor::SlideSouth,
        Floor::SlideEast,
        Floor::SlideRandom,
        Floor::Ice,
        Floor::IceWallNorthwest,
        Floor::IceWallNortheast,
        Floor::IceWallSouthwest,
        Floor::IceWallSoutheast,
        Floor::Gravel,
        Floor::Dirt,
        Floor::Water,
        Floor::Fire,
        Floor::Bomb,
        Floor::Beartrap,
        Floor::Burglar,
        Floor::HintButton,
        Floor::ButtonBlue,
        Floor::ButtonGreen,
        Floor::ButtonRed,
        Floor::ButtonBrown,
        Floor::Teleport,
        Floor::Wall,
        Floor::WallNorth,
        Floor::WallWest,
        Floor::WallSouth,
        Floor::WallEast,
        Floor::WallSoutheast,
        Floor::HiddenWallPerm,
        Floor::HiddenWallTemp,
        Floor::BlueWallReal,
        Floor::BlueWallFake,
        Floor::SwitchWallOpen,
        Floor::SwitchWallClosed,
        Floor::PopupWall,
        Floor::CloneMachine,
        Floor::DoorRed,
        Floor::DoorBlue,
        Floor::DoorYellow,
        Floor::DoorGreen,
        Floor::Socket,
        Floor::Exit,
        Floor::IcChip,
        Floor::KeyRed,
        Floor::KeyBlue,
        Floor::KeyYellow,
        Floor::KeyGreen,
        Floor::BootsIce,
        Floor::BootsSlide,
        Floor::BootsFire,
        Floor::BootsWater,
        Floor::BlockStatic,
        Floor::DrownedChip,
        Floor::BurnedChip,
        Floor::BombedChip,
        Floor::ExitedChip,
        Floor::ExitExtra1,
        Floor::ExitExtra2,
        Floor::OverlayBuffer,
        Floor::FloorReserved2,
        Floor::FloorReserved1,
    ];

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(code: u8) -> Option<Floor> {
        Floor::ALL.get(usize::from(code)).copied()
    }

    pub fn is_slide(self) -> bool {
        (Floor::SlideNorth..=Floor::SlideRandom).contains(&self)
    }

    pub fn is_ice(self) -> bool {
        (Floor::Ice..=Floor::IceWallSoutheast).contains(&self)
    }

    pub fn is_door(self) -> bool {
        (Floor::DoorRed..=Floor::DoorGreen).contains(&self)
    }

    pub fn is_key(self) -> bool {
        (Floor::KeyRed..=Floor::KeyGreen).contains(&self)
    }

    pub fn is_boots(self) -> bool {
        (Floor::BootsIce..=Floor::BootsWater).contains(&self)
    }

    /// Leftover tiles from the original game's own display tricks.
    pub fn is_ms_special(self) -> bool {
        (Floor::DrownedChip..=Floor::OverlayBuffer).contains(&self)
    }
}

/// Creature and animation kinds. Discriminants are the base tile codes; the
/// low two bits of a creature tile carry its facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Kind {
    Chip = 0x40,
    Block = 0x44,
    Tank = 0x48,
    Ball = 0x4C,
    Glider = 0x50,
    Fireball = 0x54,
    Walker = 0x58,
    Blob = 0x5C,
    Teeth = 0x60,
    Bug = 0x64,
    Paramecium = 0x68,
    SwimmingChip = 0x6C,
    PushingChip = 0x70,
    EntityReserved2 = 0x74,
    EntityReserved1 = 0x78,
    WaterSplash = 0x7C,
    BombExplosion = 0x7D,
    EntityExplosion = 0x7E,
    AnimationReserved1 = 0x7F,
}

impl Kind {
    pub const CREATURES: [Kind; 15] = [
        Kind::Chip,
        Kind::Block,
        Kind::Tank,
        Kind::Ball,
        Kind::Glider,
        Kind::Fireball,
        Kind::Walker,
        Kind::Blob,
        Kind::Teeth,
        Kind::Bug,
        Kind::Paramecium,
        Kind::SwimmingChip,
        Kind::PushingChip,
        Kind::EntityReserved2,
        Kind::EntityReserved1,
    ];

    pub const ANIMATIONS: [Kind; 4] = [
        Kind::WaterSplash,
        Kind::BombExplosion,
        Kind::EntityExplosion,
        Kind::AnimationReserved1,
    ];

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Kind for any code in `0x40..=0x7F`.
    pub fn from_code(code: u8) -> Option<Kind> {
        match code {
            0x40..=0x7B => Kind::CREATURES.get(usize::from((code - 0x40) >> 2)).copied(),
            0x7C..=0x7F => Kind::ANIMATIONS.get(usize::from(code - 0x7C)).copied(),
            _ => None,
        }
    }

    pub fn is_monster(self) -> bool {
        (Kind::Tank..=Kind::Paramecium).contains(&self)
    }

    pub fn is_animation(self) -> bool {
        self >= Kind::WaterSplash
    }
}

/// One layer of a map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    Floor(Floor),
    Creature(Kind, Dir),
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Floor(Floor::Empty)
    }
}

impl From<Floor> for Tile {
    fn from(floor: Floor) -> Self {
        Tile::Floor(floor)
    }
}

impl Tile {
    pub fn code(self) -> u8 {
        match self {
            Tile::Floor(f) => f.as_u8(),
            Tile::Creature(k, _) if k.is_animation() => k.as_u8(),
            Tile::Creature(k, d) => k.as_u8() | d.index().map_or(0, |i| (i & 3) as u8),
        }
    }

    pub fn from_code(code: u8) -> Option<Tile> {
        if let Some(floor) = Floor::from_u8(code) {
            return Some(Tile::Floor(floor));
        }
        let kind = Kind::from_code(code)?;
        let dir = if kind.is_animation() {
            Dir::NONE
        } else {
            Dir::from_index(usize::from(code & 3))
        };
        Some(Tile::Creature(kind, dir))
    }

    #[inline]
    pub fn floor(self) -> Option<Floor> {
        match self {
            Tile::Floor(f) => Some(f),
            Tile::Creature(..) => None,
        }
    }

    pub fn is_ms_special(self) -> bool {
        self.floor().is_some_and(Floor::is_ms_special)
    }

    /// Maps a Chip's Challenge level-file code to an engine tile.
    pub fn from_cc(code: u8) -> Option<Tile> {
        use Floor as F;

        let creature = |kind: Kind, d: u8| {
            let dir = [Dir::N, Dir::W, Dir::S, Dir::E][usize::from(d & 3)];
            Some(Tile::Creature(kind, dir))
        };
        let floor = match code {
            0x00 => F::Empty,
            0x01 => F::Wall,
            0x02 => F::IcChip,
            0x03 => F::Water,
            0x04 => F::Fire,
            0x05 => F::HiddenWallPerm,
            0x06 => F::WallNorth,
            0x07 => F::WallWest,
            0x08 => F::WallSouth,
            0x09 => F::WallEast,
            0x0A => return creature(Kind::Block, 0),
            0x0B => F::Dirt,
            0x0C => F::Ice,
            0x0D => F::SlideSouth,
            0x0E..=0x11 => return creature(Kind::Block, code - 0x0E),
            0x12 => F::SlideNorth,
            0x13 => F::SlideEast,
            0x14 => F::SlideWest,
            0x15 => F::Exit,
            0x16 => F::DoorBlue,
            0x17 => F::DoorRed,
            0x18 => F::DoorGreen,
            0x19 => F::DoorYellow,
            0x1A => F::IceWallSoutheast,
            0x1B => F::IceWallSouthwest,
            0x1C => F::IceWallNorthwest,
            0x1D => F::IceWallNortheast,
            0x1E => F::BlueWallFake,
            0x1F => F::BlueWallReal,
            0x20 => F::Empty,
            0x21 => F::Burglar,
            0x22 => F::Socket,
            0x23 => F::ButtonGreen,
            0x24 => F::ButtonRed,
            0x25 => F::SwitchWallClosed,
            0x26 => F::SwitchWallOpen,
            0x27 => F::ButtonBrown,
            0x28 => F::ButtonBlue,
            0x29 => F::Teleport,
            0x2A => F::Bomb,
            0x2B => F::Beartrap,
            0x2C => F::HiddenWallTemp,
            0x2D => F::Gravel,
            0x2E => F::PopupWall,
            0x2F => F::HintButton,
            0x30 => F::WallSoutheast,
            0x31 => F::CloneMachine,
            0x32 => F::SlideRandom,
            0x33 => F::DrownedChip,
            0x34 => F::BurnedChip,
            0x35 => F::BombedChip,
            0x36..=0x38 => F::Empty,
            0x39 => F::ExitedChip,
            0x3A => F::ExitExtra1,
            0x3B => F::ExitExtra2,
            0x3C..=0x3F => return creature(Kind::SwimmingChip, code - 0x3C),
            0x40..=0x43 => return creature(Kind::Bug, code - 0x40),
            0x44..=0x47 => return creature(Kind::Fireball, code - 0x44),
            0x48..=0x4B => return creature(Kind::Ball, code - 0x48),
            0x4C..=0x4F => return creature(Kind::Tank, code - 0x4C),
            0x50..=0x53 => return creature(Kind::Glider, code - 0x50),
            0x54..=0x57 => return creature(Kind::Teeth, code - 0x54),
            0x58..=0x5B => return creature(Kind::Walker, code - 0x58),
            0x5C..=0x5F => return creature(Kind::Blob, code - 0x5C),
            0x60..=0x63 => return creature(Kind::Paramecium, code - 0x60),
            0x64 => F::KeyBlue,
            0x65 => F::KeyRed,
            0x66 => F::KeyGreen,
            0x67 => F::KeyYellow,
            0x68 => F::BootsWater,
            0x69 => F::BootsFire,
            0x6A => F::BootsIce,
            0x6B => F::BootsSlide,
            0x6C..=0x6F => return creature(Kind::Chip, code - 0x6C),
            _ => return None,
        };
        Some(Tile::Floor(floor))
    }
}
