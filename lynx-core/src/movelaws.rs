//! Which directions each kind of mover may use to enter or leave a floor.
//!
//! The low nibble of a mask holds the "may enter moving in this direction"
//! bits, the high nibble the matching "may leave" bits. These tables are only
//! the first check; the engine still applies per-situation rules afterwards.

use crate::dir::Dir;
use crate::tile::Floor;

const N_IN: u8 = Dir::N.bits();
const W_IN: u8 = Dir::W.bits();
const S_IN: u8 = Dir::S.bits();
const E_IN: u8 = Dir::E.bits();
const N_OUT: u8 = N_IN << 4;
const W_OUT: u8 = W_IN << 4;
const S_OUT: u8 = S_IN << 4;
const E_OUT: u8 = E_IN << 4;
const ALL_IN: u8 = N_IN | W_IN | S_IN | E_IN;
const ALL_OUT: u8 = N_OUT | W_OUT | S_OUT | E_OUT;
const ALL_IN_OUT: u8 = ALL_IN | ALL_OUT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mover {
    Chip,
    Block,
    Creature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveLaw {
    pub chip: u8,
    pub block: u8,
    pub creature: u8,
}

impl MoveLaw {
    const fn all(mask: u8) -> Self {
        Self {
            chip: mask,
            block: mask,
            creature: mask,
        }
    }

    const fn split(chip: u8, block: u8, creature: u8) -> Self {
        Self {
            chip,
            block,
            creature,
        }
    }

    pub fn mask(self, mover: Mover) -> u8 {
        match mover {
            Mover::Chip => self.chip,
            Mover::Block => self.block,
            Mover::Creature => self.creature,
        }
    }
}

const OPEN: MoveLaw = MoveLaw::all(ALL_IN_OUT);
const SOLID: MoveLaw = MoveLaw::all(ALL_OUT);
const CHIP_ONLY: MoveLaw = MoveLaw::split(ALL_IN_OUT, ALL_OUT, ALL_OUT);
const NONE: MoveLaw = MoveLaw::all(0);

static MOVE_LAWS: [MoveLaw; 64] = [
    NONE, // Nothing
    OPEN, // Empty
    OPEN, // SlideNorth
    OPEN, // SlideWest
    OPEN, // SlideSouth
    OPEN, // SlideEast
    OPEN, // SlideRandom
    OPEN, // Ice
    MoveLaw::all(N_OUT | W_OUT | S_IN | E_IN),
    MoveLaw::all(N_OUT | E_OUT | S_IN | W_IN),
    MoveLaw::all(S_OUT | W_OUT | N_IN | E_IN),
    MoveLaw::all(S_OUT | E_OUT | N_IN | W_IN),
    MoveLaw::split(ALL_IN_OUT, ALL_IN_OUT, ALL_OUT), // Gravel
    CHIP_ONLY,                                      // Dirt
    OPEN,                                           // Water
    OPEN,                                           // Fire
    OPEN,                                           // Bomb
    OPEN,                                           // Beartrap
    CHIP_ONLY,                                      // Burglar
    CHIP_ONLY,                                      // HintButton
    OPEN,                                           // ButtonBlue
    OPEN,                                           // ButtonGreen
    OPEN,                                           // ButtonRed
    OPEN,                                           // ButtonBrown
    OPEN,                                           // Teleport
    SOLID,                                          // Wall
    MoveLaw::all(N_IN | W_IN | E_IN | W_OUT | S_OUT | E_OUT),
    MoveLaw::all(N_IN | W_IN | S_IN | N_OUT | S_OUT | E_OUT),
    MoveLaw::all(W_IN | S_IN | E_IN | N_OUT | W_OUT | E_OUT),
    MoveLaw::all(N_IN | S_IN | E_IN | N_OUT | W_OUT | S_OUT),
    MoveLaw::all(S_IN | E_IN | N_OUT | W_OUT),
    SOLID,     // HiddenWallPerm
    CHIP_ONLY, // HiddenWallTemp
    CHIP_ONLY, // BlueWallReal
    CHIP_ONLY, // BlueWallFake
    OPEN,      // SwitchWallOpen
    SOLID,     // SwitchWallClosed
    CHIP_ONLY, // PopupWall
    SOLID,     // CloneMachine
    CHIP_ONLY, // DoorRed
    CHIP_ONLY, // DoorBlue
    CHIP_ONLY, // DoorYellow
    CHIP_ONLY, // DoorGreen
    CHIP_ONLY, // Socket
    CHIP_ONLY, // Exit
    CHIP_ONLY, // IcChip
    OPEN,      // KeyRed
    OPEN,      // KeyBlue
    CHIP_ONLY, // KeyYellow
    CHIP_ONLY, // KeyGreen
    CHIP_ONLY, // BootsIce
    CHIP_ONLY, // BootsSlide
    CHIP_ONLY, // BootsFire
    CHIP_ONLY, // BootsWater
    NONE,      // BlockStatic
    NONE,      // DrownedChip
    NONE,      // BurnedChip
    NONE,      // BombedChip
    NONE,      // ExitedChip
    NONE,      // ExitExtra1
    NONE,      // ExitExtra2
    NONE,      // OverlayBuffer
    NONE,      // FloorReserved2
    NONE,      // FloorReserved1
];

#[inline]
pub fn law(floor: Floor) -> MoveLaw {
    MOVE_LAWS[usize::from(floor.as_u8())]
}

/// True if `mover` may enter `floor` travelling in `dir`.
#[inline]
pub fn may_enter(floor: Floor, mover: Mover, dir: Dir) -> bool {
    law(floor).mask(mover) & dir.bits() != 0
}

/// True if `mover` may leave `floor` travelling in `dir`.
#[inline]
pub fn may_leave(floor: Floor, mover: Mover, dir: Dir) -> bool {
    law(floor).mask(mover) & (dir.bits() << 4) != 0
}
