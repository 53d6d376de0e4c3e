use serde::{Deserialize, Serialize};

use crate::grid::{chebyshev, LEVEL_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Sound {
    ChipLoses = 0,
    ChipWins = 1,
    TimeOut = 2,
    TimeLow = 3,
    CantMove = 4,
    IcCollected = 5,
    BootsCollected = 6,
    KeyCollected = 7,
    BootsStolen = 8,
    Teleporting = 9,
    DoorOpened = 10,
    SocketOpened = 11,
    ButtonPushed = 12,
    WallCreated = 14,
    BombExplodes = 16,
    WaterSplash = 17,
}

impl Sound {
    pub const ALL: [Sound; 16] = [
        Sound::ChipLoses,
        Sound::ChipWins,
        Sound::TimeOut,
        Sound::TimeLow,
        Sound::CantMove,
        Sound::IcCollected,
        Sound::BootsCollected,
        Sound::KeyCollected,
        Sound::BootsStolen,
        Sound::Teleporting,
        Sound::DoorOpened,
        Sound::SocketOpened,
        Sound::ButtonPushed,
        Sound::WallCreated,
        Sound::BombExplodes,
        Sound::WaterSplash,
    ];

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(id: u8) -> Option<Sound> {
        Sound::ALL.iter().copied().find(|s| s.as_u8() == id)
    }
}

/// A sound queued during a tick, for the presentation layer to drain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub sound: Sound,
    pub volume: f32,
}

impl SoundEvent {
    pub fn full(sound: Sound) -> Self {
        Self { sound, volume: 1.0 }
    }
}

const MAX_VOLUME: f32 = 1.0;
const MIN_VOLUME: f32 = 0.03;
const MAX_VOLUME_DISTANCE: f32 = 8.0;

/// Volume of a sound made at `source` as heard by Chip at `listener`.
pub fn volume(source: usize, listener: usize) -> f32 {
    let distance = chebyshev(source, listener) as f32;
    let span = (LEVEL_SIZE as f32 - 1.0) - (MAX_VOLUME_DISTANCE + 1.0);
    let slope = (MIN_VOLUME - MAX_VOLUME) / span;
    (MAX_VOLUME + slope * (distance - MAX_VOLUME_DISTANCE)).clamp(MIN_VOLUME, MAX_VOLUME)
}
