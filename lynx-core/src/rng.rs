use serde::{Deserialize, Serialize};

/// The classic 31-bit linear congruential generator. The sequence is part of
/// the replay format and must never change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prng {
    initial: u32,
    value: u32,
}

impl Prng {
    pub fn new(seed: u32) -> Self {
        let mut prng = Self::default();
        prng.restart(seed);
        prng
    }

    pub fn restart(&mut self, seed: u32) {
        self.initial = seed & 0x7FFF_FFFF;
        self.value = self.initial;
    }

    /// Rewinds to the seed given to the last `restart`.
    pub fn reset(&mut self) {
        self.value = self.initial;
    }

    #[inline]
    pub fn initial(&self) -> u32 {
        self.initial
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    #[inline]
    pub fn set_value(&mut self, value: u32) {
        self.value = value;
    }

    #[inline]
    pub fn advance(&mut self) -> u32 {
        self.value = self.value.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7FFF_FFFF;
        self.value
    }

    /// Top two bits of the next value, `0..=3`.
    #[inline]
    pub fn random4(&mut self) -> u8 {
        (self.advance() >> 29) as u8
    }
}

/// Two-byte shift register used only by walkers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalkerRng {
    pub r1: u8,
    pub r2: u8,
}

impl WalkerRng {
    pub fn reset(&mut self) {
        self.r1 = 0;
        self.r2 = 0;
    }

    #[inline]
    pub fn next_u8(&mut self) -> u8 {
        let r1 = i32::from(self.r1);
        let mut n = (r1 >> 2) - r1;
        if r1 & 0x02 == 0 {
            n -= 1;
        }
        if n < 0 {
            n += 0x100;
        }
        self.r1 = (self.r1 >> 1) | (self.r2 & 0x80);
        self.r2 = (self.r2 << 1) | (n & 0x01) as u8;
        self.r1 ^ self.r2
    }
}
