//! LSB-first bit packing over a vector of words.

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Packed bits plus the number of bits actually written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitBuf {
    words: Vec<u64>,
    len: usize,
}

impl BitBuf {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Heap bytes held by the packed words.
    pub fn byte_size(&self) -> usize {
        self.words.len() * std::mem::size_of::<u64>()
    }
}

#[derive(Debug, Default)]
pub struct BitWriter {
    buf: BitBuf,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `width` bits of `value`.
    pub fn write(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 64);
        for i in 0..width {
            let bit = (value >> i) & 1;
            let (word, offset) = (self.buf.len / WORD_BITS, self.buf.len % WORD_BITS);
            if word == self.buf.words.len() {
                self.buf.words.push(0);
            }
            self.buf.words[word] |= bit << offset;
            self.buf.len += 1;
        }
    }

    /// Two's complement, truncated to `width` bits.
    pub fn write_signed(&mut self, value: i64, width: u32) {
        self.write(value as u64, width);
    }

    pub fn finish(mut self) -> BitBuf {
        self.buf.words.shrink_to_fit();
        self.buf
    }
}

pub struct BitReader<'a> {
    buf: &'a BitBuf,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a BitBuf) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len - self.pos
    }

    /// Next `width` bits, or `None` if the buffer runs out first.
    pub fn read(&mut self, width: u32) -> Option<u64> {
        let width_bits = width as usize;
        if width_bits > self.remaining() {
            return None;
        }
        let mut value = 0u64;
        for i in 0..width_bits {
            let at = self.pos + i;
            let bit = (self.buf.words[at / WORD_BITS] >> (at % WORD_BITS)) & 1;
            value |= bit << i;
        }
        self.pos += width_bits;
        Some(value)
    }

    /// Sign-extends a `width`-bit two's complement value.
    pub fn read_signed(&mut self, width: u32) -> Option<i64> {
        let raw = self.read(width)?;
        if width == 0 || width == 64 {
            return Some(raw as i64);
        }
        let shift = 64 - width;
        Some(((raw << shift) as i64) >> shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_straddle_word_boundaries() {
        let mut w = BitWriter::new();
        w.write(0b101, 3);
        w.write(u64::from(u32::MAX), 32);
        w.write(0x1234_5678_9ABC, 48);
        w.write(1, 1);
        let buf = w.finish();
        assert_eq!(buf.len(), 84);
        assert_eq!(buf.byte_size(), 16);

        let mut r = BitReader::new(&buf);
        assert_eq!(r.read(3), Some(0b101));
        assert_eq!(r.read(32), Some(u64::from(u32::MAX)));
        assert_eq!(r.read(48), Some(0x1234_5678_9ABC));
        assert_eq!(r.read(1), Some(1));
        assert_eq!(r.read(1), None);
    }

    #[test]
    fn signed_values_sign_extend() {
        let mut w = BitWriter::new();
        for v in [-8i64, -1, 0, 7] {
            w.write_signed(v, 4);
        }
        w.write_signed(i64::from(i8::MIN), 8);
        let buf = w.finish();
        let mut r = BitReader::new(&buf);
        let got: Vec<_> = (0..4).filter_map(|_| r.read_signed(4)).collect();
        assert_eq!(got, vec![-8, -1, 0, 7]);
        assert_eq!(r.read_signed(8), Some(-128));
        assert_eq!(r.remaining(), 0);
    }
}
