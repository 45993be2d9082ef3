//! Bit-level reader over a byte [`Source`].
//!
//! The compressed stream is little-endian across bytes and LSB-first
//! within a byte. The reader keeps a 64-bit accumulator topped up from a
//! staging buffer so that prefix-code lookups can always peek a full
//! lookup window without touching the source.

use crate::error::{Error, Result};
use crate::io::Source;

/// Size of the staging buffer refilled from the source in one call.
const STAGE_SIZE: usize = 1024;

/// Largest single read the decoder ever issues (24-bit extra-bit fields).
pub const MAX_READ_BITS: u8 = 24;

/// LSB-first bit reader with a 64-bit lookahead accumulator.
pub struct BitReader<R> {
    src: R,
    stage: Box<[u8; STAGE_SIZE]>,
    stage_pos: usize,
    stage_len: usize,
    bit_buf: u64,
    bits: u32,
    /// Bytes moved from the source into the accumulator so far.
    fed: u64,
    eof: bool,
}

impl<R: Source> BitReader<R> {
    /// Create a reader over `src`. No bytes are pulled until needed.
    pub fn new(src: R) -> Self {
        Self {
            src,
            stage: Box::new([0; STAGE_SIZE]),
            stage_pos: 0,
            stage_len: 0,
            bit_buf: 0,
            bits: 0,
            fed: 0,
            eof: false,
        }
    }

    /// Top up the accumulator from the staging buffer, refilling the
    /// staging buffer from the source as needed. Stops silently at end
    /// of input; missing bits read as zero until consumed.
    fn fill(&mut self) {
        while self.bits <= 56 {
            if self.stage_pos == self.stage_len {
                if self.eof {
                    return;
                }
                self.stage_len = self.src.read(&mut self.stage[..]);
                self.stage_pos = 0;
                if self.stage_len == 0 {
                    self.eof = true;
                    return;
                }
            }
            self.bit_buf |= (self.stage[self.stage_pos] as u64) << self.bits;
            self.stage_pos += 1;
            self.bits += 8;
            self.fed += 1;
        }
    }

    /// Peek the next `n` bits without consuming them, LSB-first.
    ///
    /// Past end of input the missing high bits read as zero; a later
    /// [`consume`](Self::consume) of more bits than remain is the error.
    #[inline]
    pub fn peek_bits(&mut self, n: u8) -> u32 {
        debug_assert!(n <= MAX_READ_BITS);
        if self.bits < n as u32 {
            self.fill();
        }
        (self.bit_buf & ((1u64 << n) - 1)) as u32
    }

    /// Consume `n` bits. Fails with [`Error::Truncated`] when fewer than
    /// `n` bits of real input remain.
    #[inline]
    pub fn consume(&mut self, n: u8) -> Result<()> {
        if (n as u32) > self.bits {
            return Err(Error::Truncated);
        }
        self.bit_buf >>= n;
        self.bits -= n as u32;
        Ok(())
    }

    /// Read `n` bits (`n` <= 24), LSB of the stream in bit 0.
    #[inline]
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        let value = self.peek_bits(n);
        self.consume(n)?;
        Ok(value)
    }

    /// Number of whole input bytes consumed so far.
    #[allow(dead_code)]
    pub fn position(&self) -> u64 {
        self.fed - (self.bits / 8) as u64
    }
}
