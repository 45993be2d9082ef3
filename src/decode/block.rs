//! Block-category switching.
//!
//! A meta-block splits each of its three symbol streams (literals,
//! commands, distances) into blocks of varying type. Every category
//! tracks the current type, the bytes or symbols remaining in the
//! current block, and a two-slot history so the stream can re-select a
//! recent type with a single short code.

use crate::decode::bit_reader::BitReader;
use crate::decode::huffman::{read_prefix_code, PrefixCode};
use crate::error::{Error, Result};
use crate::io::Source;

/// Alphabet size of every block-length code.
const NUM_BLOCK_LENGTH_CODES: usize = 26;

/// (offset, extra bits) per block-length symbol.
#[rustfmt::skip]
const BLOCK_LENGTH_PREFIX: [(u32, u8); NUM_BLOCK_LENGTH_CODES] = [
    (1, 2),     (5, 2),     (9, 2),     (13, 2),
    (17, 3),    (25, 3),    (33, 3),    (41, 3),
    (49, 4),    (65, 4),    (81, 4),    (97, 4),
    (113, 5),   (145, 5),   (177, 5),   (209, 5),
    (241, 6),   (305, 6),   (369, 7),   (497, 8),
    (753, 9),   (1265, 10), (2289, 11), (4337, 12),
    (8433, 13), (16625, 24),
];

/// Prefix codes read for a category with more than one block type.
struct BlockCodes {
    block_type: PrefixCode,
    block_length: PrefixCode,
}

/// Per-category block state for one meta-block.
pub struct BlockSwitcher {
    /// Currently selected block type.
    pub block_type: usize,
    /// Bytes (literals) or symbols (commands, distances) left in the
    /// current block.
    pub remaining: u64,
    num_types: usize,
    recent: [usize; 2],
    cursor: usize,
    codes: Option<BlockCodes>,
}

impl BlockSwitcher {
    /// Read one category's block configuration from the meta-block
    /// header. A cleared leading bit means a single type spanning the
    /// whole meta-block.
    pub fn parse<R: Source>(br: &mut BitReader<R>, meta_block_len: u64) -> Result<Self> {
        if br.read_bits(1)? == 0 {
            return Ok(Self {
                block_type: 0,
                remaining: meta_block_len,
                num_types: 1,
                recent: [0, 1],
                cursor: 0,
                codes: None,
            });
        }
        let num_types = br.read_bits(8)? as usize + 1;
        let block_type = read_prefix_code(br, num_types + 2)?;
        let block_length = read_prefix_code(br, NUM_BLOCK_LENGTH_CODES)?;
        let remaining = read_block_length(&block_length, br)?;
        Ok(Self {
            block_type: 0,
            remaining,
            num_types,
            recent: [0, 1],
            cursor: 1,
            codes: Some(BlockCodes {
                block_type,
                block_length,
            }),
        })
    }

    /// Number of block types in this category.
    pub fn num_types(&self) -> usize {
        self.num_types
    }

    /// Select the next block type and length. Called when `remaining`
    /// reaches zero; a single-type category has nothing to switch to,
    /// so running out of block budget there is a stream error.
    pub fn switch<R: Source>(&mut self, br: &mut BitReader<R>) -> Result<()> {
        let codes = self
            .codes
            .as_ref()
            .ok_or_else(|| Error::Format("block budget exhausted".into()))?;
        let code = codes.block_type.read_symbol(br)? as usize;
        let block_type = match code {
            0 => self.recent[self.cursor & 1],
            1 => (self.recent[self.cursor.wrapping_sub(1) & 1] + 1) % self.num_types,
            _ => code - 2,
        };
        self.recent[self.cursor & 1] = block_type;
        self.cursor += 1;
        self.block_type = block_type;
        self.remaining = read_block_length(&codes.block_length, br)?;
        Ok(())
    }
}

/// Decode one block length: a prefix symbol plus its extra bits.
fn read_block_length<R: Source>(code: &PrefixCode, br: &mut BitReader<R>) -> Result<u64> {
    let symbol = code.read_symbol(br)? as usize;
    let (offset, nbits) = BLOCK_LENGTH_PREFIX[symbol];
    Ok(offset as u64 + br.read_bits(nbits)? as u64)
}
