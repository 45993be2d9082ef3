//! Literal context modeling and context-map decoding.
//!
//! Each literal block type carries a 2-bit context mode deciding how the
//! two previously emitted bytes select one of 64 literal contexts. The
//! context value then indexes a per-meta-block context map to pick the
//! prefix code for the next literal. Distance codes use the same map
//! machinery with a 4-context space keyed on the copy length.

use crate::decode::bit_reader::BitReader;
use crate::decode::huffman::read_prefix_code;
use crate::error::{Error, Result};
use crate::io::Source;

/// Context bits per literal block type (64 contexts).
pub const LITERAL_CONTEXT_BITS: usize = 6;

/// Context bits per distance block type (4 contexts).
pub const DISTANCE_CONTEXT_BITS: usize = 2;

/// UTF-8 mode classification of the previous byte.
#[rustfmt::skip]
const UTF8_PREV1: [u8; 256] = [
     0,  0,  0,  0,  0,  0,  0,  0,  0,  4,  4,  0,  0,  4,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,
     8, 12, 16, 12, 12, 20, 12, 16, 24, 28, 12, 12, 32, 12, 36, 12,
    44, 44, 44, 44, 44, 44, 44, 44, 44, 44, 32, 32, 24, 40, 28, 12,
    12, 48, 52, 52, 52, 48, 52, 52, 52, 48, 52, 52, 52, 52, 52, 48,
    52, 52, 52, 52, 52, 48, 52, 52, 52, 52, 52, 24, 12, 28, 12, 12,
    12, 56, 60, 60, 60, 56, 60, 60, 60, 56, 60, 60, 60, 60, 60, 56,
    60, 60, 60, 60, 60, 56, 60, 60, 60, 60, 60, 24, 12, 28, 12,  0,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,  0,  1,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
     2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,  2,  3,
];

/// UTF-8 mode classification of the byte before the previous one.
#[rustfmt::skip]
const UTF8_PREV2: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1,
    1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1,
    1, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 1, 1, 1, 1, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
];

/// Signed mode: 3-bit magnitude class of a byte.
#[rustfmt::skip]
const SIGNED_CLASS: [u8; 256] = [
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 7,
];

/// Two 256-byte lookup halves per context mode. A literal context is
/// `CONTEXT_LUT[off1 + prev1] | CONTEXT_LUT[off2 + prev2]` where the
/// offset pair comes from [`CONTEXT_LUT_OFFSETS`].
pub static CONTEXT_LUT: [u8; 1792] = build_context_lut();

/// Offset pairs indexed by the stored context mode (2-bit mode shifted
/// left by one): LSB6, MSB6, UTF8, Signed.
pub const CONTEXT_LUT_OFFSETS: [usize; 8] = [1024, 1536, 1280, 1536, 0, 256, 512, 768];

const fn build_context_lut() -> [u8; 1792] {
    let mut lut = [0u8; 1792];
    let mut i = 0;
    while i < 256 {
        // UTF8: prev1 classes in the low half, prev2 classes above.
        lut[i] = UTF8_PREV1[i];
        lut[256 + i] = UTF8_PREV2[i];
        // Signed: 3-bit class of prev1 shifted clear of prev2's class.
        lut[512 + i] = SIGNED_CLASS[i] << 3;
        lut[768 + i] = SIGNED_CLASS[i];
        // LSB6 / MSB6 take all six bits from prev1; the shared zero
        // block at 1536 blanks prev2.
        lut[1024 + i] = (i as u8) & 0x3f;
        lut[1280 + i] = (i as u8) >> 2;
        i += 1;
    }
    lut
}

/// Decode a context map of `map_size` entries.
///
/// Returns the map and the number of prefix codes it refers to.
pub fn decode_context_map<R: Source>(
    br: &mut BitReader<R>,
    map_size: usize,
) -> Result<(Vec<u8>, usize)> {
    let num_codes = br.read_bits(8)? as usize + 1;
    let mut map = vec![0u8; map_size];
    if num_codes == 1 {
        return Ok((map, num_codes));
    }

    let max_run_length_prefix = if br.read_bits(1)? == 1 {
        br.read_bits(4)? as usize + 1
    } else {
        0
    };
    let index_code = read_prefix_code(br, num_codes + max_run_length_prefix)?;
    let mut i = 0;
    while i < map_size {
        let symbol = index_code.read_symbol(br)? as usize;
        if symbol == 0 {
            map[i] = 0;
            i += 1;
        } else if symbol <= max_run_length_prefix {
            // Run of zeros; the map is zero-initialized already.
            let run = (1usize << symbol) + br.read_bits(symbol as u8)? as usize;
            if i + run > map_size {
                return Err(Error::Format("context map overflow".into()));
            }
            i += run;
        } else {
            map[i] = (symbol - max_run_length_prefix) as u8;
            i += 1;
        }
    }
    if br.read_bits(1)? == 1 {
        inverse_move_to_front(&mut map);
    }
    Ok((map, num_codes))
}

/// Undo a move-to-front transform in place.
pub fn inverse_move_to_front(values: &mut [u8]) {
    let mut mtf = [0u8; 256];
    for (i, slot) in mtf.iter_mut().enumerate() {
        *slot = i as u8;
    }
    for value in values.iter_mut() {
        let index = *value as usize;
        *value = mtf[index];
        if index != 0 {
            let front = mtf[index];
            for j in (1..=index).rev() {
                mtf[j] = mtf[j - 1];
            }
            mtf[0] = front;
        }
    }
}
