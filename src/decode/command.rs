//! Insert-and-copy command decoding and distance resolution.
//!
//! One 10-bit command symbol carries an insert-length class, a
//! copy-length class, and whether the copy reuses the previous distance.
//! Distances decode through a 4-slot recency ring for the 16 short
//! codes, then a direct range, then a postfix/extra-bit scheme for
//! everything farther away.

use crate::decode::bit_reader::BitReader;
use crate::decode::huffman::PrefixCode;
use crate::error::Result;
use crate::io::Source;

/// Number of distance codes that index the recency ring.
pub const NUM_DISTANCE_SHORT_CODES: usize = 16;

/// Insert-length class base per command cell (cells 2..11 normalized).
const INSERT_RANGE_LUT: [usize; 9] = [0, 0, 8, 8, 0, 16, 8, 16, 16];

/// Copy-length class base per command cell.
const COPY_RANGE_LUT: [usize; 9] = [0, 8, 0, 8, 16, 0, 16, 8, 16];

/// (offset, extra bits) per insert-length code.
#[rustfmt::skip]
const INSERT_LENGTH_PREFIX: [(u32, u8); 24] = [
    (0, 0),    (1, 0),    (2, 0),     (3, 0),
    (4, 0),    (5, 0),    (6, 1),     (8, 1),
    (10, 2),   (14, 2),   (18, 3),    (26, 3),
    (34, 4),   (50, 4),   (66, 5),    (98, 5),
    (130, 6),  (194, 7),  (322, 8),   (578, 9),
    (1090, 10), (2114, 12), (6210, 14), (22594, 24),
];

/// (offset, extra bits) per copy-length code.
#[rustfmt::skip]
const COPY_LENGTH_PREFIX: [(u32, u8); 24] = [
    (2, 0),    (3, 0),    (4, 0),     (5, 0),
    (6, 0),    (7, 0),    (8, 0),     (9, 0),
    (10, 1),   (12, 1),   (14, 2),    (18, 2),
    (22, 3),   (30, 3),   (38, 4),    (54, 4),
    (70, 5),   (102, 5),  (134, 6),   (198, 7),
    (326, 8),  (582, 9),  (1094, 10), (2118, 24),
];

/// Recency-ring slot looked up per short distance code, relative to the
/// insertion cursor.
const SHORT_CODE_SLOT: [usize; NUM_DISTANCE_SHORT_CODES] =
    [3, 2, 1, 0, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2, 2, 2];

/// Delta applied to the ring value per short distance code.
const SHORT_CODE_DELTA: [i64; NUM_DISTANCE_SHORT_CODES] =
    [0, 0, 0, 0, -1, 1, -2, 2, -3, 3, -1, 1, -2, 2, -3, 3];

/// One decoded insert-and-copy command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Literals to insert before the copy.
    pub insert_len: usize,
    /// Bytes to copy from the window.
    pub copy_len: usize,
    /// Copy reuses the most recent distance; no distance code follows.
    pub implicit_distance: bool,
}

/// Decode one command: the 10-bit symbol plus both extra-bit fields.
pub fn read_command<R: Source>(code: &PrefixCode, br: &mut BitReader<R>) -> Result<Command> {
    let symbol = code.read_symbol(br)? as usize;
    let cell = symbol >> 6;
    let (implicit_distance, range_idx) = if cell >= 2 {
        (false, cell - 2)
    } else {
        (true, cell)
    };
    let insert_code = INSERT_RANGE_LUT[range_idx] + ((symbol >> 3) & 7);
    let copy_code = COPY_RANGE_LUT[range_idx] + (symbol & 7);

    let (insert_offset, insert_bits) = INSERT_LENGTH_PREFIX[insert_code];
    let insert_len = insert_offset as usize + br.read_bits(insert_bits)? as usize;
    let (copy_offset, copy_bits) = COPY_LENGTH_PREFIX[copy_code];
    let copy_len = copy_offset as usize + br.read_bits(copy_bits)? as usize;

    Ok(Command {
        insert_len,
        copy_len,
        implicit_distance,
    })
}

/// Decode a distance code: short and direct codes come straight from
/// the symbol, longer ones append postfix and extra bits.
pub fn read_distance_code<R: Source>(
    table: &PrefixCode,
    br: &mut BitReader<R>,
    num_direct_codes: usize,
    postfix_bits: u8,
    postfix_mask: usize,
) -> Result<usize> {
    let symbol = table.read_symbol(br)? as usize;
    if symbol < num_direct_codes {
        return Ok(symbol);
    }
    let code = symbol - num_direct_codes;
    let postfix = code & postfix_mask;
    let code = code >> postfix_bits;
    let nbits = (code >> 1) as u8 + 1;
    let offset = ((2 + (code & 1)) << nbits) - 4;
    Ok(num_direct_codes + ((offset + br.read_bits(nbits)? as usize) << postfix_bits) + postfix)
}

/// The four most recently used distances.
///
/// Short codes read from the ring without changing it; the driver pushes
/// a freshly resolved distance for every non-zero distance code.
pub struct DistanceRing {
    slots: [i64; 4],
    cursor: usize,
}

impl DistanceRing {
    /// Ring with the format's fixed initial distances.
    pub fn new() -> Self {
        Self {
            slots: [4, 11, 15, 16],
            cursor: 0,
        }
    }

    /// Translate a distance code into a distance. Short codes combine a
    /// ring slot with a small delta, so the result can be non-positive
    /// for a malformed stream; the caller validates the range.
    pub fn resolve(&self, code: usize) -> i64 {
        if code < NUM_DISTANCE_SHORT_CODES {
            self.slots[(self.cursor + SHORT_CODE_SLOT[code]) & 3] + SHORT_CODE_DELTA[code]
        } else {
            (code - NUM_DISTANCE_SHORT_CODES) as i64 + 1
        }
    }

    /// Record a resolved distance as the most recent one.
    pub fn push(&mut self, distance: i64) {
        self.slots[self.cursor & 3] = distance;
        self.cursor = self.cursor.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::BitWriter;

    /// Degenerate command code always yielding `symbol`.
    fn command_code(symbol: usize) -> PrefixCode {
        let mut lengths = vec![0u8; 704];
        lengths[symbol] = 1;
        PrefixCode::from_lengths(&lengths).unwrap()
    }

    #[test]
    fn test_command_implicit_cell() {
        // Symbol 8: cell 0, insert class 1, copy class 0.
        let code = command_code(8);
        let mut br = BitReader::new(&[][..]);
        let cmd = read_command(&code, &mut br).unwrap();
        assert_eq!(
            cmd,
            Command {
                insert_len: 1,
                copy_len: 2,
                implicit_distance: true,
            }
        );
    }

    #[test]
    fn test_command_explicit_cell() {
        // Symbol 146: cell 2, insert class 2, copy class 2.
        let code = command_code(146);
        let mut br = BitReader::new(&[][..]);
        let cmd = read_command(&code, &mut br).unwrap();
        assert_eq!(
            cmd,
            Command {
                insert_len: 2,
                copy_len: 4,
                implicit_distance: false,
            }
        );
    }

    #[test]
    fn test_command_extra_bits() {
        // Symbol 399: cell 6, insert class 1, copy class 23 with 24
        // extra bits.
        let code = command_code(399);
        let mut w = BitWriter::new();
        w.write_bits(63_417, 24);
        let bytes = w.finish();
        let mut br = BitReader::new(&bytes[..]);

        let cmd = read_command(&code, &mut br).unwrap();
        assert_eq!(cmd.insert_len, 1);
        assert_eq!(cmd.copy_len, 2118 + 63_417);
        assert!(!cmd.implicit_distance);
    }

    #[test]
    fn test_command_high_cell_ranges() {
        // Symbol 640: cell 10, both classes start at 16.
        let code = command_code(640);
        let mut w = BitWriter::new();
        w.write_bits(0, 6); // insert extra bits for class 16
        w.write_bits(0, 5); // copy extra bits for class 16
        let bytes = w.finish();
        let mut br = BitReader::new(&bytes[..]);

        let cmd = read_command(&code, &mut br).unwrap();
        assert_eq!(cmd.insert_len, 130);
        assert_eq!(cmd.copy_len, 70);
        assert!(!cmd.implicit_distance);
    }

    /// Degenerate distance code always yielding `symbol`.
    fn distance_code_table(symbol: usize, alphabet: usize) -> PrefixCode {
        let mut lengths = vec![0u8; alphabet];
        lengths[symbol] = 1;
        PrefixCode::from_lengths(&lengths).unwrap()
    }

    #[test]
    fn test_distance_code_direct() {
        // With 16 direct codes and no postfix, symbol 7 is returned
        // as-is (a short code).
        let table = distance_code_table(7, 64);
        let mut br = BitReader::new(&[][..]);
        assert_eq!(
            read_distance_code(&table, &mut br, 16, 0, 0).unwrap(),
            7
        );
    }

    #[test]
    fn test_distance_code_extended() {
        // Symbol 19 beyond 16 direct codes, no postfix: two extra bits,
        // base offset 8.
        let table = distance_code_table(19, 64);
        let mut w = BitWriter::new();
        w.write_bits(2, 2);
        let bytes = w.finish();
        let mut br = BitReader::new(&bytes[..]);

        // code 3 -> nbits 2, offset (2+1)<<2 - 4 = 8; 16 + 8 + 2 = 26,
        // which the recency ring later maps to distance 11.
        assert_eq!(
            read_distance_code(&table, &mut br, 16, 0, 0).unwrap(),
            26
        );
    }

    #[test]
    fn test_distance_code_postfix() {
        // Two postfix bits: num_direct = 16 + (1 << 2) = 20 with a
        // 4-wide postfix interleave.
        let table = distance_code_table(27, 256);
        let mut w = BitWriter::new();
        w.write_bits(1, 1);
        let bytes = w.finish();
        let mut br = BitReader::new(&bytes[..]);

        // code 7: postfix 3, high part 1 -> nbits 1, offset 2.
        let resolved = read_distance_code(&table, &mut br, 20, 2, 3).unwrap();
        assert_eq!(resolved, 20 + ((2 + 1) << 2) + 3);
    }

    #[test]
    fn test_ring_initial_short_codes() {
        let ring = DistanceRing::new();
        // Code 0 is the most recent entry; the initial ring is
        // (16, 15, 11, 4) from newest to oldest.
        assert_eq!(ring.resolve(0), 16);
        assert_eq!(ring.resolve(1), 15);
        assert_eq!(ring.resolve(2), 11);
        assert_eq!(ring.resolve(3), 4);
        // Delta codes modify the two newest entries.
        assert_eq!(ring.resolve(4), 15); // newest - 1
        assert_eq!(ring.resolve(5), 17); // newest + 1
        assert_eq!(ring.resolve(10), 14); // second newest - 1
        assert_eq!(ring.resolve(15), 18); // second newest + 3
    }

    #[test]
    fn test_ring_reuse_does_not_mutate() {
        let mut ring = DistanceRing::new();
        ring.push(5); // as if a distance of 5 was decoded
        assert_eq!(ring.resolve(0), 5);
        // Re-resolving through the reuse code leaves the ring alone.
        assert_eq!(ring.resolve(0), 5);
        assert_eq!(ring.resolve(1), 16);

        ring.push(9);
        // Newest two are now 9 and 5; the older slots survive.
        assert_eq!(ring.resolve(0), 9);
        assert_eq!(ring.resolve(1), 5);
        assert_eq!(ring.resolve(2), 16);
        assert_eq!(ring.resolve(3), 15);
    }

    #[test]
    fn test_ring_wraps_after_four_pushes() {
        let mut ring = DistanceRing::new();
        for d in [100, 200, 300, 400, 500] {
            ring.push(d);
        }
        assert_eq!(ring.resolve(0), 500);
        assert_eq!(ring.resolve(1), 400);
        assert_eq!(ring.resolve(2), 300);
        assert_eq!(ring.resolve(3), 200);
    }

    #[test]
    fn test_ring_resolve_beyond_short_codes() {
        let ring = DistanceRing::new();
        assert_eq!(ring.resolve(16), 1);
        assert_eq!(ring.resolve(26), 11);
    }
}
