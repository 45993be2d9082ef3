//! Decompression of the early Brotli compressed stream format.
//!
//! A stream is a short header (optional decoded-size hint, window size)
//! followed by meta-blocks. Each meta-block re-describes its own entropy
//! coding: block-type codes for three symbol categories, context maps,
//! and groups of prefix codes for literals, insert-and-copy commands,
//! and distances. The main loop interleaves literal insertion with
//! back-reference copies into the sliding window.

mod bit_reader;
mod block;
mod command;
mod context;
mod huffman;
mod ring;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::io::{MemSink, Sink, Source};
use bit_reader::BitReader;
use block::BlockSwitcher;
use command::{read_command, read_distance_code, DistanceRing, NUM_DISTANCE_SHORT_CODES};
use context::{
    decode_context_map, CONTEXT_LUT, CONTEXT_LUT_OFFSETS, DISTANCE_CONTEXT_BITS,
    LITERAL_CONTEXT_BITS,
};
use huffman::{read_prefix_code, PrefixCode};
use ring::RingBuffer;

/// Alphabet size of every literal code.
const NUM_LITERAL_CODES: usize = 256;

/// Alphabet size of every insert-and-copy command code.
const NUM_COMMAND_CODES: usize = 704;

/// Read the optional decoded-size hint leading the stream: a 3-bit byte
/// count followed by that many little-endian size bytes.
fn read_size_hint<R: Source>(br: &mut BitReader<R>) -> Result<Option<u64>> {
    let size_bytes = br.read_bits(3)?;
    if size_bytes == 0 {
        return Ok(None);
    }
    let mut size = 0u64;
    for i in 0..size_bytes {
        size |= (br.read_bits(8)? as u64) << (8 * i);
    }
    Ok(Some(size))
}

/// Probe a stream for its declared decoded size without decompressing.
///
/// Returns `None` when the stream carries no size hint (or is too short
/// to contain one).
pub fn decompressed_size(encoded: &[u8]) -> Option<u64> {
    let mut br = BitReader::new(encoded);
    read_size_hint(&mut br).ok().flatten()
}

/// Decompress `src` into `sink`, returning the number of bytes written.
pub fn decompress<R: Source, W: Sink>(src: R, sink: &mut W) -> Result<u64> {
    let mut br = BitReader::new(src);

    let hint = read_size_hint(&mut br)?;
    if hint == Some(0) {
        return Ok(0);
    }
    // Pair each hint with the bit width of `hint - 1`: enough to
    // express any meta-block length below it.
    let hint = hint.map(|n| (n, 64 - (n - 1).leading_zeros()));

    // The window-size bit is only present when a 16-bit window could
    // not cover the declared size anyway.
    let window_bits = match hint {
        Some((_, size_bits)) if size_bits <= 16 => 16,
        _ => {
            if br.read_bits(1)? == 1 {
                17 + br.read_bits(3)?
            } else {
                16
            }
        }
    };
    let max_backward = (1u64 << window_bits) - NUM_DISTANCE_SHORT_CODES as u64;
    debug!(
        "stream header: hint {:?}, window {} bits",
        hint, window_bits
    );

    let mut ring = RingBuffer::new(window_bits);
    let mut dist_ring = DistanceRing::new();
    let mut prev = (0u8, 0u8);

    let mut input_end = false;
    while !input_end {
        input_end = br.read_bits(1)? == 1;
        let pos = ring.position();
        let meta_block_len = match hint {
            None => {
                if input_end {
                    0
                } else {
                    let nibbles = br.read_bits(3)?;
                    let mut len = 0u64;
                    for i in 0..nibbles {
                        len |= (br.read_bits(4)? as u64) << (4 * i);
                    }
                    len + 1
                }
            }
            Some((total, size_bits)) => {
                if input_end {
                    total.checked_sub(pos).ok_or_else(|| {
                        Error::Format("meta-blocks overran the declared size".into())
                    })?
                } else {
                    // Whole-byte chunks covering the hint's bit width.
                    let mut bits_left = size_bits;
                    let mut len = 0u64;
                    let mut shift = 0;
                    while bits_left > 0 {
                        len |= (br.read_bits(8)? as u64) << shift;
                        shift += 8;
                        bits_left = bits_left.saturating_sub(8);
                    }
                    len + 1
                }
            }
        };
        debug!(
            "meta-block: {} bytes at position {}, last: {}",
            meta_block_len, pos, input_end
        );
        if meta_block_len == 0 {
            break;
        }
        decode_meta_block(
            &mut br,
            &mut ring,
            &mut dist_ring,
            &mut prev,
            meta_block_len,
            max_backward,
            sink,
        )?;
    }

    ring.flush_tail(sink)?;
    Ok(ring.position())
}

/// Decompress a complete in-memory stream into a fixed-capacity buffer.
///
/// Returns the number of bytes produced. Output that would not fit
/// fails with [`Error::Sink`]; bytes flushed before a failure are left
/// in `decoded` for diagnostics.
pub fn decompress_buffer(encoded: &[u8], decoded: &mut [u8]) -> Result<usize> {
    let mut sink = MemSink::new(decoded);
    decompress(encoded, &mut sink)?;
    Ok(sink.written())
}

/// Decompress a complete in-memory stream into a fresh vector.
pub fn decompress_to_vec(encoded: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decompress(encoded, &mut out)?;
    Ok(out)
}

/// Decode the body of one meta-block: its header of block codes,
/// context maps and tree groups, then the command loop.
fn decode_meta_block<R: Source, W: Sink>(
    br: &mut BitReader<R>,
    ring: &mut RingBuffer,
    dist_ring: &mut DistanceRing,
    prev: &mut (u8, u8),
    meta_block_len: u64,
    max_backward: u64,
    sink: &mut W,
) -> Result<()> {
    let block_end = ring.position() + meta_block_len;

    let mut literals = BlockSwitcher::parse(br, meta_block_len)?;
    let mut commands = BlockSwitcher::parse(br, meta_block_len)?;
    let mut distances = BlockSwitcher::parse(br, meta_block_len)?;

    let postfix_bits = br.read_bits(2)? as u8;
    let num_direct_codes =
        NUM_DISTANCE_SHORT_CODES + ((br.read_bits(4)? as usize) << postfix_bits);
    let postfix_mask = (1usize << postfix_bits) - 1;
    let num_distance_codes = num_direct_codes + (48 << postfix_bits);
    debug!(
        "block types {}/{}/{}, {} direct distance codes, {} postfix bits",
        literals.num_types(),
        commands.num_types(),
        distances.num_types(),
        num_direct_codes,
        postfix_bits
    );

    // One context mode per literal block type, pre-shifted to index the
    // lookup-offset pairs.
    let mut context_modes = Vec::with_capacity(literals.num_types());
    for _ in 0..literals.num_types() {
        context_modes.push((br.read_bits(2)? as u8) << 1);
    }

    let (literal_map, num_literal_codes) =
        decode_context_map(br, literals.num_types() << LITERAL_CONTEXT_BITS)?;
    let (distance_map, num_distance_groups) =
        decode_context_map(br, distances.num_types() << DISTANCE_CONTEXT_BITS)?;

    let literal_group = read_tree_group(br, NUM_LITERAL_CODES, num_literal_codes)?;
    let command_group = read_tree_group(br, NUM_COMMAND_CODES, commands.num_types())?;
    let distance_group = read_tree_group(br, num_distance_codes, num_distance_groups)?;

    let mut context_offset = 0usize;
    let mut mode = context_modes[0] as usize;
    let mut ctx_off1 = CONTEXT_LUT_OFFSETS[mode];
    let mut ctx_off2 = CONTEXT_LUT_OFFSETS[mode + 1];
    let mut dist_context_offset = 0usize;

    while ring.position() < block_end {
        if commands.remaining == 0 {
            commands.switch(br)?;
        }
        commands.remaining -= 1;
        let cmd = read_command(&command_group[commands.block_type], br)?;
        trace!(
            "command: insert {}, copy {}, implicit {}",
            cmd.insert_len,
            cmd.copy_len,
            cmd.implicit_distance
        );

        for _ in 0..cmd.insert_len {
            if literals.remaining == 0 {
                literals.switch(br)?;
                context_offset = literals.block_type << LITERAL_CONTEXT_BITS;
                mode = context_modes[literals.block_type] as usize;
                ctx_off1 = CONTEXT_LUT_OFFSETS[mode];
                ctx_off2 = CONTEXT_LUT_OFFSETS[mode + 1];
            }
            literals.remaining -= 1;
            let context =
                CONTEXT_LUT[ctx_off1 + prev.0 as usize] | CONTEXT_LUT[ctx_off2 + prev.1 as usize];
            let code = literal_map[context_offset + context as usize] as usize;
            let byte = literal_group[code].read_symbol(br)? as u8;
            prev.1 = prev.0;
            prev.0 = byte;
            ring.push(byte, sink)?;
        }
        if ring.position() == block_end {
            break;
        }

        let distance_code = if cmd.implicit_distance {
            // Reuse the most recent distance without reading a symbol.
            0
        } else {
            if distances.remaining == 0 {
                distances.switch(br)?;
                dist_context_offset = distances.block_type << DISTANCE_CONTEXT_BITS;
            }
            distances.remaining -= 1;
            let context = if cmd.copy_len > 4 { 3 } else { cmd.copy_len - 2 };
            let code = distance_map[dist_context_offset + context] as usize;
            read_distance_code(
                &distance_group[code],
                br,
                num_direct_codes,
                postfix_bits,
                postfix_mask,
            )?
        };

        let distance = dist_ring.resolve(distance_code);
        if distance_code > 0 {
            dist_ring.push(distance);
        }

        let pos = ring.position();
        let max_distance = max_backward.min(pos);
        if distance < 1 || distance as u64 > max_distance {
            return Err(Error::Backref {
                distance: u64::try_from(distance).unwrap_or(0),
                max_distance,
            });
        }
        if pos + cmd.copy_len as u64 > block_end {
            return Err(Error::Overrun {
                position: pos,
                copy_len: cmd.copy_len,
                block_end,
            });
        }

        ring.copy_match(distance as u64, cmd.copy_len, sink)?;
        let pos = ring.position();
        *prev = (ring.byte_at(pos - 1), ring.byte_at(pos - 2));
    }
    Ok(())
}

/// Read `count` prefix codes sharing one alphabet.
fn read_tree_group<R: Source>(
    br: &mut BitReader<R>,
    alphabet_size: usize,
    count: usize,
) -> Result<Vec<PrefixCode>> {
    let mut group = Vec::with_capacity(count);
    for _ in 0..count {
        group.push(read_prefix_code(br, alphabet_size)?);
    }
    Ok(group)
}
