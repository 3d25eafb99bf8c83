//! LZ4 block format: sequence encoding, greedy matcher and decoder.
//!
//! A block is a run of sequences:
//!
//! ```text
//! [token: u8]                  // high nibble literal length, low nibble match length - 4
//! [literal length ext: 0xFF* n] // present when the literal nibble is 15
//! [literals]
//! [distance: u16 LE]           // absent in the terminal sequence
//! [match length ext: 0xFF* n]   // present when the match nibble is 15
//! ```
//!
//! The encoder keeps the end-of-block rules of the reference format: the
//! last `LAST_LITERALS` bytes are always literals and no match starts within
//! the last `MF_LIMIT` bytes, so blocks decode with any LZ4 block decoder.

use crate::compress::{Compressor, Decompressor};
use crate::error::{Error, Result};
use crate::store::IndexInput;
use std::ops::Range;

/// Minimum match length.
pub const MIN_MATCH: usize = 4;

/// Minimum length of the terminal literal run.
pub const LAST_LITERALS: usize = 5;

/// No match may start within this many bytes of the end of the input.
pub const MF_LIMIT: usize = 12;

/// Largest back-reference distance.
pub const MAX_DISTANCE: usize = 65535;

const MIN_HASH_LOG: u32 = 8;
const MAX_HASH_LOG: u32 = 16;
const RUN_MASK: usize = 0x0F;

#[inline]
pub(crate) fn read_u32(bytes: &[u8], i: usize) -> u32 {
    u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
}

#[inline]
pub(crate) fn hash(sequence: u32, hash_log: u32) -> usize {
    (sequence.wrapping_mul(2_654_435_761) >> (32 - hash_log)) as usize
}

/// Number of equal bytes at `o1` and `o2` (`o1 < o2`), not reading at or
/// beyond `limit`.
#[inline]
pub(crate) fn common_bytes(bytes: &[u8], mut o1: usize, mut o2: usize, limit: usize) -> usize {
    let mut count = 0;
    while o2 < limit && bytes[o1] == bytes[o2] {
        o1 += 1;
        o2 += 1;
        count += 1;
    }
    count
}

fn write_len(mut len: usize, out: &mut Vec<u8>) {
    while len >= 0xFF {
        out.push(0xFF);
        len -= 0xFF;
    }
    out.push(len as u8);
}

fn encode_literals(bytes: &[u8], token_low: u8, anchor: usize, literal_len: usize, out: &mut Vec<u8>) {
    let token_high = literal_len.min(RUN_MASK) as u8;
    out.push((token_high << 4) | token_low);
    if literal_len >= RUN_MASK {
        write_len(literal_len - RUN_MASK, out);
    }
    out.extend_from_slice(&bytes[anchor..anchor + literal_len]);
}

/// Emit the literal-only terminal sequence.
pub(crate) fn encode_last_literals(bytes: &[u8], anchor: usize, out: &mut Vec<u8>) {
    encode_literals(bytes, 0, anchor, bytes.len() - anchor, out);
}

/// Emit literals `[anchor, match_off)` followed by a match of `match_len`
/// bytes copying from `match_ref`.
pub(crate) fn encode_sequence(
    bytes: &[u8],
    anchor: usize,
    match_ref: usize,
    match_off: usize,
    match_len: usize,
    out: &mut Vec<u8>,
) {
    debug_assert!(match_len >= MIN_MATCH);
    let distance = match_off - match_ref;
    debug_assert!(distance > 0 && distance <= MAX_DISTANCE);

    let extra = match_len - MIN_MATCH;
    encode_literals(bytes, extra.min(RUN_MASK) as u8, anchor, match_off - anchor, out);
    out.extend_from_slice(&(distance as u16).to_le_bytes());
    if extra >= RUN_MASK {
        write_len(extra - RUN_MASK, out);
    }
}

/// Grow a match backwards over pending literals.
#[inline]
pub(crate) fn extend_backwards(
    bytes: &[u8],
    anchor: usize,
    match_ref: &mut usize,
    match_off: &mut usize,
    match_len: &mut usize,
) {
    while *match_off > anchor && *match_ref > 0 && bytes[*match_off - 1] == bytes[*match_ref - 1] {
        *match_off -= 1;
        *match_ref -= 1;
        *match_len += 1;
    }
}

/// Single-slot hash table of 4-byte sequences, reused across calls.
#[derive(Debug, Clone, Default)]
pub struct FastHashTable {
    hash_log: u32,
    table: Vec<u32>,
}

impl FastHashTable {
    const EMPTY: u32 = u32::MAX;

    fn reset(&mut self, len: usize) {
        let log2 = usize::BITS - len.saturating_sub(1).leading_zeros();
        self.hash_log = log2.clamp(MIN_HASH_LOG, MAX_HASH_LOG);
        self.table.clear();
        self.table.resize(1 << self.hash_log, Self::EMPTY);
    }

    /// Record `off` and return the previous position with the same
    /// 4-byte sequence, if it is within reach.
    fn get_and_set(&mut self, bytes: &[u8], off: usize) -> Option<usize> {
        let sequence = read_u32(bytes, off);
        let slot = hash(sequence, self.hash_log);
        let previous = self.table[slot];
        self.table[slot] = off as u32;

        if previous == Self::EMPTY {
            return None;
        }
        let previous = previous as usize;
        if off - previous <= MAX_DISTANCE && read_u32(bytes, previous) == sequence {
            Some(previous)
        } else {
            None
        }
    }
}

/// Greedy compression: the first candidate found at each position is taken
/// and extended as far as it goes.
pub(crate) fn compress_fast(bytes: &[u8], table: &mut FastHashTable, out: &mut Vec<u8>) {
    let len = bytes.len();
    let mut anchor = 0;

    if len > MF_LIMIT {
        let limit = len - LAST_LITERALS;
        let match_limit = len - MF_LIMIT;
        table.reset(len);

        let mut off = 0;
        'main: while off < match_limit {
            let mut match_ref = loop {
                if off >= match_limit {
                    break 'main;
                }
                if let Some(r) = table.get_and_set(bytes, off) {
                    break r;
                }
                off += 1;
            };

            let mut match_len =
                MIN_MATCH + common_bytes(bytes, match_ref + MIN_MATCH, off + MIN_MATCH, limit);
            extend_backwards(bytes, anchor, &mut match_ref, &mut off, &mut match_len);

            encode_sequence(bytes, anchor, match_ref, off, match_len, out);
            off += match_len;
            anchor = off;
        }
    }

    encode_last_literals(bytes, anchor, out);
}

/// The FAST profile compressor.
#[derive(Debug, Default)]
pub struct Lz4FastCompressor {
    table: FastHashTable,
}

impl Lz4FastCompressor {
    /// Create a compressor with an empty hash table.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Compressor for Lz4FastCompressor {
    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) {
        compress_fast(input, &mut self.table, out);
    }
}

/// Receives decoded sequences.
trait SequenceSink {
    /// Bytes produced so far.
    fn produced(&self) -> usize;

    fn literals(&mut self, input: &mut IndexInput, len: usize) -> Result<()>;

    fn copy_match(&mut self, distance: usize, len: usize);
}

/// Materializes the output.
struct Materialize<'a>(&'a mut Vec<u8>);

impl SequenceSink for Materialize<'_> {
    fn produced(&self) -> usize {
        self.0.len()
    }

    fn literals(&mut self, input: &mut IndexInput, len: usize) -> Result<()> {
        self.0.extend_from_slice(input.read_slice(len)?);
        Ok(())
    }

    fn copy_match(&mut self, distance: usize, len: usize) {
        let start = self.0.len() - distance;
        if distance >= len {
            self.0.extend_from_within(start..start + len);
        } else {
            // overlapping copy repeats the last `distance` bytes
            for i in 0..len {
                let byte = self.0[start + i];
                self.0.push(byte);
            }
        }
    }
}

/// Only counts the output.
struct Count(usize);

impl SequenceSink for Count {
    fn produced(&self) -> usize {
        self.0
    }

    fn literals(&mut self, input: &mut IndexInput, len: usize) -> Result<()> {
        input.skip_bytes(len)?;
        self.0 += len;
        Ok(())
    }

    fn copy_match(&mut self, _distance: usize, len: usize) {
        self.0 += len;
    }
}

fn read_len(input: &mut IndexInput) -> Result<usize> {
    let mut len = 0usize;
    loop {
        let byte = input.read_byte()?;
        len += usize::from(byte);
        if byte != 0xFF {
            return Ok(len);
        }
    }
}

/// Decode sequences until at least `stop_at` bytes were produced. Never
/// produces more than `original_len` bytes.
fn decode<S: SequenceSink>(
    input: &mut IndexInput,
    original_len: usize,
    stop_at: usize,
    sink: &mut S,
) -> Result<()> {
    loop {
        let token = input.read_byte()?;

        let mut literal_len = usize::from(token >> 4);
        if literal_len == RUN_MASK {
            literal_len += read_len(input)?;
        }
        if sink.produced() + literal_len > original_len {
            return Err(Error::corruption(format!(
                "literal run of {} bytes at {} overflows block of {} bytes",
                literal_len,
                sink.produced(),
                original_len
            )));
        }
        sink.literals(input, literal_len)?;
        if sink.produced() >= stop_at {
            return Ok(());
        }

        let distance = usize::from(input.read_byte()?) | usize::from(input.read_byte()?) << 8;
        if distance == 0 || distance > sink.produced() {
            return Err(Error::corruption(format!(
                "match distance {} invalid after {} bytes",
                distance,
                sink.produced()
            )));
        }

        let mut match_len = usize::from(token) & RUN_MASK;
        if match_len == RUN_MASK {
            match_len += read_len(input)?;
        }
        match_len += MIN_MATCH;
        if sink.produced() + match_len > original_len {
            return Err(Error::corruption(format!(
                "match of {} bytes at {} overflows block of {} bytes",
                match_len,
                sink.produced(),
                original_len
            )));
        }
        sink.copy_match(distance, match_len);
        if sink.produced() >= stop_at {
            return Ok(());
        }
    }
}

/// Decode a block into `dest` (cleared first), stopping once at least
/// `stop_at` bytes are available. Returns the number of bytes produced.
pub fn decompress_into(
    input: &mut IndexInput,
    original_len: usize,
    stop_at: usize,
    dest: &mut Vec<u8>,
) -> Result<usize> {
    dest.clear();
    dest.reserve(stop_at);
    decode(input, original_len, stop_at, &mut Materialize(dest))?;
    Ok(dest.len())
}

/// Advance `input` past a whole block without materializing it.
pub fn skip_block(input: &mut IndexInput, original_len: usize) -> Result<()> {
    let mut count = Count(0);
    decode(input, original_len, original_len, &mut count)?;
    if count.0 != original_len {
        return Err(Error::corruption(format!(
            "block decodes to {} bytes, expected {}",
            count.0, original_len
        )));
    }
    Ok(())
}

/// Decompressor shared by every LZ4 profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Decompressor;

impl Decompressor for Lz4Decompressor {
    fn decompress(
        &mut self,
        input: &mut IndexInput,
        original_len: usize,
        offset: usize,
        len: usize,
        out: &mut Vec<u8>,
    ) -> Result<Range<usize>> {
        let end = offset.checked_add(len).filter(|&end| end <= original_len).ok_or_else(|| {
            Error::invalid_argument(format!(
                "range [{}, +{}) outside block of {} bytes",
                offset, len, original_len
            ))
        })?;

        let produced = decompress_into(input, original_len, end, out)?;
        if end == original_len && produced != original_len {
            return Err(Error::corruption(format!(
                "block decodes to {} bytes, expected {}",
                produced, original_len
            )));
        }
        Ok(offset..end)
    }

    fn skip(&mut self, input: &mut IndexInput, original_len: usize) -> Result<()> {
        skip_block(input, original_len)
    }

    fn clone_box(&self) -> Box<dyn Decompressor> {
        Box::new(*self)
    }
}
