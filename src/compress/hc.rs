//! High-ratio LZ4 matching.
//!
//! Every position is inserted into a hash chain covering the 64 KiB window.
//! At each position the chain is walked for the longest match, and the
//! match is deferred by one byte when the next position offers a longer one.
//! The resulting block is compared with the greedy encoding and the smaller
//! of the two is kept, so this profile never loses to `Fast`.

use crate::compress::lz4::{
    common_bytes, compress_fast, encode_last_literals, encode_sequence, extend_backwards, hash,
    read_u32, FastHashTable, LAST_LITERALS, MAX_DISTANCE, MF_LIMIT, MIN_MATCH,
};
use crate::compress::Compressor;

const HASH_LOG: u32 = 15;
const CHAIN_SIZE: usize = 1 << 16;
const CHAIN_MASK: usize = CHAIN_SIZE - 1;
const MAX_ATTEMPTS: usize = 256;

/// Hash heads plus a chain of deltas to the previous position sharing the
/// same hash.
#[derive(Debug, Clone)]
pub struct HighCompressionHashTable {
    heads: Vec<i32>,
    chain: Vec<u16>,
    next_to_update: usize,
}

impl Default for HighCompressionHashTable {
    fn default() -> Self {
        Self { heads: vec![-1; 1 << HASH_LOG], chain: vec![0; CHAIN_SIZE], next_to_update: 0 }
    }
}

impl HighCompressionHashTable {
    fn reset(&mut self) {
        self.heads.fill(-1);
        self.chain.fill(0);
        self.next_to_update = 0;
    }

    fn insert_until(&mut self, bytes: &[u8], off: usize) {
        for pos in self.next_to_update..off {
            let slot = hash(read_u32(bytes, pos), HASH_LOG);
            let head = self.heads[slot];
            let delta = if head < 0 || pos - head as usize > MAX_DISTANCE {
                0
            } else {
                pos - head as usize
            };
            self.chain[pos & CHAIN_MASK] = delta as u16;
            self.heads[slot] = pos as i32;
        }
        self.next_to_update = self.next_to_update.max(off);
    }

    /// Longest match for `off` among earlier positions, as `(ref, len)`.
    fn find_best(&mut self, bytes: &[u8], off: usize, limit: usize) -> Option<(usize, usize)> {
        self.insert_until(bytes, off);

        let sequence = read_u32(bytes, off);
        let min_ref = off.saturating_sub(MAX_DISTANCE);
        let head = self.heads[hash(sequence, HASH_LOG)];
        if head < 0 {
            return None;
        }

        let mut best: Option<(usize, usize)> = None;
        let mut candidate = head as usize;
        for _ in 0..MAX_ATTEMPTS {
            if candidate < min_ref || candidate >= off {
                break;
            }
            if read_u32(bytes, candidate) == sequence {
                let len =
                    MIN_MATCH + common_bytes(bytes, candidate + MIN_MATCH, off + MIN_MATCH, limit);
                if best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((candidate, len));
                }
            }
            let delta = usize::from(self.chain[candidate & CHAIN_MASK]);
            if delta == 0 || delta > candidate {
                break;
            }
            candidate -= delta;
        }
        best
    }
}

pub(crate) fn compress_high(bytes: &[u8], table: &mut HighCompressionHashTable, out: &mut Vec<u8>) {
    let len = bytes.len();
    let mut anchor = 0;

    if len > MF_LIMIT {
        let limit = len - LAST_LITERALS;
        let match_limit = len - MF_LIMIT;
        table.reset();

        let mut off = 0;
        while off < match_limit {
            let Some((mut match_ref, mut match_len)) = table.find_best(bytes, off, limit) else {
                off += 1;
                continue;
            };

            // lazy evaluation: prefer a longer match starting one byte later
            while off + 1 < match_limit {
                match table.find_best(bytes, off + 1, limit) {
                    Some((next_ref, next_len)) if next_len > match_len => {
                        off += 1;
                        match_ref = next_ref;
                        match_len = next_len;
                    }
                    _ => break,
                }
            }

            extend_backwards(bytes, anchor, &mut match_ref, &mut off, &mut match_len);
            encode_sequence(bytes, anchor, match_ref, off, match_len, out);
            off += match_len;
            anchor = off;
        }
    }

    encode_last_literals(bytes, anchor, out);
}

/// The HIGH profile compressor.
#[derive(Debug, Default)]
pub struct Lz4HighCompressor {
    table: HighCompressionHashTable,
    fast_table: FastHashTable,
    scratch: Vec<u8>,
}

impl Lz4HighCompressor {
    /// Create a compressor with empty tables.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Compressor for Lz4HighCompressor {
    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) {
        let start = out.len();
        compress_high(input, &mut self.table, out);

        self.scratch.clear();
        compress_fast(input, &mut self.fast_table, &mut self.scratch);
        if self.scratch.len() < out.len() - start {
            out.truncate(start);
            out.extend_from_slice(&self.scratch);
        }
    }
}
