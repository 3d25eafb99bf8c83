//! LZ4-style block compression.
//!
//! Two compression profiles share one block format and one decoder:
//!
//! - [`CompressionMode::Fast`]: greedy matching over a single-slot hash table
//! - [`CompressionMode::High`]: hash-chain matching with lazy evaluation
//!
//! Decompression is partial: the decoder stops as soon as the requested
//! window is available, and whole blocks can be stepped over without being
//! materialized.

pub mod hc;
pub mod lz4;

pub use crate::config::CompressionMode;
pub use hc::Lz4HighCompressor;
pub use lz4::{Lz4Decompressor, Lz4FastCompressor};

use crate::error::Result;
use crate::store::IndexInput;
use bytes::Bytes;
use std::fmt::Debug;
use std::ops::Range;

/// Compresses one block at a time, reusing internal tables across calls.
pub trait Compressor: Send + Debug {
    /// Append the compressed form of `input` to `out`.
    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>);
}

/// Decodes blocks read sequentially from an input.
pub trait Decompressor: Send + Debug {
    /// Decode the block at the cursor of `input`, whose decompressed size is
    /// `original_len`, until `offset + len` bytes are available in `out`.
    ///
    /// `out` is cleared first. The returned range locates the requested
    /// bytes inside `out`; bytes in front of it are match history only.
    fn decompress(
        &mut self,
        input: &mut IndexInput,
        original_len: usize,
        offset: usize,
        len: usize,
        out: &mut Vec<u8>,
    ) -> Result<Range<usize>>;

    /// Step over a whole block without materializing it.
    fn skip(&mut self, input: &mut IndexInput, original_len: usize) -> Result<()>;

    /// A fresh decompressor of the same kind.
    fn clone_box(&self) -> Box<dyn Decompressor>;
}

impl Clone for Box<dyn Decompressor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl CompressionMode {
    /// A new compressor for this profile.
    pub fn new_compressor(self) -> Box<dyn Compressor> {
        match self {
            CompressionMode::Fast => Box::new(Lz4FastCompressor::new()),
            CompressionMode::High => Box::new(Lz4HighCompressor::new()),
        }
    }

    /// A new decompressor for blocks written with this profile.
    pub fn new_decompressor(self) -> Box<dyn Decompressor> {
        // both profiles emit plain LZ4 blocks
        Box::new(Lz4Decompressor)
    }
}

/// Compress `input` in one call.
pub fn compress(input: &[u8], mode: CompressionMode) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() / 2 + 16);
    mode.new_compressor().compress(input, &mut out);
    out
}

/// Decompress `[offset, offset + len)` of a block whose decompressed size is
/// `original_len`.
pub fn decompress(data: &[u8], original_len: usize, offset: usize, len: usize) -> Result<Vec<u8>> {
    let mut input = IndexInput::new("block", Bytes::copy_from_slice(data));
    let mut out = Vec::new();
    let range = Lz4Decompressor.decompress(&mut input, original_len, offset, len, &mut out)?;
    if range.start > 0 {
        out.drain(..range.start);
    }
    out.truncate(len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_modes_roundtrip() {
        let data = b"mode roundtrip mode roundtrip mode roundtrip".repeat(30);
        for mode in [CompressionMode::Fast, CompressionMode::High] {
            let compressed = compress(&data, mode);
            assert!(compressed.len() < data.len());
            assert_eq!(decompress(&compressed, data.len(), 0, data.len()).unwrap(), data);
        }
    }

    #[test]
    fn test_partial_window() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress(&data, CompressionMode::Fast);
        for (offset, len) in [(0, 1), (100, 0), (1000, 500), (4095, 1), (0, 4096)] {
            let window = decompress(&compressed, data.len(), offset, len).unwrap();
            assert_eq!(window, &data[offset..offset + len]);
        }
    }

    #[test]
    fn test_decompress_bad_range() {
        let compressed = compress(b"0123456789", CompressionMode::Fast);
        assert!(matches!(decompress(&compressed, 10, 8, 3), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_boxed_decompressor_clone() {
        let data = b"boxed boxed boxed boxed boxed".to_vec();
        let compressed = compress(&data, CompressionMode::High);

        let original = CompressionMode::High.new_decompressor();
        let mut copy = original.clone();
        let mut input = IndexInput::new("block", Bytes::from(compressed));
        let mut out = Vec::new();
        let range = copy.decompress(&mut input, data.len(), 6, 5, &mut out).unwrap();
        assert_eq!(&out[range], b"boxed");
    }
}
