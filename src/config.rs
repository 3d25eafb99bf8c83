//! Configuration options for the document store.

use crate::error::{Error, Result};

/// Largest accepted chunk size (1 GiB).
pub const MAX_CHUNK_SIZE: usize = 1 << 30;

/// Configuration options for writing a stored-fields segment.
///
/// Readers need no options: everything they depend on is recorded in the
/// data file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Compression profile used for chunk payloads.
    /// Default: CompressionMode::Fast
    pub compression: CompressionMode,

    /// Target number of uncompressed bytes per chunk. A chunk is flushed as
    /// soon as its buffered documents reach this size, and chunks of at least
    /// twice this size are compressed in independent blocks of this size.
    /// Default: 16KB
    pub chunk_size: usize,

    /// Maximum number of documents per chunk.
    /// Default: 128
    pub max_docs_per_chunk: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::fast()
    }
}

/// Compression profiles understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionMode {
    /// Greedy single-pass LZ4 matching (fast, moderate ratio).
    Fast = 0,

    /// Hash-chain LZ4 matching (slower, never larger than `Fast`).
    High = 1,
}

impl CompressionMode {
    /// Convert from the id recorded in a file header.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionMode::Fast),
            1 => Ok(CompressionMode::High),
            _ => Err(Error::unsupported(format!("unknown compression mode id {}", value))),
        }
    }

    /// The id recorded in a file header.
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl Default for CompressionMode {
    fn default() -> Self {
        CompressionMode::Fast
    }
}

impl StoreOptions {
    /// Creates a new StoreOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small chunks and greedy matching, tuned for fast random access.
    pub fn fast() -> Self {
        Self { compression: CompressionMode::Fast, chunk_size: 16 * 1024, max_docs_per_chunk: 128 }
    }

    /// Larger chunks and deeper match search, tuned for ratio.
    pub fn high_compression() -> Self {
        Self { compression: CompressionMode::High, chunk_size: 60 * 1024, max_docs_per_chunk: 512 }
    }

    /// Sets the compression profile.
    pub fn compression(mut self, compression: CompressionMode) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the chunk size in bytes.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the maximum number of documents per chunk.
    pub fn max_docs_per_chunk(mut self, docs: usize) -> Self {
        self.max_docs_per_chunk = docs;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::invalid_argument(format!(
                "chunk_size must be in 1..={}, got {}",
                MAX_CHUNK_SIZE, self.chunk_size
            )));
        }
        if self.max_docs_per_chunk == 0 {
            return Err(Error::invalid_argument("max_docs_per_chunk must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = StoreOptions::default();
        assert_eq!(opts.compression, CompressionMode::Fast);
        assert_eq!(opts.chunk_size, 16 * 1024);
        assert_eq!(opts.max_docs_per_chunk, 128);
    }

    #[test]
    fn test_options_builder() {
        let opts = StoreOptions::new()
            .compression(CompressionMode::High)
            .chunk_size(1024)
            .max_docs_per_chunk(4);

        assert_eq!(opts.compression, CompressionMode::High);
        assert_eq!(opts.chunk_size, 1024);
        assert_eq!(opts.max_docs_per_chunk, 4);
    }

    #[test]
    fn test_options_validation() {
        let mut opts = StoreOptions::default();
        assert!(opts.validate().is_ok());
        assert!(StoreOptions::high_compression().validate().is_ok());

        opts.chunk_size = 0;
        assert!(opts.validate().is_err());

        opts.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(opts.validate().is_err());

        opts.chunk_size = 1024;
        opts.max_docs_per_chunk = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_compression_mode_ids() {
        assert_eq!(CompressionMode::from_u8(0).unwrap(), CompressionMode::Fast);
        assert_eq!(CompressionMode::from_u8(1).unwrap(), CompressionMode::High);
        assert_eq!(CompressionMode::High.id(), 1);
        assert!(matches!(CompressionMode::from_u8(7), Err(Error::Unsupported(_))));
    }
}
