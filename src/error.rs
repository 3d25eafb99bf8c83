//! Error types for the document store.

use std::io;
use thiserror::Error as ThisError;

/// The result type used throughout the document store.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for document store operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// An I/O error occurred in the underlying storage.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A structural invariant of the stored data was violated.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A checksum mismatch was detected.
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// The checksum recorded in the file.
        expected: u32,
        /// The checksum computed over the file contents.
        actual: u32,
    },

    /// The reader or writer was used after it was closed or aborted.
    #[error("Already closed: {0}")]
    AlreadyClosed(String),

    /// A format version or compression profile this build does not understand.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not valid in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new already-closed error.
    pub fn already_closed(msg: impl Into<String>) -> Self {
        Error::AlreadyClosed(msg.into())
    }

    /// Creates a new unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a new invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Returns true for every error that signals corrupt stored data,
    /// including checksum mismatches.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_) | Error::ChecksumMismatch { .. })
    }
}
