//! Random-access byte storage.
//!
//! Readers and writers never touch the physical medium directly; they go
//! through a [`Directory`] that hands out append-only [`IndexOutput`]s and
//! seekable [`IndexInput`]s. Files are write-once: after an output is closed
//! its bytes are immutable and may be shared by any number of inputs.

pub mod codec;
pub mod fs;
pub mod input;
pub mod output;
pub mod ram;

pub use codec::{check_footer, check_header, write_header, Footer, FOOTER_SIZE};
pub use fs::FsDirectory;
pub use input::IndexInput;
pub use output::IndexOutput;
pub use ram::RamDirectory;

use crate::error::Result;
use std::fmt::Debug;

/// A flat namespace of write-once files.
pub trait Directory: Send + Sync + Debug {
    /// Create a new file. Fails if the file already exists.
    fn create_output(&self, name: &str) -> Result<IndexOutput>;

    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<IndexInput>;

    /// Delete a file.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Names of all files, sorted.
    fn list_all(&self) -> Result<Vec<String>>;
}
