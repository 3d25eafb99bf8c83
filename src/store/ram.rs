//! In-memory directory.

use crate::error::{Error, Result};
use crate::store::{Directory, IndexInput, IndexOutput};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

type RamFile = Arc<RwLock<Vec<u8>>>;

/// A process-local directory, mostly useful for tests and short-lived
/// segments.
///
/// # Thread Safety
///
/// The file table is guarded by a lock and can be shared across threads
/// using `Arc<RamDirectory>`.
#[derive(Debug, Default)]
pub struct RamDirectory {
    files: RwLock<HashMap<String, RamFile>>,
}

impl RamDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bytes held by all files.
    pub fn size_in_bytes(&self) -> usize {
        self.files.read().values().map(|f| f.read().len()).sum()
    }
}

struct RamSink {
    file: RamFile,
}

impl Write for RamSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Directory for RamDirectory {
    fn create_output(&self, name: &str) -> Result<IndexOutput> {
        let mut files = self.files.write();
        if files.contains_key(name) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file {} already exists", name),
            )));
        }
        let file = RamFile::default();
        files.insert(name.to_string(), Arc::clone(&file));
        Ok(IndexOutput::new(name, Box::new(RamSink { file })))
    }

    fn open_input(&self, name: &str) -> Result<IndexInput> {
        let files = self.files.read();
        let file = files.get(name).ok_or_else(|| Error::not_found(format!("file {}", name)))?;
        let data = Bytes::copy_from_slice(&file.read());
        Ok(IndexInput::new(name, data))
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("file {}", name)))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn list_all(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
