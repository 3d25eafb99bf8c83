//! File-system backed directory.

use crate::error::{Error, Result};
use crate::store::{Directory, IndexInput, IndexOutput};
use bytes::Bytes;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

/// A directory of segment files on the local file system.
///
/// Inputs are read fully into shared immutable memory when opened, so any
/// number of reader clones can address them without further I/O.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    path: PathBuf,
}

impl FsDirectory {
    /// Open the directory at `path`, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fs::create_dir_all(&path)?;
        }
        Ok(Self { path })
    }

    /// Root path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

fn map_not_found(err: io::Error, name: &str) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::not_found(format!("file {}", name))
    } else {
        Error::Io(err)
    }
}

impl Directory for FsDirectory {
    fn create_output(&self, name: &str) -> Result<IndexOutput> {
        let file = OpenOptions::new().write(true).create_new(true).open(self.file_path(name))?;
        Ok(IndexOutput::new(name, Box::new(BufWriter::new(file))))
    }

    fn open_input(&self, name: &str) -> Result<IndexInput> {
        let data = fs::read(self.file_path(name)).map_err(|e| map_not_found(e, name))?;
        Ok(IndexInput::new(name, Bytes::from(data)))
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        fs::remove_file(self.file_path(name)).map_err(|e| map_not_found(e, name))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).is_file()
    }

    fn list_all(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FsDirectory::open(temp_dir.path()).unwrap();

        let mut out = dir.create_output("a.bin").unwrap();
        out.write_bytes(b"payload").unwrap();
        out.close().unwrap();

        let mut input = dir.open_input("a.bin").unwrap();
        assert_eq!(input.len(), 7);
        assert_eq!(input.read_slice(7).unwrap(), b"payload");
        assert_eq!(dir.list_all().unwrap(), vec!["a.bin".to_string()]);
    }

    #[test]
    fn test_create_existing_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FsDirectory::open(temp_dir.path()).unwrap();
        dir.create_output("a.bin").unwrap().close().unwrap();
        assert!(dir.create_output("a.bin").is_err());
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FsDirectory::open(temp_dir.path().join("nested")).unwrap();
        assert!(dir.path().exists());
        assert!(matches!(dir.open_input("nope"), Err(Error::NotFound(_))));
        assert!(matches!(dir.delete_file("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FsDirectory::open(temp_dir.path()).unwrap();
        dir.create_output("a.bin").unwrap().close().unwrap();
        assert!(dir.file_exists("a.bin"));
        dir.delete_file("a.bin").unwrap();
        assert!(!dir.file_exists("a.bin"));
    }
}
