//! Random-access input over immutable file bytes.

use crate::error::{Error, Result};
use crate::varint;
use bytes::Bytes;

/// A seekable read cursor over the contents of one file.
///
/// The bytes are shared and immutable, so cloning an input is cheap and the
/// clone owns an independent cursor. This is what lets every reader clone
/// keep private position state over the same storage.
#[derive(Debug, Clone)]
pub struct IndexInput {
    name: String,
    data: Bytes,
    pos: usize,
}

impl IndexInput {
    /// Create an input named `name` positioned at the start of `data`.
    pub fn new(name: impl Into<String>, data: Bytes) -> Self {
        Self { name: name.into(), data, pos: 0 }
    }

    /// Name of the underlying file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total length of the file.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Check if the file is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current read position.
    pub fn file_pointer(&self) -> u64 {
        self.pos as u64
    }

    /// Number of bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The whole file.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Move the cursor to `pos`. Seeking to the end is allowed.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len() {
            return Err(Error::corruption(format!(
                "seek to {} past end of {} ({} bytes)",
                pos,
                self.name,
                self.len()
            )));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn eof(&self, wanted: usize) -> Error {
        Error::corruption(format!(
            "read past EOF in {}: wanted {} bytes at {}, length {}",
            self.name,
            wanted,
            self.pos,
            self.data.len()
        ))
    }

    /// Read one byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.eof(1))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_slice(&mut self, len: usize) -> Result<&[u8]> {
        if len > self.remaining() {
            return Err(self.eof(len));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..start + len])
    }

    /// Fill `dst` from the input.
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        let src = self.read_slice(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Zero-copy view of the next `len` bytes.
    pub fn read_shared(&mut self, len: usize) -> Result<Bytes> {
        if len > self.remaining() {
            return Err(self.eof(len));
        }
        let start = self.pos;
        self.pos += len;
        Ok(self.data.slice(start..start + len))
    }

    /// Advance the cursor by `len` bytes.
    pub fn skip_bytes(&mut self, len: usize) -> Result<()> {
        self.read_slice(len).map(|_| ())
    }

    /// Read a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a little-endian `u64`.
    pub fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a `u32` varint.
    pub fn read_vint(&mut self) -> Result<u32> {
        varint::decode_with(32, || self.read_byte()).map(|v| v as u32)
    }

    /// Read a `u64` varint.
    pub fn read_vlong(&mut self) -> Result<u64> {
        varint::decode_with(64, || self.read_byte())
    }

    /// An independent input over `[offset, offset + len)` of this file.
    pub fn slice(&self, offset: u64, len: u64) -> Result<IndexInput> {
        let end = offset.checked_add(len).filter(|&end| end <= self.len()).ok_or_else(|| {
            Error::corruption(format!(
                "slice [{}, +{}) out of bounds of {} ({} bytes)",
                offset,
                len,
                self.name,
                self.len()
            ))
        })?;
        Ok(IndexInput::new(
            format!("{} [slice]", self.name),
            self.data.slice(offset as usize..end as usize),
        ))
    }
}
