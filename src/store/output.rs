//! Append-only checksummed output.

use crate::error::Result;
use crate::store::IndexInput;
use crate::varint;
use crc32fast::Hasher;
use std::fmt;
use std::io::Write;

/// Append-only output for one file.
///
/// Every byte written is fed into a running CRC32 so the footer can be
/// produced without re-reading the file.
pub struct IndexOutput {
    name: String,
    sink: Box<dyn Write + Send>,
    hasher: Hasher,
    written: u64,
}

impl fmt::Debug for IndexOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexOutput")
            .field("name", &self.name)
            .field("written", &self.written)
            .finish()
    }
}

impl IndexOutput {
    /// Wrap `sink` as the output for file `name`.
    pub fn new(name: impl Into<String>, sink: Box<dyn Write + Send>) -> Self {
        Self { name: name.into(), sink, hasher: Hasher::new(), written: 0 }
    }

    /// Name of the file being written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bytes written so far.
    pub fn file_pointer(&self) -> u64 {
        self.written
    }

    /// CRC32 of everything written so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.sink.write_all(data)?;
        self.hasher.update(data);
        self.written += data.len() as u64;
        Ok(())
    }

    /// Write one byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    /// Write a little-endian `u32`.
    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a little-endian `u64`.
    pub fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a `u32` varint.
    pub fn write_vint(&mut self, value: u32) -> Result<()> {
        self.write_vlong(u64::from(value))
    }

    /// Write a `u64` varint.
    pub fn write_vlong(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; varint::MAX_VARINT_LEN];
        let n = varint::encode(value, &mut buf);
        self.write_bytes(&buf[..n])
    }

    /// Copy `len` bytes from the current position of `input`.
    pub fn copy_bytes(&mut self, input: &mut IndexInput, len: usize) -> Result<()> {
        let data = input.read_slice(len)?;
        self.write_bytes(data)
    }

    /// Flush buffered bytes to the underlying storage.
    pub fn close(mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_checksum_tracks_writes() {
        let mut out = IndexOutput::new("test", Box::new(std::io::sink()));
        out.write_bytes(b"hello").unwrap();
        out.write_u32_le(7).unwrap();
        out.write_vint(300).unwrap();

        let mut expected = b"hello".to_vec();
        expected.extend_from_slice(&7u32.to_le_bytes());
        expected.extend_from_slice(&[0xAC, 0x02]);

        assert_eq!(out.file_pointer(), expected.len() as u64);
        assert_eq!(out.checksum(), crc32fast::hash(&expected));
    }

    #[test]
    fn test_copy_bytes() {
        let mut input = IndexInput::new("src", Bytes::from_static(b"0123456789"));
        input.seek(2).unwrap();

        let mut out = IndexOutput::new("dst", Box::new(std::io::sink()));
        out.copy_bytes(&mut input, 5).unwrap();
        assert_eq!(out.file_pointer(), 5);
        assert_eq!(out.checksum(), crc32fast::hash(b"23456"));
        assert_eq!(input.file_pointer(), 7);
    }
}
