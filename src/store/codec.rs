//! Codec headers and checksum footers.
//!
//! Every file starts with a header naming the codec and its version, and
//! ends with a fixed-size footer holding a CRC32 of everything before the
//! checksum field.
//!
//! ## Header
//!
//! ```text
//! [magic: u32 LE]
//! [codec name length: varint][codec name: UTF-8]
//! [version: u32 LE]
//! ```
//!
//! ## Footer (16 bytes)
//!
//! ```text
//! [footer magic: u32 LE]
//! [algorithm id: u32 LE]   // 0 = CRC32
//! [checksum: u64 LE]       // high 32 bits must be zero
//! ```

use crate::error::{Error, Result};
use crate::store::{IndexInput, IndexOutput};
use crate::varint;

/// Magic number at the start of every file.
pub const CODEC_MAGIC: u32 = 0x3fd7_6c17;

/// Magic number at the start of every footer.
pub const FOOTER_MAGIC: u32 = !CODEC_MAGIC;

/// Footer size in bytes (fixed).
pub const FOOTER_SIZE: usize = 16;

/// Algorithm id of CRC32 checksums.
pub const CHECKSUM_CRC32: u32 = 0;

const SCAN_BUFFER_SIZE: usize = 8 * 1024;

/// Write a codec header.
pub fn write_header(out: &mut IndexOutput, codec: &str, version: u32) -> Result<()> {
    out.write_u32_le(CODEC_MAGIC)?;
    out.write_vint(codec.len() as u32)?;
    out.write_bytes(codec.as_bytes())?;
    out.write_u32_le(version)?;
    Ok(())
}

/// Length of the header written for `codec`.
pub fn header_len(codec: &str) -> usize {
    4 + varint::encoded_len(codec.len() as u64) + codec.len() + 4
}

/// Read and validate a codec header, returning the version.
///
/// Versions outside `min_version..=max_version` are reported as unsupported.
pub fn check_header(
    input: &mut IndexInput,
    codec: &str,
    min_version: u32,
    max_version: u32,
) -> Result<u32> {
    let magic = input.read_u32_le()?;
    if magic != CODEC_MAGIC {
        return Err(Error::corruption(format!(
            "{}: invalid header magic: expected {:#x}, got {:#x}",
            input.name(),
            CODEC_MAGIC,
            magic
        )));
    }

    let name_len = input.read_vint()? as usize;
    let name = input.read_slice(name_len)?.to_vec();
    if name != codec.as_bytes() {
        return Err(Error::corruption(format!(
            "{}: codec mismatch: expected {:?}, got {:?}",
            input.name(),
            codec,
            String::from_utf8_lossy(&name)
        )));
    }

    let version = input.read_u32_le()?;
    if version < min_version || version > max_version {
        return Err(Error::unsupported(format!(
            "{}: format version {} not in supported range {}..={}",
            input.name(),
            version,
            min_version,
            max_version
        )));
    }
    Ok(version)
}

/// Footer is the last 16 bytes of every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// CRC32 of every byte before the checksum field
    pub checksum: u32,
}

impl Footer {
    /// Decode a footer from bytes, validating its structure.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != FOOTER_SIZE {
            return Err(Error::corruption(format!(
                "Footer size mismatch: expected {}, got {}",
                FOOTER_SIZE,
                data.len()
            )));
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != FOOTER_MAGIC {
            return Err(Error::corruption(format!(
                "Invalid footer magic: expected {:#x}, got {:#x}",
                FOOTER_MAGIC, magic
            )));
        }

        let algorithm = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if algorithm != CHECKSUM_CRC32 {
            return Err(Error::corruption(format!("Unknown checksum algorithm: {}", algorithm)));
        }

        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data[8..16]);
        let checksum = u64::from_le_bytes(raw);
        if checksum >> 32 != 0 {
            return Err(Error::corruption(format!("Illegal checksum value: {:#x}", checksum)));
        }

        Ok(Self { checksum: checksum as u32 })
    }

    /// Write the footer for everything written to `out` so far.
    pub fn write_to(out: &mut IndexOutput) -> Result<Self> {
        out.write_u32_le(FOOTER_MAGIC)?;
        out.write_u32_le(CHECKSUM_CRC32)?;
        let checksum = out.checksum();
        out.write_u64_le(u64::from(checksum))?;
        Ok(Self { checksum })
    }

    /// Read the footer of `input` without verifying the checksum value.
    ///
    /// Fails if the file is too short to hold a footer or the footer is
    /// structurally invalid. The cursor position is left unchanged.
    pub fn retrieve(input: &IndexInput) -> Result<Self> {
        let len = input.len() as usize;
        if len < FOOTER_SIZE {
            return Err(Error::corruption(format!(
                "{}: file too short ({} bytes) to contain a footer",
                input.name(),
                len
            )));
        }
        Self::decode(&input.bytes()[len - FOOTER_SIZE..])
    }
}

/// Scan the whole file sequentially and verify the footer checksum.
pub fn check_footer(input: &IndexInput) -> Result<u32> {
    let footer = Footer::retrieve(input)?;
    let covered = input.len() as usize - 8;

    let mut hasher = crc32fast::Hasher::new();
    for block in input.bytes()[..covered].chunks(SCAN_BUFFER_SIZE) {
        hasher.update(block);
    }
    let actual = hasher.finalize();

    if actual != footer.checksum {
        return Err(Error::ChecksumMismatch { expected: footer.checksum, actual });
    }
    Ok(actual)
}
