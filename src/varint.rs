//! Variable-length integer encoding.
//!
//! Uses VByte encoding (7 bits per byte with continuation bit), little-endian
//! group order. A `u32` takes at most 5 bytes and a `u64` at most 10.

use crate::error::{Error, Result};
use bytes::BufMut;

/// Maximum encoded length of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` into `out`, returning the number of bytes used.
pub fn encode(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        out[i] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        i += 1;
    }
    out[i] = value as u8;
    i + 1
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Append a `u32` varint to `buf`.
pub fn put_vint<B: BufMut>(buf: &mut B, value: u32) {
    put_vlong(buf, u64::from(value));
}

/// Append a `u64` varint to `buf`.
pub fn put_vlong<B: BufMut>(buf: &mut B, value: u64) {
    let mut tmp = [0u8; MAX_VARINT_LEN];
    let n = encode(value, &mut tmp);
    buf.put_slice(&tmp[..n]);
}

/// Decode a varint of at most `bits` significant bits, pulling bytes from
/// `next`. Over-long or overflowing encodings are reported as corruption.
pub fn decode_with<F>(bits: u32, mut next: F) -> Result<u64>
where
    F: FnMut() -> Result<u8>,
{
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = next()?;
        let low = u64::from(byte & 0x7F);
        if bits - shift < 7 && (low >> (bits - shift)) != 0 {
            return Err(Error::corruption(format!("varint overflows {} bits", bits)));
        }
        value |= low << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= bits {
            return Err(Error::corruption(format!("varint longer than {} bits", bits)));
        }
    }
}

/// Decode a `u32` varint from the front of `data`, returning the value and
/// the number of bytes consumed.
pub fn decode_vint(data: &[u8]) -> Result<(u32, usize)> {
    let mut pos = 0;
    let value = decode_with(32, || {
        let byte = *data.get(pos).ok_or_else(|| Error::corruption("truncated varint"))?;
        pos += 1;
        Ok(byte)
    })?;
    Ok((value as u32, pos))
}
