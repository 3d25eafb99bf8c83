//! Fixed-width bit-packed integer arrays.
//!
//! Values are written MSB-first, each taking exactly `bits` bits, into
//! `ceil(count * bits / 8)` bytes with no header. A width of zero means every
//! value is the same and nothing is stored per value.
//!
//! Chunk metadata uses a small framing on top of this ([`save_ints`] /
//! [`read_ints`]):
//!
//! ```text
//! count == 1      [value: varint]
//! all equal       [0: varint][value: varint]
//! otherwise       [bits: varint][packed values]
//! ```

use crate::error::{Error, Result};
use crate::store::IndexInput;
use crate::varint::put_vint;
use bytes::{BufMut, Bytes};

/// Widest per-document metadata value.
pub const MAX_METADATA_BITS: u32 = 32;

/// Number of bits needed to represent `max` (0 for 0).
#[inline]
pub fn bits_required(max: u64) -> u32 {
    64 - max.leading_zeros()
}

/// Bytes used by `count` values of `bits` bits.
#[inline]
pub fn packed_len(count: usize, bits: u32) -> usize {
    ((count as u64 * u64::from(bits)).div_ceil(8)) as usize
}

/// Streams values of a fixed width into a buffer, MSB-first.
pub struct PackedWriter<'a, B: BufMut> {
    out: &'a mut B,
    bits: u32,
    current: u8,
    used: u32,
}

impl<'a, B: BufMut> PackedWriter<'a, B> {
    /// A writer of `bits`-wide values (`bits <= 64`).
    pub fn new(out: &'a mut B, bits: u32) -> Self {
        debug_assert!(bits <= 64);
        Self { out, bits, current: 0, used: 0 }
    }

    /// Append one value. Bits above the width are ignored.
    pub fn add(&mut self, value: u64) {
        debug_assert!(self.bits == 64 || value >> self.bits == 0);
        let mut remaining = self.bits;
        while remaining > 0 {
            let space = 8 - self.used;
            let take = space.min(remaining);
            let chunk = (value >> (remaining - take)) as u8 & low_mask(take);
            self.current |= chunk << (space - take);
            self.used += take;
            remaining -= take;
            if self.used == 8 {
                self.out.put_u8(self.current);
                self.current = 0;
                self.used = 0;
            }
        }
    }

    /// Flush the trailing partial byte.
    pub fn finish(self) {
        if self.used > 0 {
            self.out.put_u8(self.current);
        }
    }
}

#[inline]
fn low_mask(bits: u32) -> u8 {
    ((1u16 << bits) - 1) as u8
}

/// Read `bits` bits starting at bit position `bit`.
#[inline]
fn read_bits(data: &[u8], mut bit: u64, bits: u32) -> u64 {
    let mut value = 0u64;
    let mut remaining = bits;
    while remaining > 0 {
        let byte = data[(bit >> 3) as usize];
        let avail = 8 - (bit & 7) as u32;
        let take = avail.min(remaining);
        let chunk = (byte >> (avail - take)) & low_mask(take);
        value = (value << take) | u64::from(chunk);
        remaining -= take;
        bit += u64::from(take);
    }
    value
}

/// An immutable packed array with random access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedInts {
    /// Width zero: `count` copies of `value`.
    Uniform {
        /// The shared value
        value: u64,
        /// Number of values
        count: usize,
    },
    /// `count` values of `bits` bits each.
    Packed {
        /// Width of every value (1..=64)
        bits: u32,
        /// Number of values
        count: usize,
        /// Packed bytes, at least `packed_len(count, bits)` long
        data: Bytes,
    },
}

impl PackedInts {
    /// Wrap packed bytes, checking that they hold `count` values.
    pub fn from_packed(bits: u32, count: usize, data: Bytes) -> Result<Self> {
        if bits == 0 || bits > 64 {
            return Err(Error::corruption(format!("invalid packed width {}", bits)));
        }
        let needed = packed_len(count, bits);
        if data.len() < needed {
            return Err(Error::corruption(format!(
                "packed array of {} x {} bits needs {} bytes, got {}",
                count,
                bits,
                needed,
                data.len()
            )));
        }
        Ok(PackedInts::Packed { bits, count, data })
    }

    /// Pack `values` at the smallest width that holds them.
    pub fn pack(values: &[u64]) -> Self {
        let max = values.iter().copied().max().unwrap_or(0);
        let first = values.first().copied().unwrap_or(0);
        if values.iter().all(|&v| v == first) {
            return PackedInts::Uniform { value: first, count: values.len() };
        }
        let bits = bits_required(max);
        let mut buf = Vec::with_capacity(packed_len(values.len(), bits));
        let mut writer = PackedWriter::new(&mut buf, bits);
        for &v in values {
            writer.add(v);
        }
        writer.finish();
        PackedInts::Packed { bits, count: values.len(), data: Bytes::from(buf) }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            PackedInts::Uniform { count, .. } | PackedInts::Packed { count, .. } => *count,
        }
    }

    /// Check if the array holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of each value in bits.
    pub fn bits(&self) -> u32 {
        match self {
            PackedInts::Uniform { .. } => 0,
            PackedInts::Packed { bits, .. } => *bits,
        }
    }

    /// Value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> u64 {
        assert!(index < self.len(), "index {} out of bounds ({})", index, self.len());
        match self {
            PackedInts::Uniform { value, .. } => *value,
            PackedInts::Packed { bits, data, .. } => {
                read_bits(data, index as u64 * u64::from(*bits), *bits)
            }
        }
    }

    /// Sequential iterator over all values.
    pub fn iter(&self) -> PackedIter<'_> {
        PackedIter { ints: self, index: 0, bit: 0 }
    }
}

/// Sequential reader over a [`PackedInts`], carrying its bit cursor.
#[derive(Debug, Clone)]
pub struct PackedIter<'a> {
    ints: &'a PackedInts,
    index: usize,
    bit: u64,
}

impl Iterator for PackedIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.index >= self.ints.len() {
            return None;
        }
        self.index += 1;
        match self.ints {
            PackedInts::Uniform { value, .. } => Some(*value),
            PackedInts::Packed { bits, data, .. } => {
                let value = read_bits(data, self.bit, *bits);
                self.bit += u64::from(*bits);
                Some(value)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.ints.len() - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for PackedIter<'_> {}

/// Write per-document metadata values.
pub fn save_ints<B: BufMut>(values: &[u32], out: &mut B) {
    match values {
        [] => {}
        [single] => put_vint(out, *single),
        [first, rest @ ..] if rest.iter().all(|v| v == first) => {
            put_vint(out, 0);
            put_vint(out, *first);
        }
        _ => {
            let max = values.iter().copied().max().unwrap_or(0);
            let bits = bits_required(u64::from(max));
            put_vint(out, bits);
            let mut writer = PackedWriter::new(out, bits);
            for &v in values {
                writer.add(u64::from(v));
            }
            writer.finish();
        }
    }
}

/// Read `count` values written by [`save_ints`].
pub fn read_ints(input: &mut IndexInput, count: usize) -> Result<PackedInts> {
    match count {
        0 => Ok(PackedInts::Uniform { value: 0, count: 0 }),
        1 => Ok(PackedInts::Uniform { value: u64::from(input.read_vint()?), count: 1 }),
        _ => {
            let bits = input.read_vint()?;
            if bits == 0 {
                let value = u64::from(input.read_vint()?);
                return Ok(PackedInts::Uniform { value, count });
            }
            if bits > MAX_METADATA_BITS {
                return Err(Error::corruption(format!(
                    "{}: metadata width {} exceeds {} bits",
                    input.name(),
                    bits,
                    MAX_METADATA_BITS
                )));
            }
            let data = input.read_shared(packed_len(count, bits))?;
            PackedInts::from_packed(bits, count, data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 0);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(256), 9);
        assert_eq!(bits_required(u64::MAX), 64);
    }

    #[test]
    fn test_msb_first_layout() {
        let mut buf = Vec::new();
        let mut writer = PackedWriter::new(&mut buf, 3);
        for v in [1, 2, 3] {
            writer.add(v);
        }
        writer.finish();
        // 001 010 011 + 7 padding bits
        assert_eq!(buf, vec![0b0010_1001, 0b1000_0000]);
    }

    #[test]
    fn test_random_access_all_widths() {
        let mut rng = rand::rng();
        for bits in 1..=64u32 {
            let max = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
            let values: Vec<u64> = (0..77).map(|_| rng.random_range(0..=max)).collect();

            let mut buf = Vec::new();
            let mut writer = PackedWriter::new(&mut buf, bits);
            for &v in &values {
                writer.add(v);
            }
            writer.finish();
            assert_eq!(buf.len(), packed_len(values.len(), bits));

            let ints = PackedInts::from_packed(bits, values.len(), Bytes::from(buf)).unwrap();
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(ints.get(i), v, "bits={} i={}", bits, i);
            }
            assert_eq!(ints.iter().collect::<Vec<_>>(), values);
        }
    }

    #[test]
    fn test_pack_uniform() {
        let ints = PackedInts::pack(&[7, 7, 7]);
        assert_eq!(ints, PackedInts::Uniform { value: 7, count: 3 });
        assert_eq!(ints.bits(), 0);
        assert_eq!(ints.iter().sum::<u64>(), 21);
    }

    fn saved(values: &[u32]) -> Vec<u8> {
        let mut buf = Vec::new();
        save_ints(values, &mut buf);
        buf
    }

    fn reread(values: &[u32]) -> PackedInts {
        let mut input = IndexInput::new("meta", Bytes::from(saved(values)));
        let ints = read_ints(&mut input, values.len()).unwrap();
        assert_eq!(input.remaining(), 0);
        ints
    }

    #[test]
    fn test_save_ints_encodings() {
        assert_eq!(saved(&[300]), vec![0xAC, 0x02]);
        assert_eq!(saved(&[5, 5, 5]), vec![0, 5]);
        // 3 values of 2 bits
        assert_eq!(saved(&[1, 2, 3]), vec![2, 0b0110_1100]);

        assert_eq!(reread(&[300]).get(0), 300);
        assert_eq!(reread(&[5, 5, 5]), PackedInts::Uniform { value: 5, count: 3 });
        let ints = reread(&[10, 0, 4000, u32::MAX]);
        assert_eq!(ints.bits(), 32);
        assert_eq!(ints.iter().collect::<Vec<_>>(), vec![10, 0, 4000, u64::from(u32::MAX)]);
    }

    #[test]
    fn test_metadata_width_too_large() {
        let mut input = IndexInput::new("meta", Bytes::from(vec![33, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
        assert!(read_ints(&mut input, 2).unwrap_err().is_corruption());
    }

    #[test]
    fn test_truncated_packed_data() {
        let mut buf = saved(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        buf.pop();
        let mut input = IndexInput::new("meta", Bytes::from(buf));
        assert!(read_ints(&mut input, 9).unwrap_err().is_corruption());
    }
}
