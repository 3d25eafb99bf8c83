//! Serialization of individual field values.
//!
//! ```text
//! [tag: varint]          // field_number << TYPE_BITS | type
//! STRING, BYTE_ARR       [len: varint][bytes]
//! NUMERIC_INT, FLOAT     [value: 4 bytes LE]
//! NUMERIC_LONG, DOUBLE   [value: 8 bytes LE]
//! ```

use crate::document::{FieldInfos, FieldValue, Status, StoredFieldVisitor};
use crate::error::{Error, Result};
use crate::store::IndexInput;
use crate::varint::{self, put_vint};
use bytes::BufMut;

/// UTF-8 string.
pub const STRING: u32 = 0x00;
/// Byte array.
pub const BYTE_ARR: u32 = 0x01;
/// `i32`.
pub const NUMERIC_INT: u32 = 0x02;
/// `f32`.
pub const NUMERIC_FLOAT: u32 = 0x03;
/// `i64`.
pub const NUMERIC_LONG: u32 = 0x04;
/// `f64`.
pub const NUMERIC_DOUBLE: u32 = 0x05;

/// Bits of the tag holding the value type.
pub const TYPE_BITS: u32 = 3;
/// Mask of the type bits.
pub const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;

/// Largest field number that fits in a tag.
pub const MAX_FIELD_NUMBER: u32 = u32::MAX >> TYPE_BITS;

/// Type bits of `value`.
pub fn type_of(value: &FieldValue) -> u32 {
    match value {
        FieldValue::String(_) => STRING,
        FieldValue::Bytes(_) => BYTE_ARR,
        FieldValue::Int(_) => NUMERIC_INT,
        FieldValue::Float(_) => NUMERIC_FLOAT,
        FieldValue::Long(_) => NUMERIC_LONG,
        FieldValue::Double(_) => NUMERIC_DOUBLE,
    }
}

/// Append one serialized field to `buf`. Nothing is written on error.
pub fn write_field<B: BufMut>(buf: &mut B, field_number: u32, value: &FieldValue) -> Result<()> {
    if field_number > MAX_FIELD_NUMBER {
        return Err(Error::invalid_argument(format!(
            "field number {} exceeds {}",
            field_number, MAX_FIELD_NUMBER
        )));
    }
    if let FieldValue::String(s) = value {
        check_len(s.len())?;
    } else if let FieldValue::Bytes(b) = value {
        check_len(b.len())?;
    }

    put_vint(buf, (field_number << TYPE_BITS) | type_of(value));
    match value {
        FieldValue::String(s) => {
            put_vint(buf, s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        FieldValue::Bytes(b) => {
            put_vint(buf, b.len() as u32);
            buf.put_slice(b);
        }
        FieldValue::Int(v) => buf.put_i32_le(*v),
        FieldValue::Float(v) => buf.put_u32_le(v.to_bits()),
        FieldValue::Long(v) => buf.put_i64_le(*v),
        FieldValue::Double(v) => buf.put_u64_le(v.to_bits()),
    }
    Ok(())
}

fn check_len(len: usize) -> Result<()> {
    if len > u32::MAX as usize {
        return Err(Error::invalid_argument(format!("field value of {} bytes", len)));
    }
    Ok(())
}

/// Byte source for field parsing.
pub trait FieldInput {
    /// Read one byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Read exactly `len` bytes.
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Step over `len` bytes.
    fn skip(&mut self, len: usize) -> Result<()>;

    /// Read a `u32` varint.
    fn read_vint(&mut self) -> Result<u32> {
        varint::decode_with(32, || self.read_byte()).map(|v| v as u32)
    }

    /// Read 4 little-endian bytes.
    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        for b in &mut buf {
            *b = self.read_byte()?;
        }
        Ok(u32::from_le_bytes(buf))
    }

    /// Read 8 little-endian bytes.
    fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        for b in &mut buf {
            *b = self.read_byte()?;
        }
        Ok(u64::from_le_bytes(buf))
    }
}

impl FieldInput for IndexInput {
    fn read_byte(&mut self) -> Result<u8> {
        IndexInput::read_byte(self)
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        self.read_slice(len).map(<[u8]>::to_vec)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.skip_bytes(len)
    }

    fn read_vint(&mut self) -> Result<u32> {
        IndexInput::read_vint(self)
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        IndexInput::read_u32_le(self)
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        IndexInput::read_u64_le(self)
    }
}

fn read_value<I: FieldInput + ?Sized>(input: &mut I, bits: u32) -> Result<FieldValue> {
    Ok(match bits {
        STRING => {
            let len = input.read_vint()? as usize;
            let data = input.read_vec(len)?;
            let s = String::from_utf8(data)
                .map_err(|e| Error::corruption(format!("invalid UTF-8 in string field: {}", e)))?;
            FieldValue::String(s)
        }
        BYTE_ARR => {
            let len = input.read_vint()? as usize;
            FieldValue::Bytes(input.read_vec(len)?)
        }
        NUMERIC_INT => FieldValue::Int(input.read_u32_le()? as i32),
        NUMERIC_FLOAT => FieldValue::Float(f32::from_bits(input.read_u32_le()?)),
        NUMERIC_LONG => FieldValue::Long(input.read_u64_le()? as i64),
        NUMERIC_DOUBLE => FieldValue::Double(f64::from_bits(input.read_u64_le()?)),
        _ => return Err(Error::corruption(format!("unknown field type {}", bits))),
    })
}

fn skip_value<I: FieldInput + ?Sized>(input: &mut I, bits: u32) -> Result<()> {
    match bits {
        STRING | BYTE_ARR => {
            let len = input.read_vint()? as usize;
            input.skip(len)
        }
        NUMERIC_INT | NUMERIC_FLOAT => input.skip(4),
        NUMERIC_LONG | NUMERIC_DOUBLE => input.skip(8),
        _ => Err(Error::corruption(format!("unknown field type {}", bits))),
    }
}

/// Decode `num_fields` serialized fields, feeding them to `visitor`.
pub fn visit_fields<I, V>(
    input: &mut I,
    num_fields: usize,
    field_infos: &FieldInfos,
    visitor: &mut V,
) -> Result<()>
where
    I: FieldInput + ?Sized,
    V: StoredFieldVisitor + ?Sized,
{
    for _ in 0..num_fields {
        let tag = input.read_vint()?;
        let number = tag >> TYPE_BITS;
        let bits = tag & TYPE_MASK;
        let info = field_infos
            .by_number(number)
            .ok_or_else(|| Error::corruption(format!("unknown field number {}", number)))?;

        match visitor.needs_field(info) {
            Status::Yes => match read_value(input, bits)? {
                FieldValue::String(v) => visitor.string_field(info, v)?,
                FieldValue::Bytes(v) => visitor.binary_field(info, v)?,
                FieldValue::Int(v) => visitor.int_field(info, v)?,
                FieldValue::Float(v) => visitor.float_field(info, v)?,
                FieldValue::Long(v) => visitor.long_field(info, v)?,
                FieldValue::Double(v) => visitor.double_field(info, v)?,
            },
            Status::No => skip_value(input, bits)?,
            Status::Stop => return Ok(()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DocumentVisitor, FieldInfo};
    use bytes::Bytes;

    fn infos() -> FieldInfos {
        FieldInfos::from_names(["s", "b", "i", "f", "l", "d"]).unwrap()
    }

    fn serialize(doc: &Document) -> Vec<u8> {
        let mut buf = Vec::new();
        for field in doc.fields() {
            write_field(&mut buf, field.number, &field.value).unwrap();
        }
        buf
    }

    #[test]
    fn test_all_types_roundtrip() {
        let doc = Document::new()
            .with(0, "héllo")
            .with(1, vec![0u8, 255, 7])
            .with(2, -5i32)
            .with(3, 1.5f32)
            .with(4, i64::MIN)
            .with(5, -0.0f64);

        let mut input = IndexInput::new("doc", Bytes::from(serialize(&doc)));
        let mut visitor = DocumentVisitor::new();
        visit_fields(&mut input, doc.len(), &infos(), &mut visitor).unwrap();
        assert_eq!(input.remaining(), 0);

        let read = visitor.into_document();
        assert_eq!(read, doc);
        // bit-exact floats
        assert!(matches!(read.get(5), Some(FieldValue::Double(d)) if d.to_bits() == (-0.0f64).to_bits()));
    }

    #[test]
    fn test_wire_layout() {
        let mut buf = Vec::new();
        write_field(&mut buf, 2, &FieldValue::Int(1)).unwrap();
        assert_eq!(buf, vec![(2 << TYPE_BITS | NUMERIC_INT) as u8, 1, 0, 0, 0]);

        buf.clear();
        write_field(&mut buf, 0, &FieldValue::String("ab".into())).unwrap();
        assert_eq!(buf, vec![STRING as u8, 2, b'a', b'b']);
    }

    #[test]
    fn test_field_number_limit() {
        let mut buf = Vec::new();
        assert!(write_field(&mut buf, MAX_FIELD_NUMBER, &FieldValue::Int(0)).is_ok());
        let err = write_field(&mut buf, MAX_FIELD_NUMBER + 1, &FieldValue::Int(0));
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_skip_and_stop() {
        struct OnlyLongs(Vec<i64>);
        impl StoredFieldVisitor for OnlyLongs {
            fn needs_field(&mut self, info: &FieldInfo) -> Status {
                match info.name.as_str() {
                    "l" => Status::Yes,
                    "d" => Status::Stop,
                    _ => Status::No,
                }
            }
            fn long_field(&mut self, _info: &FieldInfo, value: i64) -> Result<()> {
                self.0.push(value);
                Ok(())
            }
        }

        let doc = Document::new()
            .with(0, "skipped")
            .with(4, 10i64)
            .with(1, vec![1u8; 300])
            .with(4, 20i64)
            .with(5, 1.0f64)
            .with(4, 30i64);
        let mut input = IndexInput::new("doc", Bytes::from(serialize(&doc)));
        let mut visitor = OnlyLongs(Vec::new());
        visit_fields(&mut input, doc.len(), &infos(), &mut visitor).unwrap();
        assert_eq!(visitor.0, vec![10, 20]);
    }

    #[test]
    fn test_corrupt_fields() {
        // unknown field number
        let mut buf = Vec::new();
        write_field(&mut buf, 9, &FieldValue::Int(1)).unwrap();
        let mut input = IndexInput::new("doc", Bytes::from(buf));
        let err = visit_fields(&mut input, 1, &infos(), &mut DocumentVisitor::new());
        assert!(err.unwrap_err().is_corruption());

        // unknown type
        let mut input = IndexInput::new("doc", Bytes::from(vec![0x07u8]));
        let err = visit_fields(&mut input, 1, &infos(), &mut DocumentVisitor::new());
        assert!(err.unwrap_err().is_corruption());

        // invalid UTF-8
        let mut input = IndexInput::new("doc", Bytes::from(vec![STRING as u8, 2, 0xC3, 0x28]));
        let err = visit_fields(&mut input, 1, &infos(), &mut DocumentVisitor::new());
        assert!(err.unwrap_err().is_corruption());
    }
}
