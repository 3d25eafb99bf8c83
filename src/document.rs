//! Field model: values, documents, field metadata and the visitor
//! through which stored documents are read back.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};

/// A single stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    String(String),
    /// 32-bit integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// 64-bit integer.
    Long(i64),
    /// 64-bit float.
    Double(f64),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Bytes(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        FieldValue::Bytes(value.to_vec())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Long(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

/// A value tagged with the number of the field it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredField {
    /// Field number, resolved through [`FieldInfos`]
    pub number: u32,
    /// The value
    pub value: FieldValue,
}

impl StoredField {
    /// Create a stored field.
    pub fn new(number: u32, value: impl Into<FieldValue>) -> Self {
        Self { number, value: value.into() }
    }
}

/// An ordered list of stored fields. A field number may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<StoredField>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn add(&mut self, number: u32, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.push(StoredField::new(number, value));
        self
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, number: u32, value: impl Into<FieldValue>) -> Self {
        self.add(number, value);
        self
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[StoredField] {
        &self.fields
    }

    /// First value stored under `number`.
    pub fn get(&self, number: u32) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.number == number).map(|f| &f.value)
    }

    /// Every value stored under `number`, in order.
    pub fn get_all(&self, number: u32) -> impl Iterator<Item = &FieldValue> + '_ {
        self.fields.iter().filter(move |f| f.number == number).map(|f| &f.value)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<StoredField> for Document {
    fn from_iter<I: IntoIterator<Item = StoredField>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

/// Metadata of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Field number written in the tag of each value
    pub number: u32,
    /// Whether values of this field are stored
    pub stored: bool,
}

impl FieldInfo {
    /// A stored field named `name` with number `number`.
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self { name: name.into(), number, stored: true }
    }
}

/// The set of fields known to a segment.
#[derive(Debug, Clone, Default)]
pub struct FieldInfos {
    infos: Vec<FieldInfo>,
    by_number: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

impl PartialEq for FieldInfos {
    fn eq(&self, other: &Self) -> bool {
        self.infos == other.infos
    }
}

impl Eq for FieldInfos {}

impl FieldInfos {
    /// Build from explicit infos. Names and numbers must be unique.
    pub fn new(infos: Vec<FieldInfo>) -> Result<Self> {
        let mut by_number = HashMap::with_capacity(infos.len());
        let mut by_name = HashMap::with_capacity(infos.len());
        for (i, info) in infos.iter().enumerate() {
            if by_number.insert(info.number, i).is_some() {
                return Err(Error::invalid_argument(format!(
                    "duplicate field number {}",
                    info.number
                )));
            }
            if by_name.insert(info.name.clone(), i).is_some() {
                return Err(Error::invalid_argument(format!("duplicate field name {}", info.name)));
            }
        }
        Ok(Self { infos, by_number, by_name })
    }

    /// Stored fields numbered `0..` in the order given.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let infos = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| FieldInfo::new(name, i as u32))
            .collect();
        Self::new(infos)
    }

    /// Look up a field by number.
    pub fn by_number(&self, number: u32) -> Option<&FieldInfo> {
        self.by_number.get(&number).map(|&i| &self.infos[i])
    }

    /// Look up a field by name.
    pub fn by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).map(|&i| &self.infos[i])
    }

    /// All fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> + '_ {
        self.infos.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Check if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

/// Decision returned by [`StoredFieldVisitor::needs_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Decode the value and pass it to the typed callback.
    Yes,
    /// Skip the value.
    No,
    /// Stop visiting the document.
    Stop,
}

/// Receives the fields of one document, in stored order.
///
/// Only fields for which `needs_field` answers [`Status::Yes`] are decoded.
pub trait StoredFieldVisitor {
    /// Decide what to do with the next field.
    fn needs_field(&mut self, info: &FieldInfo) -> Status;

    /// A byte array value.
    fn binary_field(&mut self, _info: &FieldInfo, _value: Vec<u8>) -> Result<()> {
        Ok(())
    }

    /// A string value.
    fn string_field(&mut self, _info: &FieldInfo, _value: String) -> Result<()> {
        Ok(())
    }

    /// An `i32` value.
    fn int_field(&mut self, _info: &FieldInfo, _value: i32) -> Result<()> {
        Ok(())
    }

    /// An `f32` value.
    fn float_field(&mut self, _info: &FieldInfo, _value: f32) -> Result<()> {
        Ok(())
    }

    /// An `i64` value.
    fn long_field(&mut self, _info: &FieldInfo, _value: i64) -> Result<()> {
        Ok(())
    }

    /// An `f64` value.
    fn double_field(&mut self, _info: &FieldInfo, _value: f64) -> Result<()> {
        Ok(())
    }
}

/// Collects visited fields into a [`Document`].
#[derive(Debug, Default)]
pub struct DocumentVisitor {
    fields_to_load: Option<HashSet<String>>,
    document: Document,
}

impl DocumentVisitor {
    /// Load every field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load only the named fields.
    pub fn with_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields_to_load: Some(names.into_iter().map(Into::into).collect()),
            document: Document::new(),
        }
    }

    /// The collected document.
    pub fn into_document(self) -> Document {
        self.document
    }

    fn push(&mut self, info: &FieldInfo, value: FieldValue) -> Result<()> {
        self.document.fields.push(StoredField { number: info.number, value });
        Ok(())
    }
}

impl StoredFieldVisitor for DocumentVisitor {
    fn needs_field(&mut self, info: &FieldInfo) -> Status {
        match &self.fields_to_load {
            Some(names) if !names.contains(&info.name) => Status::No,
            _ => Status::Yes,
        }
    }

    fn binary_field(&mut self, info: &FieldInfo, value: Vec<u8>) -> Result<()> {
        self.push(info, FieldValue::Bytes(value))
    }

    fn string_field(&mut self, info: &FieldInfo, value: String) -> Result<()> {
        self.push(info, FieldValue::String(value))
    }

    fn int_field(&mut self, info: &FieldInfo, value: i32) -> Result<()> {
        self.push(info, FieldValue::Int(value))
    }

    fn float_field(&mut self, info: &FieldInfo, value: f32) -> Result<()> {
        self.push(info, FieldValue::Float(value))
    }

    fn long_field(&mut self, info: &FieldInfo, value: i64) -> Result<()> {
        self.push(info, FieldValue::Long(value))
    }

    fn double_field(&mut self, info: &FieldInfo, value: f64) -> Result<()> {
        self.push(info, FieldValue::Double(value))
    }
}
