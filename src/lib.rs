//! # DocStore - Compressed Stored Fields for Search Segments
//!
//! DocStore persists the stored fields of the documents of an immutable
//! search segment. Documents are serialized, grouped into chunks and
//! compressed with LZ4, so that a single document can be loaded by
//! decompressing only the chunk (or the part of a big chunk) it lives in.
//!
//! ## Architecture
//!
//! - **Store**: write-once files behind a [`Directory`](store::Directory),
//!   with codec headers and CRC32 footers
//! - **Compression**: an LZ4 block codec with a greedy `Fast` profile and a
//!   hash-chain `High` profile, plus partial decompression
//! - **Packed ints**: bit-packed metadata for chunk headers and the index
//! - **Stored fields**: the chunk writer, the chunk index and the
//!   random-access reader
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use docstore::{Document, FieldInfos, StoreOptions, StoredFieldsReader, StoredFieldsWriter};
//! use docstore::store::FsDirectory;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), docstore::Error> {
//! let dir = Arc::new(FsDirectory::open("./index")?);
//! let infos = Arc::new(FieldInfos::from_names(["id", "title"])?);
//!
//! // Write a segment
//! let mut writer = StoredFieldsWriter::new(dir.clone(), "_0", infos.clone(), StoreOptions::default())?;
//! writer.add_document(&Document::new().with(0, 1i64).with(1, "hello world"))?;
//! writer.finish()?;
//!
//! // Read it back
//! let mut reader = StoredFieldsReader::open(&*dir, "_0", infos)?;
//! let doc = reader.document(0)?;
//! println!("Found: {:?}", doc.get(1));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod compress;
pub mod config;
pub mod document;
pub mod error;
pub mod packed;
pub mod store;
pub mod stored;
pub mod varint;

// Re-exports
pub use config::{CompressionMode, StoreOptions};
pub use document::{
    Document, DocumentVisitor, FieldInfo, FieldInfos, FieldValue, Status, StoredField, StoredFieldVisitor,
};
pub use error::{Error, Result};
pub use stored::{ChunkIterator, StoredFieldsReader, StoredFieldsWriter};
