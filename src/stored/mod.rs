//! Chunked, compressed stored fields.
//!
//! A segment's stored fields live in two files:
//!
//! ## Data file (`<segment>.fdt`)
//!
//! ```text
//! [header "DocStoreData"]
//! [compression mode id: u8][chunk size: varint]
//! [chunk 1] ... [chunk N]
//! [num chunks: varlong][num dirty chunks: varlong]
//! [footer]
//! ```
//!
//! Each chunk:
//!
//! ```text
//! [doc base: varint][chunk docs: varint]
//! [num stored fields per doc: packed metadata]
//! [serialized length per doc: packed metadata]
//! [payload: one LZ4 block, or chunk-size blocks when the chunk is big]
//! ```
//!
//! A chunk is big when its serialized documents add up to at least twice the
//! chunk size. Big chunks are compressed in independent blocks so a reader
//! can step over the blocks in front of a document.
//!
//! ## Index file (`<segment>.fdx`)
//!
//! ```text
//! [header "DocStoreIndex"]
//! [block 1] ... [block M]     // up to 1024 chunks each
//! [0: varint]
//! [num docs: varint][max pointer: varlong]
//! [footer]
//! ```
//!
//! Each block:
//!
//! ```text
//! [count: varint]
//! [first doc base: varint][bits: varint][packed doc base deltas]
//! [first start pointer: varlong][bits: varint][packed start pointer deltas]
//! ```

pub mod chunk;
pub mod field;
pub mod index;
pub mod reader;
pub mod writer;

pub use chunk::ChunkIterator;
pub use index::{ChunkIndexReader, ChunkIndexWriter};
pub use reader::StoredFieldsReader;
pub use writer::StoredFieldsWriter;

/// Extension of the data file.
pub const FIELDS_EXTENSION: &str = "fdt";

/// Extension of the chunk index file.
pub const FIELDS_INDEX_EXTENSION: &str = "fdx";

/// Codec name of the data file.
pub const DATA_CODEC: &str = "DocStoreData";

/// Codec name of the chunk index file.
pub const INDEX_CODEC: &str = "DocStoreIndex";

/// Oldest readable format version.
pub const VERSION_START: u32 = 1;

/// Format version written.
pub const VERSION_CURRENT: u32 = VERSION_START;

/// Reader scratch buffers larger than this are released after each document.
pub const BUFFER_REUSE_THRESHOLD: usize = 1 << 15;

/// Source segments with more dirty chunks than this are never bulk copied.
pub const MAX_DIRTY_CHUNKS: u64 = 1024;

/// Name of the file holding `extension` data for `segment`.
pub fn segment_file_name(segment: &str, extension: &str) -> String {
    format!("{}.{}", segment, extension)
}
