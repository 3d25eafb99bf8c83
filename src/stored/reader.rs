//! Random access to the documents of a stored-fields segment.

use crate::compress::{CompressionMode, Decompressor};
use crate::config::MAX_CHUNK_SIZE;
use crate::document::{Document, DocumentVisitor, FieldInfos, StoredFieldVisitor};
use crate::error::{Error, Result};
use crate::store::{check_footer, check_header, Directory, Footer, IndexInput, FOOTER_SIZE};
use crate::stored::chunk::{block_len, ChunkIterator, ChunkState};
use crate::stored::field::{visit_fields, FieldInput};
use crate::stored::index::ChunkIndexReader;
use crate::stored::{
    segment_file_name, BUFFER_REUSE_THRESHOLD, DATA_CODEC, FIELDS_EXTENSION,
    FIELDS_INDEX_EXTENSION, INDEX_CODEC, VERSION_CURRENT, VERSION_START,
};
use std::sync::Arc;

/// Reads documents from one segment.
///
/// A reader keeps the last decoded chunk header and a decompression buffer,
/// so it is not shareable; use [`try_clone`](Self::try_clone) to get an
/// independent instance per thread. Clones share the chunk index and the
/// file bytes.
///
/// ```no_run
/// use docstore::document::FieldInfos;
/// use docstore::store::FsDirectory;
/// use docstore::stored::StoredFieldsReader;
/// use std::sync::Arc;
///
/// # fn main() -> docstore::Result<()> {
/// let dir = FsDirectory::open("./segments")?;
/// let infos = Arc::new(FieldInfos::from_names(["id", "body"])?);
/// let mut reader = StoredFieldsReader::open(&dir, "_0", infos)?;
/// let doc = reader.document(0)?;
/// println!("{:?}", doc);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StoredFieldsReader {
    segment: String,
    version: u32,
    field_infos: Arc<FieldInfos>,
    index: Arc<ChunkIndexReader>,
    fields_stream: IndexInput,
    chunk_size: usize,
    compression_mode: CompressionMode,
    decompressor: Box<dyn Decompressor>,
    num_chunks: u64,
    num_dirty_chunks: u64,
    state: Option<ChunkState>,
    bytes: Vec<u8>,
    closed: bool,
}

impl StoredFieldsReader {
    /// Open the stored fields of `segment`.
    ///
    /// The index file is verified completely, including its checksum. For
    /// the data file only the header, the trailer and the footer structure
    /// are checked; use [`check_integrity`](Self::check_integrity) to verify
    /// its checksum.
    pub fn open(dir: &dyn Directory, segment: &str, field_infos: Arc<FieldInfos>) -> Result<Self> {
        let mut index_in = dir.open_input(&segment_file_name(segment, FIELDS_INDEX_EXTENSION))?;
        check_footer(&index_in)?;
        let version = check_header(&mut index_in, INDEX_CODEC, VERSION_START, VERSION_CURRENT)?;
        let index = ChunkIndexReader::read(&mut index_in)?;
        if index_in.remaining() != FOOTER_SIZE {
            return Err(Error::corruption(format!(
                "{}: {} bytes after the chunk index, expected a {} byte footer",
                index_in.name(),
                index_in.remaining(),
                FOOTER_SIZE
            )));
        }

        let mut fields_stream = dir.open_input(&segment_file_name(segment, FIELDS_EXTENSION))?;
        let data_version = check_header(&mut fields_stream, DATA_CODEC, VERSION_START, VERSION_CURRENT)?;
        if data_version != version {
            return Err(Error::corruption(format!(
                "{}: version mismatch, data={} index={}",
                fields_stream.name(),
                data_version,
                version
            )));
        }

        let compression_mode = CompressionMode::from_u8(fields_stream.read_byte()?)?;
        let chunk_size = fields_stream.read_vint()? as usize;
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::corruption(format!(
                "{}: invalid chunk size {}",
                fields_stream.name(),
                chunk_size
            )));
        }

        let max_pointer = index.max_pointer();
        if max_pointer < fields_stream.file_pointer() {
            return Err(Error::corruption(format!(
                "{}: max pointer {} inside the header",
                fields_stream.name(),
                max_pointer
            )));
        }
        fields_stream.seek(max_pointer)?;
        let num_chunks = fields_stream.read_vlong()?;
        let num_dirty_chunks = fields_stream.read_vlong()?;
        if num_chunks != index.num_chunks() as u64 || num_dirty_chunks > num_chunks {
            return Err(Error::corruption(format!(
                "{}: num_chunks={}, num_dirty_chunks={}, indexed chunks={}",
                fields_stream.name(),
                num_chunks,
                num_dirty_chunks,
                index.num_chunks()
            )));
        }
        if fields_stream.file_pointer() + FOOTER_SIZE as u64 != fields_stream.len() {
            return Err(Error::corruption(format!(
                "{}: footer expected at {}, file length is {}",
                fields_stream.name(),
                fields_stream.file_pointer(),
                fields_stream.len()
            )));
        }
        Footer::retrieve(&fields_stream)?;

        log::debug!(
            "opened stored fields {}: {} docs in {} chunks ({} dirty), mode {:?}, chunk size {}",
            segment,
            index.num_docs(),
            num_chunks,
            num_dirty_chunks,
            compression_mode,
            chunk_size
        );

        Ok(Self {
            segment: segment.to_string(),
            version,
            field_infos,
            index: Arc::new(index),
            fields_stream,
            chunk_size,
            compression_mode,
            decompressor: compression_mode.new_decompressor(),
            num_chunks,
            num_dirty_chunks,
            state: None,
            bytes: Vec::new(),
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::already_closed(format!("stored fields reader {}", self.segment)));
        }
        Ok(())
    }

    /// An independent reader over the same segment, with fresh buffers.
    pub fn try_clone(&self) -> Result<Self> {
        self.ensure_open()?;
        Ok(Self {
            segment: self.segment.clone(),
            version: self.version,
            field_infos: Arc::clone(&self.field_infos),
            index: Arc::clone(&self.index),
            fields_stream: self.fields_stream.clone(),
            chunk_size: self.chunk_size,
            compression_mode: self.compression_mode,
            decompressor: self.decompressor.clone(),
            num_chunks: self.num_chunks,
            num_dirty_chunks: self.num_dirty_chunks,
            state: None,
            bytes: Vec::new(),
            closed: false,
        })
    }

    /// Feed the fields of `doc_id` to `visitor`.
    pub fn visit_document<V>(&mut self, doc_id: u32, visitor: &mut V) -> Result<()>
    where
        V: StoredFieldVisitor + ?Sized,
    {
        self.ensure_open()?;
        let result = self.do_visit_document(doc_id, visitor);
        if self.bytes.capacity() > BUFFER_REUSE_THRESHOLD {
            self.bytes = Vec::new();
        }
        result
    }

    fn do_visit_document<V>(&mut self, doc_id: u32, visitor: &mut V) -> Result<()>
    where
        V: StoredFieldVisitor + ?Sized,
    {
        if doc_id >= self.num_docs() {
            return Err(Error::invalid_argument(format!(
                "doc {} out of bounds ({} docs)",
                doc_id,
                self.num_docs()
            )));
        }

        if !self.state.as_ref().is_some_and(|s| s.contains(doc_id)) {
            self.state = None;
            self.fields_stream.seek(self.index.start_pointer(doc_id)?)?;
            let num_docs = self.num_docs();
            let state = ChunkState::read(&mut self.fields_stream, num_docs, self.chunk_size)?;
            if !state.contains(doc_id) {
                return Err(Error::corruption(format!(
                    "{}: doc {} not in chunk [{}, {})",
                    self.fields_stream.name(),
                    doc_id,
                    state.doc_base,
                    state.end_doc()
                )));
            }
            self.state = Some(state);
        }
        let Some(state) = self.state.as_ref() else {
            return Err(Error::invalid_state("no chunk loaded"));
        };

        let index = (doc_id - state.doc_base) as usize;
        let offset = state.offsets[index];
        let length = state.offsets[index + 1] - offset;
        let num_stored_fields = state.num_stored_fields.get(index) as usize;
        if length == 0 {
            return Ok(());
        }

        self.fields_stream.seek(state.start_pointer)?;
        let mut input = DocumentInput::open(
            &mut self.fields_stream,
            self.decompressor.as_mut(),
            &mut self.bytes,
            state,
            self.chunk_size,
            offset,
            length,
        )?;
        visit_fields(&mut input, num_stored_fields, &self.field_infos, visitor)
    }

    /// Load a whole document.
    pub fn document(&mut self, doc_id: u32) -> Result<Document> {
        let mut visitor = DocumentVisitor::new();
        self.visit_document(doc_id, &mut visitor)?;
        Ok(visitor.into_document())
    }

    /// A chunk cursor for bulk consumers such as merging.
    pub fn chunk_iterator(&self) -> Result<ChunkIterator> {
        self.ensure_open()?;
        Ok(ChunkIterator::new(
            self.fields_stream.clone(),
            self.decompressor.clone(),
            Arc::clone(&self.index),
            self.chunk_size,
        ))
    }

    /// Verify the checksum of the data file.
    pub fn check_integrity(&self) -> Result<()> {
        self.ensure_open()?;
        check_footer(&self.fields_stream).map(|_| ())
    }

    /// Release buffers. Every later call fails with `AlreadyClosed`.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.state = None;
        self.bytes = Vec::new();
        Ok(())
    }

    /// Segment name.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Format version of the segment.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of documents.
    pub fn num_docs(&self) -> u32 {
        self.index.num_docs()
    }

    /// Number of chunks.
    pub fn num_chunks(&self) -> u64 {
        self.num_chunks
    }

    /// Number of chunks flushed before they were full.
    pub fn num_dirty_chunks(&self) -> u64 {
        self.num_dirty_chunks
    }

    /// Compression profile the segment was written with.
    pub fn compression_mode(&self) -> CompressionMode {
        self.compression_mode
    }

    /// Chunk size the segment was written with.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Field metadata used to resolve field numbers.
    pub fn field_infos(&self) -> &Arc<FieldInfos> {
        &self.field_infos
    }

    /// Shared chunk index.
    pub fn chunk_index(&self) -> &Arc<ChunkIndexReader> {
        &self.index
    }
}

/// The serialized bytes of one document, decompressed on demand.
///
/// For big chunks only the block holding the start of the document is
/// decompressed up front; the following blocks are pulled in as the cursor
/// reaches the end of the buffer.
struct DocumentInput<'a> {
    stream: &'a mut IndexInput,
    decompressor: &'a mut dyn Decompressor,
    buf: &'a mut Vec<u8>,
    pos: usize,
    end: usize,
    /// Document bytes not decompressed yet.
    pending: usize,
    next_block: usize,
    total_len: usize,
    chunk_size: usize,
}

impl<'a> DocumentInput<'a> {
    /// Position on `[offset, offset + length)` of the chunk whose payload
    /// starts at the cursor of `stream`.
    fn open(
        stream: &'a mut IndexInput,
        decompressor: &'a mut dyn Decompressor,
        buf: &'a mut Vec<u8>,
        state: &ChunkState,
        chunk_size: usize,
        offset: usize,
        length: usize,
    ) -> Result<Self> {
        let total_len = state.total_len();
        let (range, pending, next_block) = if state.sliced {
            let first = offset / chunk_size;
            for _ in 0..first {
                decompressor.skip(stream, chunk_size)?;
            }
            let inner = offset - first * chunk_size;
            let len = block_len(total_len, chunk_size, first);
            let window = length.min(len - inner);
            let range = decompressor.decompress(stream, len, inner, window, buf)?;
            (range, length - window, first + 1)
        } else {
            let range = decompressor.decompress(stream, total_len, offset, length, buf)?;
            (range, 0, 0)
        };

        Ok(Self {
            stream,
            decompressor,
            buf,
            pos: range.start,
            end: range.end,
            pending,
            next_block,
            total_len,
            chunk_size,
        })
    }

    fn fill(&mut self) -> Result<()> {
        if self.pending == 0 {
            return Err(Error::corruption(format!(
                "{}: read past the end of a document",
                self.stream.name()
            )));
        }
        let len = block_len(self.total_len, self.chunk_size, self.next_block);
        let window = self.pending.min(len);
        let range = self.decompressor.decompress(self.stream, len, 0, window, self.buf)?;
        self.pos = range.start;
        self.end = range.end;
        self.pending -= window;
        self.next_block += 1;
        Ok(())
    }
}

impl FieldInput for DocumentInput<'_> {
    fn read_byte(&mut self) -> Result<u8> {
        if self.pos == self.end {
            self.fill()?;
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(self.end - self.pos + self.pending));
        while out.len() < len {
            if self.pos == self.end {
                self.fill()?;
            }
            let take = (len - out.len()).min(self.end - self.pos);
            out.extend_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
        }
        Ok(out)
    }

    fn skip(&mut self, mut len: usize) -> Result<()> {
        while len > 0 {
            if self.pos == self.end {
                self.fill()?;
            }
            let take = len.min(self.end - self.pos);
            self.pos += take;
            len -= take;
        }
        Ok(())
    }
}
