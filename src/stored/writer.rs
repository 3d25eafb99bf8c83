//! Buffers documents into chunks and writes a stored-fields segment.

use crate::compress::Compressor;
use crate::config::StoreOptions;
use crate::document::{Document, FieldInfos, FieldValue};
use crate::error::{Error, Result};
use crate::packed::save_ints;
use crate::store::{write_header, Directory, Footer, IndexOutput};
use crate::stored::chunk::ChunkIterator;
use crate::stored::field::write_field;
use crate::stored::index::ChunkIndexWriter;
use crate::stored::reader::StoredFieldsReader;
use crate::stored::{
    segment_file_name, DATA_CODEC, FIELDS_EXTENSION, FIELDS_INDEX_EXTENSION, INDEX_CODEC,
    MAX_DIRTY_CHUNKS, VERSION_CURRENT,
};
use crate::varint::put_vint;
use bytes::BytesMut;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Finished,
    Aborted,
}

/// Writes the stored fields of one segment.
///
/// Documents are serialized into an in-memory buffer which is compressed
/// and flushed as a chunk once it reaches the chunk size or the maximum
/// number of documents per chunk.
///
/// If any write fails, both files of the segment are deleted and the writer
/// refuses further work. Dropping a writer before [`finish`](Self::finish)
/// has the same effect.
///
/// ```no_run
/// use docstore::document::{Document, FieldInfos};
/// use docstore::store::FsDirectory;
/// use docstore::stored::StoredFieldsWriter;
/// use docstore::StoreOptions;
/// use std::sync::Arc;
///
/// # fn main() -> docstore::Result<()> {
/// let dir = Arc::new(FsDirectory::open("./segments")?);
/// let infos = Arc::new(FieldInfos::from_names(["id", "body"])?);
/// let mut writer = StoredFieldsWriter::new(dir, "_0", infos, StoreOptions::default())?;
/// writer.add_document(&Document::new().with(0, 1i64).with(1, "hello"))?;
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StoredFieldsWriter {
    directory: Arc<dyn Directory>,
    segment: String,
    field_infos: Arc<FieldInfos>,
    options: StoreOptions,
    compressor: Box<dyn Compressor>,
    fields_stream: Option<IndexOutput>,
    index_writer: Option<ChunkIndexWriter>,

    buffered_docs: BytesMut,
    num_stored_fields: Vec<u32>,
    end_offsets: Vec<usize>,
    num_stored_fields_in_doc: u32,
    in_document: bool,
    doc_base: u32,

    num_chunks: u64,
    num_dirty_chunks: u64,
    scratch: Vec<u8>,
    compressed: Vec<u8>,
    state: WriterState,
}

impl StoredFieldsWriter {
    /// Create `<segment>.fdt` and `<segment>.fdx` in `directory`.
    pub fn new(
        directory: Arc<dyn Directory>,
        segment: &str,
        field_infos: Arc<FieldInfos>,
        options: StoreOptions,
    ) -> Result<Self> {
        options.validate()?;

        let data_name = segment_file_name(segment, FIELDS_EXTENSION);
        let index_name = segment_file_name(segment, FIELDS_INDEX_EXTENSION);
        let fields_stream = directory.create_output(&data_name)?;
        let index_stream = match directory.create_output(&index_name) {
            Ok(out) => out,
            Err(e) => {
                drop(fields_stream);
                let _ = directory.delete_file(&data_name);
                return Err(e);
            }
        };

        let mut writer = Self {
            compressor: options.compression.new_compressor(),
            directory,
            segment: segment.to_string(),
            field_infos,
            buffered_docs: BytesMut::with_capacity(options.chunk_size),
            options,
            fields_stream: Some(fields_stream),
            index_writer: None,
            num_stored_fields: Vec::new(),
            end_offsets: Vec::new(),
            num_stored_fields_in_doc: 0,
            in_document: false,
            doc_base: 0,
            num_chunks: 0,
            num_dirty_chunks: 0,
            scratch: Vec::new(),
            compressed: Vec::new(),
            state: WriterState::Open,
        };

        writer.run(move |w| {
            let mut index_stream = index_stream;
            write_header(&mut index_stream, INDEX_CODEC, VERSION_CURRENT)?;
            w.index_writer = Some(ChunkIndexWriter::new(index_stream));

            let compression = w.options.compression;
            let chunk_size = w.options.chunk_size as u32;
            let out = w.data_out()?;
            write_header(out, DATA_CODEC, VERSION_CURRENT)?;
            out.write_byte(compression.id())?;
            out.write_vint(chunk_size)?;
            Ok(())
        })?;

        log::debug!(
            "created stored fields writer {} with {:?}",
            writer.segment,
            writer.options
        );
        Ok(writer)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Finished => {
                Err(Error::already_closed(format!("stored fields writer {} is finished", self.segment)))
            }
            WriterState::Aborted => {
                Err(Error::already_closed(format!("stored fields writer {} was aborted", self.segment)))
            }
        }
    }

    /// Run a write operation, aborting the segment if it fails.
    fn run<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.ensure_open()?;
        match op(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("stored fields writer {} failed: {}", self.segment, e);
                self.abort_files();
                Err(e)
            }
        }
    }

    fn data_out(&mut self) -> Result<&mut IndexOutput> {
        self.fields_stream.as_mut().ok_or_else(|| Error::invalid_state("data file is closed"))
    }

    /// Start buffering a new document.
    pub fn start_document(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.in_document {
            return Err(Error::invalid_state("previous document is not finished"));
        }
        self.in_document = true;
        self.num_stored_fields_in_doc = 0;
        Ok(())
    }

    /// Append a field to the current document.
    pub fn write_field(&mut self, field_number: u32, value: &FieldValue) -> Result<()> {
        self.ensure_open()?;
        if !self.in_document {
            return Err(Error::invalid_state("write_field called outside of a document"));
        }
        // a half-written field leaves the buffer unusable
        self.run(|w| {
            if w.field_infos.by_number(field_number).is_none() {
                return Err(Error::invalid_argument(format!("unknown field number {}", field_number)));
            }
            write_field(&mut w.buffered_docs, field_number, value)?;
            w.num_stored_fields_in_doc += 1;
            Ok(())
        })
    }

    /// Close the current document, flushing a chunk if the buffer is full.
    pub fn finish_document(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.in_document {
            return Err(Error::invalid_state("finish_document called outside of a document"));
        }
        self.in_document = false;
        let num_fields = self.num_stored_fields_in_doc;
        self.run(|w| w.push_document(num_fields))
    }

    /// Write a whole document.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        self.start_document()?;
        for field in doc.fields() {
            self.write_field(field.number, &field.value)?;
        }
        self.finish_document()
    }

    /// Record the document ending at the current buffer position.
    fn push_document(&mut self, num_fields: u32) -> Result<()> {
        let end = self.buffered_docs.len();
        let start = self.end_offsets.last().copied().unwrap_or(0);
        if end - start > u32::MAX as usize {
            return Err(Error::invalid_argument(format!(
                "document of {} bytes is too large",
                end - start
            )));
        }
        self.num_stored_fields.push(num_fields);
        self.end_offsets.push(end);
        if self.trigger_flush() {
            self.flush(false)?;
        }
        Ok(())
    }

    fn num_buffered_docs(&self) -> usize {
        self.num_stored_fields.len()
    }

    fn trigger_flush(&self) -> bool {
        self.buffered_docs.len() >= self.options.chunk_size
            || self.num_buffered_docs() >= self.options.max_docs_per_chunk
    }

    fn write_chunk_header(&mut self, chunk_docs: u32, num_stored_fields: &[u32], lengths: &[u32]) -> Result<()> {
        let start_pointer = self.data_out()?.file_pointer();
        self.index_writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("index file is closed"))?
            .write_index(chunk_docs, start_pointer)?;

        let mut header = std::mem::take(&mut self.scratch);
        header.clear();
        put_vint(&mut header, self.doc_base);
        put_vint(&mut header, chunk_docs);
        save_ints(num_stored_fields, &mut header);
        save_ints(lengths, &mut header);
        let written = self.data_out()?.write_bytes(&header);
        self.scratch = header;
        written
    }

    fn flush(&mut self, dirty: bool) -> Result<()> {
        let chunk_docs = self.num_buffered_docs() as u32;
        let num_stored_fields = std::mem::take(&mut self.num_stored_fields);
        let mut prev = 0;
        let lengths: Vec<u32> = self
            .end_offsets
            .iter()
            .map(|&end| {
                let len = (end - prev) as u32;
                prev = end;
                len
            })
            .collect();
        let start_pointer = self.data_out()?.file_pointer();
        self.write_chunk_header(chunk_docs, &num_stored_fields, &lengths)?;

        // big chunks are split into independently decodable blocks
        let chunk_size = self.options.chunk_size;
        let total = self.buffered_docs.len();
        let sliced = total >= 2 * chunk_size;
        let block_size = if sliced { chunk_size } else { total.max(1) };
        let out = self.fields_stream.as_mut().ok_or_else(|| Error::invalid_state("data file is closed"))?;
        if total == 0 {
            self.compressed.clear();
            self.compressor.compress(&[], &mut self.compressed);
            out.write_bytes(&self.compressed)?;
        }
        for block in self.buffered_docs.chunks(block_size) {
            self.compressed.clear();
            self.compressor.compress(block, &mut self.compressed);
            out.write_bytes(&self.compressed)?;
        }

        log::debug!(
            "flushed chunk of {} docs at {}: {} -> {} bytes{}{}",
            chunk_docs,
            start_pointer,
            total,
            out.file_pointer() - start_pointer,
            if sliced { ", sliced" } else { "" },
            if dirty { ", dirty" } else { "" }
        );

        self.doc_base += chunk_docs;
        self.buffered_docs.clear();
        self.end_offsets.clear();
        self.num_stored_fields = num_stored_fields;
        self.num_stored_fields.clear();
        self.num_chunks += 1;
        if dirty {
            self.num_dirty_chunks += 1;
        }
        Ok(())
    }

    /// Flush pending documents and write the index, statistics and footers.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.in_document {
            return Err(Error::invalid_state("finish called inside a document"));
        }
        self.run(|w| {
            if w.num_buffered_docs() > 0 {
                w.flush(true)?;
            }

            let mut data = w.fields_stream.take().ok_or_else(|| Error::invalid_state("data file is closed"))?;
            let index = w.index_writer.take().ok_or_else(|| Error::invalid_state("index file is closed"))?;

            let max_pointer = data.file_pointer();
            let mut index_out = index.finish(w.doc_base, max_pointer)?;
            Footer::write_to(&mut index_out)?;
            index_out.close()?;

            data.write_vlong(w.num_chunks)?;
            data.write_vlong(w.num_dirty_chunks)?;
            Footer::write_to(&mut data)?;
            let data_len = data.file_pointer();
            data.close()?;

            w.state = WriterState::Finished;
            log::info!(
                "finished stored fields {}: {} docs, {} chunks ({} dirty), {} bytes",
                w.segment,
                w.doc_base,
                w.num_chunks,
                w.num_dirty_chunks,
                data_len
            );
            Ok(())
        })
    }

    /// Discard the segment: both files are deleted.
    pub fn abort(&mut self) -> Result<()> {
        self.ensure_open()?;
        log::warn!("aborting stored fields writer {}", self.segment);
        self.abort_files();
        Ok(())
    }

    fn abort_files(&mut self) {
        self.state = WriterState::Aborted;
        self.fields_stream = None;
        self.index_writer = None;
        self.buffered_docs = BytesMut::new();
        for ext in [FIELDS_EXTENSION, FIELDS_INDEX_EXTENSION] {
            let name = segment_file_name(&self.segment, ext);
            if self.directory.file_exists(&name) {
                if let Err(e) = self.directory.delete_file(&name) {
                    log::warn!("failed to delete {} after abort: {}", name, e);
                }
            }
        }
    }

    /// Append every document of `readers`, in order. Returns the number of
    /// documents added.
    ///
    /// Chunks are copied without recompression when the source segment uses
    /// the same compression mode and chunk size and is not too dirty.
    pub fn merge(&mut self, readers: &[StoredFieldsReader]) -> Result<u64> {
        self.ensure_open()?;
        if self.in_document {
            return Err(Error::invalid_state("merge called inside a document"));
        }
        for reader in readers {
            if reader.field_infos().as_ref() != self.field_infos.as_ref() {
                return Err(Error::invalid_argument(format!(
                    "segment {} has different field infos",
                    reader.segment()
                )));
            }
        }

        self.run(|w| {
            let mut docs = 0u64;
            let mut copied = 0u64;
            for reader in readers {
                let (merged, chunks) = w.merge_reader(reader)?;
                docs += merged;
                copied += chunks;
            }
            log::info!(
                "merged {} docs from {} segments into {} ({} chunks copied)",
                docs,
                readers.len(),
                w.segment,
                copied
            );
            Ok(docs)
        })
    }

    fn can_bulk_copy(&self, reader: &StoredFieldsReader) -> bool {
        let dirty = reader.num_dirty_chunks();
        let too_dirty = dirty > MAX_DIRTY_CHUNKS || dirty * 100 > reader.num_chunks();
        reader.compression_mode() == self.options.compression
            && reader.chunk_size() == self.options.chunk_size
            && !too_dirty
    }

    fn merge_reader(&mut self, reader: &StoredFieldsReader) -> Result<(u64, u64)> {
        let bulk = self.can_bulk_copy(reader);
        let mut it = reader.chunk_iterator()?;
        let num_docs = reader.num_docs();
        let mut copied = 0;

        let mut doc = 0u32;
        while doc < num_docs {
            it.advance(doc)?;
            let chunk_docs = it.chunk_docs()?;

            if bulk && self.num_buffered_docs() == 0 {
                self.copy_chunk(&mut it)?;
                copied += 1;
            } else {
                it.decompress()?;
                for i in 0..chunk_docs as usize {
                    self.buffered_docs.extend_from_slice(it.document_bytes(i)?);
                    self.push_document(it.num_stored_fields(i)?)?;
                }
            }
            doc = it.doc_base()? + chunk_docs;
        }

        it.check_integrity()?;
        // copied chunks keep whatever dirtiness they had in the source
        self.num_dirty_chunks += reader.num_dirty_chunks().min(copied);
        Ok((u64::from(num_docs), copied))
    }

    fn copy_chunk(&mut self, it: &mut ChunkIterator) -> Result<()> {
        let chunk_docs = it.chunk_docs()?;
        let num_stored_fields: Vec<u32> = it.stored_field_counts()?.iter().map(|v| v as u32).collect();
        let lengths: Vec<u32> = it.lengths()?.iter().map(|v| v as u32).collect();
        self.write_chunk_header(chunk_docs, &num_stored_fields, &lengths)?;
        it.copy_compressed_data(self.data_out()?)?;

        self.doc_base += chunk_docs;
        self.num_chunks += 1;
        Ok(())
    }

    /// Segment name.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Number of documents written so far, including buffered ones.
    pub fn num_docs(&self) -> u64 {
        u64::from(self.doc_base) + self.num_buffered_docs() as u64
    }
}

impl Drop for StoredFieldsWriter {
    fn drop(&mut self) {
        if self.state == WriterState::Open {
            log::warn!("stored fields writer {} dropped before finish", self.segment);
            self.abort_files();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::CompressionMode;
    use crate::store::RamDirectory;

    fn infos() -> Arc<FieldInfos> {
        Arc::new(FieldInfos::from_names(["id", "text"]).unwrap())
    }

    fn doc(i: usize) -> Document {
        Document::new().with(0, i as i32).with(1, format!("document number {}", i))
    }

    fn write(dir: &Arc<RamDirectory>, segment: &str, options: StoreOptions, count: usize) {
        let mut writer = StoredFieldsWriter::new(dir.clone(), segment, infos(), options).unwrap();
        for i in 0..count {
            writer.add_document(&doc(i)).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_flush_by_doc_count() {
        let dir = Arc::new(RamDirectory::new());
        write(&dir, "_0", StoreOptions::default().max_docs_per_chunk(4), 10);

        let reader = StoredFieldsReader::open(&*dir, "_0", infos()).unwrap();
        assert_eq!(reader.num_docs(), 10);
        // 4 + 4 + 2, the last one flushed by finish
        assert_eq!(reader.num_chunks(), 3);
        assert_eq!(reader.num_dirty_chunks(), 1);
    }

    #[test]
    fn test_flush_by_size() {
        let dir = Arc::new(RamDirectory::new());
        write(&dir, "_0", StoreOptions::default().chunk_size(64), 20);

        let mut reader = StoredFieldsReader::open(&*dir, "_0", infos()).unwrap();
        assert!(reader.num_chunks() >= 5);
        for i in 0..20 {
            assert_eq!(reader.document(i as u32).unwrap(), doc(i));
        }
    }

    #[test]
    fn test_empty_segment() {
        let dir = Arc::new(RamDirectory::new());
        write(&dir, "_0", StoreOptions::default(), 0);

        let reader = StoredFieldsReader::open(&*dir, "_0", infos()).unwrap();
        assert_eq!(reader.num_docs(), 0);
        assert_eq!(reader.num_chunks(), 0);
        reader.check_integrity().unwrap();
    }

    #[test]
    fn test_api_misuse() {
        let dir = Arc::new(RamDirectory::new());
        let mut writer = StoredFieldsWriter::new(dir.clone(), "_0", infos(), StoreOptions::default()).unwrap();

        assert!(matches!(writer.write_field(0, &FieldValue::Int(1)), Err(Error::InvalidState(_))));
        assert!(matches!(writer.finish_document(), Err(Error::InvalidState(_))));

        writer.start_document().unwrap();
        assert!(matches!(writer.start_document(), Err(Error::InvalidState(_))));
        writer.write_field(0, &FieldValue::Int(1)).unwrap();
        assert!(matches!(writer.finish(), Err(Error::InvalidState(_))));
        writer.finish_document().unwrap();
        writer.add_document(&doc(1)).unwrap();
        writer.finish().unwrap();

        let mut reader = StoredFieldsReader::open(&*dir, "_0", infos()).unwrap();
        assert_eq!(reader.num_docs(), 2);
        assert_eq!(reader.document(1).unwrap(), doc(1));
    }

    #[test]
    fn test_unserializable_field_aborts() {
        let dir = Arc::new(RamDirectory::new());
        let mut writer = StoredFieldsWriter::new(dir.clone(), "_0", infos(), StoreOptions::default()).unwrap();
        writer.add_document(&doc(0)).unwrap();

        let bad = Document::new().with(0, 2i32).with(5, "unknown");
        assert!(matches!(writer.add_document(&bad), Err(Error::InvalidArgument(_))));
        assert!(dir.list_all().unwrap().is_empty());

        assert!(matches!(writer.add_document(&doc(2)), Err(Error::AlreadyClosed(_))));
        assert!(matches!(writer.finish(), Err(Error::AlreadyClosed(_))));
        assert!(StoredFieldsReader::open(&*dir, "_0", infos()).is_err());
    }

    #[test]
    fn test_unknown_field_number_aborts() {
        let dir = Arc::new(RamDirectory::new());
        let mut writer = StoredFieldsWriter::new(dir.clone(), "_0", infos(), StoreOptions::default()).unwrap();
        writer.start_document().unwrap();
        assert!(matches!(writer.write_field(9, &FieldValue::Int(1)), Err(Error::InvalidArgument(_))));
        assert!(dir.list_all().unwrap().is_empty());
        assert!(matches!(writer.finish_document(), Err(Error::AlreadyClosed(_))));
    }

    #[test]
    fn test_closed_after_finish() {
        let dir = Arc::new(RamDirectory::new());
        let mut writer = StoredFieldsWriter::new(dir.clone(), "_0", infos(), StoreOptions::default()).unwrap();
        writer.finish().unwrap();
        assert!(matches!(writer.add_document(&doc(0)), Err(Error::AlreadyClosed(_))));
        assert!(matches!(writer.finish(), Err(Error::AlreadyClosed(_))));
        assert!(matches!(writer.abort(), Err(Error::AlreadyClosed(_))));
        // finished files survive the drop
        drop(writer);
        assert_eq!(dir.list_all().unwrap(), vec!["_0.fdt".to_string(), "_0.fdx".to_string()]);
    }

    #[test]
    fn test_abort_deletes_files() {
        let dir = Arc::new(RamDirectory::new());
        write(&dir, "_0", StoreOptions::default(), 3);

        let mut writer = StoredFieldsWriter::new(dir.clone(), "_1", infos(), StoreOptions::default()).unwrap();
        writer.add_document(&doc(0)).unwrap();
        writer.abort().unwrap();
        assert!(matches!(writer.add_document(&doc(1)), Err(Error::AlreadyClosed(_))));
        assert_eq!(dir.list_all().unwrap(), vec!["_0.fdt".to_string(), "_0.fdx".to_string()]);

        // dropping an unfinished writer aborts as well
        let writer = StoredFieldsWriter::new(dir.clone(), "_2", infos(), StoreOptions::default()).unwrap();
        drop(writer);
        assert_eq!(dir.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_existing_segment_rejected() {
        let dir = Arc::new(RamDirectory::new());
        write(&dir, "_0", StoreOptions::default(), 1);
        assert!(StoredFieldsWriter::new(dir.clone(), "_0", infos(), StoreOptions::default()).is_err());
        // the committed segment is untouched
        StoredFieldsReader::open(&*dir, "_0", infos()).unwrap().check_integrity().unwrap();
    }

    #[test]
    fn test_merge_bulk_copy() {
        let dir = Arc::new(RamDirectory::new());
        // 2 docs per chunk and an even count: no dirty chunk
        let options = StoreOptions::default().max_docs_per_chunk(2);
        write(&dir, "_0", options.clone(), 300);
        write(&dir, "_1", options.clone(), 100);

        let readers = vec![
            StoredFieldsReader::open(&*dir, "_0", infos()).unwrap(),
            StoredFieldsReader::open(&*dir, "_1", infos()).unwrap(),
        ];
        assert_eq!(readers[0].num_dirty_chunks(), 0);

        let mut writer = StoredFieldsWriter::new(dir.clone(), "_2", infos(), options).unwrap();
        assert_eq!(writer.merge(&readers).unwrap(), 400);
        writer.finish().unwrap();

        let mut merged = StoredFieldsReader::open(&*dir, "_2", infos()).unwrap();
        merged.check_integrity().unwrap();
        assert_eq!(merged.num_docs(), 400);
        assert_eq!(merged.num_chunks(), 200);
        for i in 0..300 {
            assert_eq!(merged.document(i as u32).unwrap(), doc(i));
        }
        for i in 0..100 {
            assert_eq!(merged.document(300 + i as u32).unwrap(), doc(i));
        }
    }

    #[test]
    fn test_merge_recompresses() {
        let dir = Arc::new(RamDirectory::new());
        write(&dir, "_0", StoreOptions::default().max_docs_per_chunk(3), 10);
        write(&dir, "_1", StoreOptions::high_compression(), 5);

        let readers = vec![
            StoredFieldsReader::open(&*dir, "_0", infos()).unwrap(),
            StoredFieldsReader::open(&*dir, "_1", infos()).unwrap(),
        ];
        let options = StoreOptions::default().compression(CompressionMode::High).chunk_size(128);
        let mut writer = StoredFieldsWriter::new(dir.clone(), "_2", infos(), options).unwrap();
        writer.add_document(&doc(99)).unwrap();
        assert_eq!(writer.merge(&readers).unwrap(), 15);
        writer.finish().unwrap();

        let mut merged = StoredFieldsReader::open(&*dir, "_2", infos()).unwrap();
        assert_eq!(merged.compression_mode(), CompressionMode::High);
        assert_eq!(merged.num_docs(), 16);
        assert_eq!(merged.document(0).unwrap(), doc(99));
        for i in 0..10 {
            assert_eq!(merged.document(1 + i as u32).unwrap(), doc(i));
        }
        for i in 0..5 {
            assert_eq!(merged.document(11 + i as u32).unwrap(), doc(i));
        }
    }

    #[test]
    fn test_merge_requires_same_field_infos() {
        let dir = Arc::new(RamDirectory::new());
        write(&dir, "_0", StoreOptions::default(), 2);
        let reader = StoredFieldsReader::open(&*dir, "_0", infos()).unwrap();

        let other = Arc::new(FieldInfos::from_names(["id", "other"]).unwrap());
        let mut writer = StoredFieldsWriter::new(dir.clone(), "_1", other, StoreOptions::default()).unwrap();
        assert!(matches!(writer.merge(&[reader]), Err(Error::InvalidArgument(_))));
        // still usable
        writer.finish().unwrap();
    }
}
