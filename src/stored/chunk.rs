//! Chunk headers and whole-chunk iteration.
//!
//! [`ChunkIterator`] walks the chunks of a segment in document order. It is
//! the bulk path used by merging: a chunk can either be copied verbatim or
//! decompressed as a whole and split into per-document bytes.

use crate::compress::Decompressor;
use crate::error::{Error, Result};
use crate::packed::{read_ints, PackedInts};
use crate::store::{check_footer, IndexInput, IndexOutput};
use crate::stored::index::ChunkIndexReader;
use std::sync::Arc;

/// Decoded header and metadata of one chunk.
#[derive(Debug, Clone)]
pub(crate) struct ChunkState {
    pub(crate) doc_base: u32,
    pub(crate) chunk_docs: u32,
    pub(crate) num_stored_fields: PackedInts,
    pub(crate) lengths: PackedInts,
    /// Prefix sums of `lengths`, `chunk_docs + 1` entries.
    pub(crate) offsets: Vec<usize>,
    /// First byte of the compressed payload.
    pub(crate) start_pointer: u64,
    pub(crate) sliced: bool,
}

impl ChunkState {
    /// Read a chunk header at the cursor of `input`.
    pub(crate) fn read(input: &mut IndexInput, num_docs: u32, chunk_size: usize) -> Result<Self> {
        let doc_base = input.read_vint()?;
        let chunk_docs = input.read_vint()?;
        if chunk_docs == 0 || u64::from(doc_base) + u64::from(chunk_docs) > u64::from(num_docs) {
            return Err(Error::corruption(format!(
                "{}: chunk doc_base={}, chunk_docs={}, num_docs={}",
                input.name(),
                doc_base,
                chunk_docs,
                num_docs
            )));
        }

        let num_stored_fields = read_ints(input, chunk_docs as usize)?;
        let lengths = read_ints(input, chunk_docs as usize)?;

        let mut offsets = Vec::with_capacity(chunk_docs as usize + 1);
        offsets.push(0usize);
        let mut total = 0usize;
        for (i, (length, fields)) in lengths.iter().zip(num_stored_fields.iter()).enumerate() {
            if (length == 0) != (fields == 0) {
                return Err(Error::corruption(format!(
                    "{}: doc {} has length={}, num_stored_fields={}",
                    input.name(),
                    u64::from(doc_base) + i as u64,
                    length,
                    fields
                )));
            }
            total = total
                .checked_add(length as usize)
                .ok_or_else(|| Error::corruption("chunk length overflow"))?;
            offsets.push(total);
        }

        Ok(Self {
            doc_base,
            chunk_docs,
            num_stored_fields,
            lengths,
            offsets,
            start_pointer: input.file_pointer(),
            sliced: total >= 2 * chunk_size,
        })
    }

    pub(crate) fn contains(&self, doc_id: u32) -> bool {
        doc_id >= self.doc_base && u64::from(doc_id) < self.end_doc()
    }

    pub(crate) fn end_doc(&self) -> u64 {
        u64::from(self.doc_base) + u64::from(self.chunk_docs)
    }

    pub(crate) fn total_len(&self) -> usize {
        self.offsets[self.chunk_docs as usize]
    }
}

/// Decompressed size of block `block` of a big chunk.
pub(crate) fn block_len(total_len: usize, chunk_size: usize, block: usize) -> usize {
    (total_len - block * chunk_size).min(chunk_size)
}

/// Materialize a whole chunk payload at the cursor of `input` into `bytes`.
pub(crate) fn decompress_chunk(
    input: &mut IndexInput,
    decompressor: &mut dyn Decompressor,
    state: &ChunkState,
    chunk_size: usize,
    bytes: &mut Vec<u8>,
    spare: &mut Vec<u8>,
) -> Result<()> {
    let total = state.total_len();
    if state.sliced {
        bytes.clear();
        let mut block = 0;
        while bytes.len() < total {
            let len = block_len(total, chunk_size, block);
            let range = decompressor.decompress(input, len, 0, len, spare)?;
            bytes.extend_from_slice(&spare[range]);
            block += 1;
        }
    } else {
        let range = decompressor.decompress(input, total, 0, total, bytes)?;
        debug_assert_eq!(range.start, 0);
        bytes.truncate(range.end);
    }

    if bytes.len() != total {
        return Err(Error::corruption(format!(
            "{}: expected chunk size {}, got {}",
            input.name(),
            total,
            bytes.len()
        )));
    }
    Ok(())
}

/// Sequential chunk cursor over a segment's data file.
#[derive(Debug)]
pub struct ChunkIterator {
    stream: IndexInput,
    decompressor: Box<dyn Decompressor>,
    index: Arc<ChunkIndexReader>,
    chunk_size: usize,
    state: Option<ChunkState>,
    /// Position of the current chunk in the index.
    chunk: usize,
    /// Document after the last one covered so far.
    next_doc: u64,
    bytes: Vec<u8>,
    spare: Vec<u8>,
    decompressed: bool,
}

impl ChunkIterator {
    pub(crate) fn new(
        stream: IndexInput,
        decompressor: Box<dyn Decompressor>,
        index: Arc<ChunkIndexReader>,
        chunk_size: usize,
    ) -> Self {
        Self {
            stream,
            decompressor,
            index,
            chunk_size,
            state: None,
            chunk: 0,
            next_doc: 0,
            bytes: Vec::new(),
            spare: Vec::new(),
            decompressed: false,
        }
    }

    /// Move to the chunk containing `doc_id`, which must not precede the
    /// documents already covered.
    pub fn advance(&mut self, doc_id: u32) -> Result<()> {
        if u64::from(doc_id) < self.next_doc {
            return Err(Error::invalid_argument(format!(
                "doc {} already covered (next doc {})",
                doc_id, self.next_doc
            )));
        }

        self.state = None;
        self.decompressed = false;
        let chunk = self.index.chunk_for(doc_id)?;
        self.stream.seek(self.index.start_pointer(doc_id)?)?;
        let state = ChunkState::read(&mut self.stream, self.index.num_docs(), self.chunk_size)?;

        if u64::from(state.doc_base) < self.next_doc || !state.contains(doc_id) {
            return Err(Error::corruption(format!(
                "{}: chunk [{}, {}) does not continue at doc {} (covered up to {})",
                self.stream.name(),
                state.doc_base,
                state.end_doc(),
                doc_id,
                self.next_doc
            )));
        }

        self.chunk = chunk;
        self.next_doc = state.end_doc();
        self.state = Some(state);
        Ok(())
    }

    fn state(&self) -> Result<&ChunkState> {
        self.state.as_ref().ok_or_else(|| Error::invalid_state("iterator is not positioned on a chunk"))
    }

    /// First document of the current chunk.
    pub fn doc_base(&self) -> Result<u32> {
        self.state().map(|s| s.doc_base)
    }

    /// Number of documents in the current chunk.
    pub fn chunk_docs(&self) -> Result<u32> {
        self.state().map(|s| s.chunk_docs)
    }

    /// Number of stored fields of the `i`-th document of the chunk.
    pub fn num_stored_fields(&self, i: usize) -> Result<u32> {
        let state = self.state()?;
        check_doc_index(state, i)?;
        Ok(state.num_stored_fields.get(i) as u32)
    }

    /// Serialized length of each document of the chunk.
    pub fn lengths(&self) -> Result<&PackedInts> {
        self.state().map(|s| &s.lengths)
    }

    /// Per-document field counts of the chunk.
    pub fn stored_field_counts(&self) -> Result<&PackedInts> {
        self.state().map(|s| &s.num_stored_fields)
    }

    /// Decompress the whole chunk.
    pub fn decompress(&mut self) -> Result<()> {
        let state = self.state.as_ref().ok_or_else(|| Error::invalid_state("iterator is not positioned on a chunk"))?;
        self.stream.seek(state.start_pointer)?;
        decompress_chunk(
            &mut self.stream,
            self.decompressor.as_mut(),
            state,
            self.chunk_size,
            &mut self.bytes,
            &mut self.spare,
        )?;
        self.decompressed = true;
        Ok(())
    }

    /// Serialized bytes of the `i`-th document, after [`decompress`](Self::decompress).
    pub fn document_bytes(&self, i: usize) -> Result<&[u8]> {
        let state = self.state()?;
        check_doc_index(state, i)?;
        if !self.decompressed {
            return Err(Error::invalid_state("chunk is not decompressed"));
        }
        Ok(&self.bytes[state.offsets[i]..state.offsets[i + 1]])
    }

    /// Copy the compressed payload of the current chunk verbatim to `out`.
    pub fn copy_compressed_data(&mut self, out: &mut IndexOutput) -> Result<()> {
        let start = self.state()?.start_pointer;
        let end = self.index.end_pointer(self.chunk);
        if end < start {
            return Err(Error::corruption(format!(
                "{}: chunk payload ends at {} before it starts at {}",
                self.stream.name(),
                end,
                start
            )));
        }
        self.stream.seek(start)?;
        out.copy_bytes(&mut self.stream, (end - start) as usize)
    }

    /// Verify the checksum of the whole data file once every chunk has been
    /// visited.
    pub fn check_integrity(&self) -> Result<()> {
        let num_docs = u64::from(self.index.num_docs());
        if self.next_doc != num_docs {
            return Err(Error::invalid_state(format!(
                "iterator stopped at doc {} of {}",
                self.next_doc, num_docs
            )));
        }
        check_footer(&self.stream).map(|_| ())
    }
}

fn check_doc_index(state: &ChunkState, i: usize) -> Result<()> {
    if i >= state.chunk_docs as usize {
        return Err(Error::invalid_argument(format!(
            "document {} out of bounds of chunk with {} docs",
            i, state.chunk_docs
        )));
    }
    Ok(())
}
