//! Chunk index: maps the first document of every chunk to the file pointer
//! of its header.
//!
//! Entries are grouped in blocks of up to [`BLOCK_SIZE`] chunks. Within a
//! block, doc bases and start pointers are stored as a first value followed
//! by packed deltas between consecutive entries.

use crate::error::{Error, Result};
use crate::packed::{bits_required, packed_len, PackedInts, PackedWriter};
use crate::store::{IndexInput, IndexOutput};

/// Maximum number of chunks per index block.
pub const BLOCK_SIZE: usize = 1024;

/// Accumulates chunk entries and writes them to the index file.
#[derive(Debug)]
pub struct ChunkIndexWriter {
    out: IndexOutput,
    doc_bases: Vec<u32>,
    start_pointers: Vec<u64>,
    total_docs: u32,
    total_chunks: u64,
    last_start_pointer: Option<u64>,
    scratch: Vec<u8>,
}

impl ChunkIndexWriter {
    /// Wrap an output whose header is already written.
    pub fn new(out: IndexOutput) -> Self {
        Self {
            out,
            doc_bases: Vec::with_capacity(BLOCK_SIZE),
            start_pointers: Vec::with_capacity(BLOCK_SIZE),
            total_docs: 0,
            total_chunks: 0,
            last_start_pointer: None,
            scratch: Vec::new(),
        }
    }

    /// Name of the index file.
    pub fn name(&self) -> &str {
        self.out.name()
    }

    /// Record a chunk of `num_docs` documents whose header starts at
    /// `start_pointer`.
    pub fn write_index(&mut self, num_docs: u32, start_pointer: u64) -> Result<()> {
        if num_docs == 0 {
            return Err(Error::invalid_argument("chunk without documents"));
        }
        if let Some(last) = self.last_start_pointer {
            if start_pointer <= last {
                return Err(Error::invalid_argument(format!(
                    "start pointer {} not after {}",
                    start_pointer, last
                )));
            }
        }
        if self.doc_bases.len() == BLOCK_SIZE {
            self.write_block()?;
        }

        self.doc_bases.push(self.total_docs);
        self.start_pointers.push(start_pointer);
        self.last_start_pointer = Some(start_pointer);
        self.total_docs = self.total_docs.checked_add(num_docs).ok_or_else(|| {
            Error::invalid_argument(format!("more than {} documents in a segment", u32::MAX))
        })?;
        self.total_chunks += 1;
        Ok(())
    }

    fn write_packed_deltas(&mut self, deltas: impl Iterator<Item = u64> + Clone, count: usize) -> Result<()> {
        let max = deltas.clone().max().unwrap_or(0);
        let bits = bits_required(max);
        self.out.write_vint(bits)?;
        if bits > 0 {
            self.scratch.clear();
            self.scratch.reserve(packed_len(count, bits));
            let mut writer = PackedWriter::new(&mut self.scratch, bits);
            for delta in deltas {
                writer.add(delta);
            }
            writer.finish();
            self.out.write_bytes(&self.scratch)?;
        }
        Ok(())
    }

    fn write_block(&mut self) -> Result<()> {
        let count = self.doc_bases.len();
        debug_assert!(count > 0);
        self.out.write_vint(count as u32)?;

        let doc_bases = std::mem::take(&mut self.doc_bases);
        self.out.write_vint(doc_bases[0])?;
        self.write_packed_deltas(doc_bases.windows(2).map(|w| u64::from(w[1] - w[0])), count - 1)?;

        let start_pointers = std::mem::take(&mut self.start_pointers);
        self.out.write_vlong(start_pointers[0])?;
        self.write_packed_deltas(start_pointers.windows(2).map(|w| w[1] - w[0]), count - 1)?;

        self.doc_bases = doc_bases;
        self.doc_bases.clear();
        self.start_pointers = start_pointers;
        self.start_pointers.clear();
        Ok(())
    }

    /// Write the pending block and the trailer. Returns the output so the
    /// caller can write the footer.
    pub fn finish(mut self, num_docs: u32, max_pointer: u64) -> Result<IndexOutput> {
        if num_docs != self.total_docs {
            return Err(Error::invalid_state(format!(
                "expected {} docs, but got {}",
                num_docs, self.total_docs
            )));
        }
        if !self.doc_bases.is_empty() {
            self.write_block()?;
        }
        self.out.write_vint(0)?;
        self.out.write_vint(num_docs)?;
        self.out.write_vlong(max_pointer)?;
        log::debug!("chunk index {}: {} chunks, {} docs", self.out.name(), self.total_chunks, num_docs);
        Ok(self.out)
    }
}

/// In-memory chunk index, shared by every clone of a reader.
#[derive(Debug, Clone)]
pub struct ChunkIndexReader {
    doc_bases: Vec<u32>,
    start_pointers: Vec<u64>,
    num_docs: u32,
    max_pointer: u64,
}

fn read_deltas(input: &mut IndexInput, count: usize, max_bits: u32) -> Result<PackedInts> {
    let bits = input.read_vint()?;
    if bits > max_bits {
        return Err(Error::corruption(format!(
            "{}: delta width {} exceeds {} bits",
            input.name(),
            bits,
            max_bits
        )));
    }
    if bits == 0 {
        return Ok(PackedInts::Uniform { value: 0, count });
    }
    let data = input.read_shared(packed_len(count, bits))?;
    PackedInts::from_packed(bits, count, data)
}

impl ChunkIndexReader {
    /// Read the index blocks and trailer at the cursor of `input`.
    pub fn read(input: &mut IndexInput) -> Result<Self> {
        let mut doc_bases = Vec::new();
        let mut start_pointers = Vec::new();

        loop {
            let count = input.read_vint()? as usize;
            if count == 0 {
                break;
            }
            if count > BLOCK_SIZE {
                return Err(Error::corruption(format!(
                    "{}: index block of {} chunks",
                    input.name(),
                    count
                )));
            }

            let mut doc_base = input.read_vint()?;
            let doc_deltas = read_deltas(input, count - 1, 32)?;
            doc_bases.push(doc_base);
            for delta in doc_deltas.iter() {
                doc_base = u32::try_from(u64::from(doc_base) + delta)
                    .map_err(|_| Error::corruption("doc base overflow"))?;
                doc_bases.push(doc_base);
            }

            let mut pointer = input.read_vlong()?;
            let pointer_deltas = read_deltas(input, count - 1, 64)?;
            start_pointers.push(pointer);
            for delta in pointer_deltas.iter() {
                pointer = pointer
                    .checked_add(delta)
                    .ok_or_else(|| Error::corruption("start pointer overflow"))?;
                start_pointers.push(pointer);
            }
        }

        let num_docs = input.read_vint()?;
        let max_pointer = input.read_vlong()?;

        let index = Self { doc_bases, start_pointers, num_docs, max_pointer };
        index.validate().map_err(|msg| Error::corruption(format!("{}: {}", input.name(), msg)))?;
        Ok(index)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.num_docs == 0 {
            return if self.doc_bases.is_empty() {
                Ok(())
            } else {
                Err(format!("{} chunks but no documents", self.doc_bases.len()))
            };
        }
        if self.doc_bases.first() != Some(&0) {
            return Err("first chunk does not start at doc 0".to_string());
        }
        if self.doc_bases.windows(2).any(|w| w[1] <= w[0]) {
            return Err("doc bases not strictly increasing".to_string());
        }
        if self.start_pointers.windows(2).any(|w| w[1] <= w[0]) {
            return Err("start pointers not strictly increasing".to_string());
        }
        if let Some(&last) = self.doc_bases.last() {
            if last >= self.num_docs {
                return Err(format!("doc base {} beyond {} docs", last, self.num_docs));
            }
        }
        if let Some(&last) = self.start_pointers.last() {
            if last >= self.max_pointer {
                return Err(format!("start pointer {} beyond max pointer {}", last, self.max_pointer));
            }
        }
        Ok(())
    }

    /// Number of documents in the segment.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// File pointer right after the last chunk.
    pub fn max_pointer(&self) -> u64 {
        self.max_pointer
    }

    /// Number of indexed chunks.
    pub fn num_chunks(&self) -> usize {
        self.doc_bases.len()
    }

    /// Position of the chunk containing `doc_id`.
    pub fn chunk_for(&self, doc_id: u32) -> Result<usize> {
        if doc_id >= self.num_docs {
            return Err(Error::invalid_argument(format!(
                "doc {} out of bounds ({} docs)",
                doc_id, self.num_docs
            )));
        }
        // last chunk whose base is <= doc_id
        Ok(self.doc_bases.partition_point(|&base| base <= doc_id) - 1)
    }

    /// File pointer of the header of the chunk containing `doc_id`.
    pub fn start_pointer(&self, doc_id: u32) -> Result<u64> {
        self.chunk_for(doc_id).map(|chunk| self.start_pointers[chunk])
    }

    /// First document of chunk `chunk`.
    pub fn doc_base(&self, chunk: usize) -> u32 {
        self.doc_bases[chunk]
    }

    /// File pointer right after chunk `chunk`.
    pub fn end_pointer(&self, chunk: usize) -> u64 {
        self.start_pointers.get(chunk + 1).copied().unwrap_or(self.max_pointer)
    }
}
