//! Chunk file reader
//!
//! Validates the header, reads the chunk table into an id lookup, and seeks
//! to any chunk's payload on demand, so chunks can be visited in any order
//! independent of their physical layout.

use std::io::{self, Read, Seek};

use hashbrown::HashMap;
use log::{debug, trace};

use crate::cursor::StreamCursor;
use crate::error::{ChunkError, Result};
use crate::format::{ChunkDesc, ChunkFormat, FileHeader, Magic};
use crate::layout::FixedLayout;
use crate::strings::{LengthPrefix, Narrow, StringEncoding, Wide};


/// Upper bound for allocations sized from counts stored in the file
const PREALLOC_LIMIT: usize = 4096;

/// Reader for chunk-structured input streams
#[derive(Debug)]
pub struct ChunkReader<R> {
    cursor: StreamCursor<R>,
    chunks: HashMap<u32, ChunkDesc>,
    /// Chunk ids in file order
    order: Vec<u32>,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            cursor: StreamCursor::new(stream),
            chunks: HashMap::new(),
            order: Vec::new(),
        }
    }

    // =========================================================================
    // Header
    // =========================================================================

    /// Read and validate the file header
    ///
    /// Fails with [`ChunkError::InvalidMagicLength`] before any I/O if
    /// `expected_magic` is not 4 bytes, with [`ChunkError::MagicMismatch`] if
    /// the stored signature differs, and with
    /// [`ChunkError::IncompatibleVersion`] if `requested_version` is older
    /// than the file's compatible version.
    pub fn read_header(&mut self, expected_magic: &str, requested_version: u16) -> Result<FileHeader> {
        let expected = Magic::parse(expected_magic)?;
        self.read_header_for(expected, requested_version)
    }

    /// [`ChunkReader::read_header`] against a format descriptor, requesting
    /// the descriptor's own version
    pub fn read_format_header(&mut self, format: &ChunkFormat) -> Result<FileHeader> {
        self.read_header_for(format.magic, format.version)
    }

    fn read_header_for(&mut self, expected: Magic, requested_version: u16) -> Result<FileHeader> {
        let header: FileHeader = self.read()?;

        if header.magic() != expected {
            return Err(ChunkError::MagicMismatch {
                expected,
                found: header.magic(),
            });
        }
        if !header.is_readable_by(requested_version) {
            return Err(ChunkError::IncompatibleVersion {
                requested: requested_version,
                compatible: header.compatible_version,
            });
        }

        debug!(
            "Read header {} version {} (compatible {}, flags 0x{:08X})",
            expected,
            header.version_string(),
            header.compatible_version,
            header.flags
        );
        self.cursor.set_header(header);
        Ok(header)
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// Read any fixed-layout value
    pub fn read<T: FixedLayout>(&mut self) -> Result<T> {
        Ok(T::read_from(self.cursor.get_mut())?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read()
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read()
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.read()
    }

    /// Read exactly `len` raw bytes
    ///
    /// The buffer grows as data arrives, so a corrupt length cannot force a
    /// huge up-front allocation.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        let read = self
            .cursor
            .get_mut()
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut buf)?;
        if read < len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(buf)
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// String with an 8-bit length prefix and UTF-8 characters
    pub fn read_string8(&mut self) -> Result<String> {
        self.read_string::<u8, Narrow>()
    }

    /// String with an 8-bit length prefix and UTF-16 characters
    pub fn read_wstring8(&mut self) -> Result<String> {
        self.read_string::<u8, Wide>()
    }

    /// String with a 16-bit length prefix and UTF-8 characters
    pub fn read_string16(&mut self) -> Result<String> {
        self.read_string::<u16, Narrow>()
    }

    /// String with a 16-bit length prefix and UTF-16 characters
    pub fn read_wstring16(&mut self) -> Result<String> {
        self.read_string::<u16, Wide>()
    }

    /// String with a 32-bit length prefix and UTF-8 characters
    pub fn read_string32(&mut self) -> Result<String> {
        self.read_string::<u32, Narrow>()
    }

    /// String with a 32-bit length prefix and UTF-16 characters
    pub fn read_wstring32(&mut self) -> Result<String> {
        self.read_string::<u32, Wide>()
    }

    /// Read a length-prefixed string of any prefix width and encoding
    pub fn read_string<L: LengthPrefix, E: StringEncoding>(&mut self) -> Result<String> {
        let offset = self.cursor.position()?;
        let len = self.read::<L>()?.to_len();
        if len == 0 {
            return Ok(String::new());
        }

        let bytes = self.read_bytes(len * E::UNIT_SIZE)?;
        E::decode(bytes).ok_or(ChunkError::InvalidString {
            offset,
            encoding: E::NAME,
        })
    }

    // =========================================================================
    // Chunk table
    // =========================================================================

    /// Read the chunk table at the current position
    ///
    /// Returns the chunk ids in file order. A table that lists an id twice is
    /// rejected with [`ChunkError::DuplicateChunkInTable`]. Reading a new table
    /// replaces the previous one; a rejected table leaves the reader with no
    /// chunks at all.
    pub fn read_chunk_table(&mut self) -> Result<Vec<u32>> {
        self.chunks.clear();
        self.order.clear();

        let count = self.read_u32()? as usize;
        let mut chunks = HashMap::with_capacity(count.min(PREALLOC_LIMIT));
        let mut ids = Vec::with_capacity(count.min(PREALLOC_LIMIT));

        for _ in 0..count {
            let desc: ChunkDesc = self.read()?;
            if chunks.insert(desc.id, desc).is_some() {
                return Err(ChunkError::DuplicateChunkInTable(desc.id));
            }
            trace!(
                "Chunk {} at 0x{:08X} ({} bytes)",
                desc.id, desc.offset, desc.size
            );
            ids.push(desc.id);
        }

        debug!("Read chunk table with {} entries", count);
        self.chunks = chunks;
        self.order.clone_from(&ids);
        Ok(ids)
    }

    /// Seek to the payload of chunk `id` and return its descriptor
    ///
    /// Returns `None` without seeking if the id is not in the table.
    pub fn locate_chunk(&mut self, id: u32) -> Result<Option<&ChunkDesc>> {
        let Some(offset) = self.chunks.get(&id).map(|desc| desc.offset) else {
            return Ok(None);
        };
        self.cursor.seek_to(u64::from(offset))?;
        Ok(self.chunks.get(&id))
    }

    /// Locate chunk `id` and read its whole payload
    pub fn read_chunk(&mut self, id: u32) -> Result<Option<Vec<u8>>> {
        let Some(size) = self.locate_chunk(id)?.map(|desc| desc.size) else {
            return Ok(None);
        };
        self.read_bytes(size as usize).map(Some)
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    pub fn position(&mut self) -> Result<u64> {
        self.cursor.position()
    }

    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.cursor.seek_to(pos)
    }

    pub fn push_and_seek(&mut self, pos: u64) -> Result<u64> {
        self.cursor.push_and_seek(pos)
    }

    pub fn pop_and_restore(&mut self) -> Result<()> {
        self.cursor.pop_and_restore()
    }
}

impl<R> ChunkReader<R> {
    /// Descriptor of chunk `id`, without seeking
    pub fn chunk(&self, id: u32) -> Option<&ChunkDesc> {
        self.chunks.get(&id)
    }

    /// Stream position one past the payload of chunk `id`
    pub fn chunk_end(&self, id: u32) -> Option<u64> {
        self.chunks.get(&id).map(ChunkDesc::end)
    }

    /// Chunk ids in file order
    pub fn chunk_ids(&self) -> &[u32] {
        &self.order
    }

    /// Chunk descriptors in file order
    pub fn chunks(&self) -> impl Iterator<Item = &ChunkDesc> {
        self.order.iter().filter_map(|id| self.chunks.get(id))
    }

    pub fn header(&self) -> Option<&FileHeader> {
        self.cursor.header()
    }

    /// `"major.minor"` version of the file, once the header was read
    pub fn version_string(&self) -> Option<String> {
        self.cursor.version_string()
    }

    pub fn cursor(&self) -> &StreamCursor<R> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut StreamCursor<R> {
        &mut self.cursor
    }

    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }
}
