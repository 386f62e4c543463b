//! Chunk file writer
//!
//! Emits the header, primitives and strings, and implements the two
//! back-patching protocols:
//!
//! - **Offsets**: [`ChunkWriter::reserve_offset`] writes a 4-byte hole and
//!   remembers it on a stack; [`ChunkWriter::resolve_offset`] later fills the
//!   most recent hole with the position reached by then.
//! - **Chunk descriptors**: [`ChunkWriter::reserve_chunk_desc`] writes a
//!   zeroed table entry for an id, [`ChunkWriter::begin_chunk`] records where
//!   the payload starts, and [`ChunkWriter::end_chunk`] patches the entry with
//!   the final `{id, offset, size}`.
//!
//! ```ignore
//! let mut writer = ChunkWriter::new(file);
//! writer.write_header("SCNE", 103, 100, 0)?;
//! writer.write_chunk_table(&[1, 2])?;
//!
//! writer.begin_chunk(2)?;
//! writer.write_string16("level-1")?;
//! writer.end_chunk(2)?;
//!
//! writer.begin_chunk(1)?;
//! writer.write_u32(42)?;
//! writer.end_chunk(1)?;
//!
//! writer.finish()?;
//! ```

use std::io::{Seek, Write};

use bytemuck::Zeroable;
use hashbrown::{HashMap, HashSet};
use log::{debug, trace, warn};

use crate::cursor::StreamCursor;
use crate::error::{ChunkError, Result};
use crate::format::{ChunkDesc, ChunkFormat, FileHeader, Magic};
use crate::layout::FixedLayout;
use crate::strings::{LengthPrefix, Narrow, StringEncoding, Wide, preview};


/// Table slot of a reserved chunk and its progress so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingChunk {
    /// Position of the 12-byte placeholder in the chunk table
    reserved_pos: u64,
    /// Payload start, set by `begin_chunk`
    offset: Option<u32>,
    /// Payload length, set by `end_chunk`
    size: Option<u32>,
}

impl PendingChunk {
    fn new(reserved_pos: u64) -> Self {
        Self {
            reserved_pos,
            offset: None,
            size: None,
        }
    }

    fn desc(&self, id: u32) -> ChunkDesc {
        ChunkDesc::new(id, self.offset.unwrap_or(0), self.size.unwrap_or(0))
    }
}

/// Writer for chunk-structured output streams
#[derive(Debug)]
pub struct ChunkWriter<W> {
    cursor: StreamCursor<W>,
    /// Positions of unresolved offset placeholders
    offsets: Vec<u64>,
    chunks: HashMap<u32, PendingChunk>,
    /// Chunk ids in reservation order
    reserved: Vec<u32>,
}

impl<W: Write + Seek> ChunkWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            cursor: StreamCursor::new(stream),
            offsets: Vec::new(),
            chunks: HashMap::new(),
            reserved: Vec::new(),
        }
    }

    // =========================================================================
    // Header
    // =========================================================================

    /// Write the file header
    ///
    /// Fails with [`ChunkError::InvalidMagicLength`] if `magic` is not a
    /// string of 4 bytes.
    pub fn write_header(
        &mut self,
        magic: &str,
        version: u16,
        compatible_version: u16,
        flags: u32,
    ) -> Result<()> {
        let magic = Magic::parse(magic)?;
        self.write_header_record(FileHeader::new(magic, version, compatible_version, flags))
    }

    /// Write the header described by a format descriptor
    pub fn write_format(&mut self, format: &ChunkFormat) -> Result<()> {
        self.write_header_record(format.header())
    }

    fn write_header_record(&mut self, header: FileHeader) -> Result<()> {
        if header.compatible_version > header.version {
            warn!(
                "Compatible version {} is newer than format version {}",
                header.compatible_version, header.version
            );
        }

        self.write(&header)?;
        self.cursor.set_header(header);

        debug!(
            "Wrote header {} version {} (compatible {})",
            header.magic(),
            header.version_string(),
            header.compatible_version
        );
        Ok(())
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// Write any fixed-layout value
    pub fn write<T: FixedLayout>(&mut self, value: &T) -> Result<()> {
        value.write_to(self.cursor.get_mut())?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write(&value)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&value)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write(&value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write(&value)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write(&value)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write(&value)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write(&value)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write(&value)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write(&value)
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write(&value)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write(&value)
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.cursor.get_mut().write_all(bytes)?;
        Ok(())
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// UTF-8 string with a maximal length of 2^8 - 1 bytes
    pub fn write_string8(&mut self, s: &str) -> Result<()> {
        self.write_string::<u8, Narrow>(s)
    }

    /// UTF-16 string with a maximal length of 2^8 - 1 units
    pub fn write_wstring8(&mut self, s: &str) -> Result<()> {
        self.write_string::<u8, Wide>(s)
    }

    /// UTF-8 string with a maximal length of 2^16 - 1 bytes
    pub fn write_string16(&mut self, s: &str) -> Result<()> {
        self.write_string::<u16, Narrow>(s)
    }

    /// UTF-16 string with a maximal length of 2^16 - 1 units
    pub fn write_wstring16(&mut self, s: &str) -> Result<()> {
        self.write_string::<u16, Wide>(s)
    }

    /// UTF-8 string with a maximal length of 2^32 - 1 bytes
    pub fn write_string32(&mut self, s: &str) -> Result<()> {
        self.write_string::<u32, Narrow>(s)
    }

    /// UTF-16 string with a maximal length of 2^32 - 1 units
    pub fn write_wstring32(&mut self, s: &str) -> Result<()> {
        self.write_string::<u32, Wide>(s)
    }

    /// Write a length-prefixed string of any prefix width and encoding
    ///
    /// Fails with [`ChunkError::StringTooLong`] before writing anything if the
    /// string has more units than the prefix can represent. The units are
    /// streamed after the prefix without an intermediate copy of the string.
    pub fn write_string<L: LengthPrefix, E: StringEncoding>(&mut self, s: &str) -> Result<()> {
        let len = L::from_len(E::unit_count(s)).ok_or_else(|| ChunkError::StringTooLong {
            preview: preview(s),
            max: L::MAX,
        })?;

        self.write(&len)?;
        E::write_units(s, self.cursor.get_mut())?;
        Ok(())
    }

    // =========================================================================
    // Offset placeholders
    // =========================================================================

    /// Write a 4-byte placeholder to be filled by [`ChunkWriter::resolve_offset`]
    pub fn reserve_offset(&mut self) -> Result<()> {
        let pos = self.cursor.position()?;
        self.write_u32(0)?;
        self.offsets.push(pos);
        Ok(())
    }

    /// Fill the most recently reserved placeholder with the current position
    ///
    /// Returns the value written. Fails with [`ChunkError::EmptyOffsetStack`]
    /// if no placeholder is pending.
    pub fn resolve_offset(&mut self) -> Result<u32> {
        let placeholder = *self.offsets.last().ok_or(ChunkError::EmptyOffsetStack)?;
        let value = to_offset(self.cursor.position()?)?;

        self.patch(placeholder, &value)?;
        self.offsets.pop();

        trace!("Resolved offset at 0x{:08X} -> 0x{:08X}", placeholder, value);
        Ok(value)
    }

    /// Number of reserved offsets not yet resolved
    pub fn pending_offsets(&self) -> usize {
        self.offsets.len()
    }

    // =========================================================================
    // Chunk descriptors
    // =========================================================================

    /// Write a zeroed chunk descriptor for `id` at the current position
    ///
    /// Fails with [`ChunkError::DuplicateChunk`] if `id` was already reserved.
    pub fn reserve_chunk_desc(&mut self, id: u32) -> Result<()> {
        if self.chunks.contains_key(&id) {
            return Err(ChunkError::DuplicateChunk(id));
        }

        let reserved_pos = self.cursor.position()?;
        self.write(&ChunkDesc::zeroed())?;
        self.chunks.insert(id, PendingChunk::new(reserved_pos));
        self.reserved.push(id);
        Ok(())
    }

    /// Mark the current position as the start of chunk `id`'s payload
    ///
    /// Writes nothing; the payload follows through the normal write calls.
    pub fn begin_chunk(&mut self, id: u32) -> Result<()> {
        let mut chunk = self.find_chunk(id)?;
        chunk.offset = Some(to_offset(self.cursor.position()?)?);
        chunk.size = None;
        self.chunks.insert(id, chunk);
        Ok(())
    }

    /// Close chunk `id` at the current position and patch its table entry
    ///
    /// Returns the completed descriptor. Calling it again for the same id
    /// recomputes the size from the then-current position.
    pub fn end_chunk(&mut self, id: u32) -> Result<ChunkDesc> {
        let mut chunk = self.find_chunk(id)?;
        let offset = chunk.offset.ok_or(ChunkError::ChunkNotBegun(id))?;
        let end = to_offset(self.cursor.position()?)?;
        let size = end
            .checked_sub(offset)
            .ok_or(ChunkError::ChunkEndsBeforeStart { id, offset, end })?;

        let desc = ChunkDesc::new(id, offset, size);
        self.patch(chunk.reserved_pos, &desc)?;

        chunk.size = Some(size);
        self.chunks.insert(id, chunk);

        trace!(
            "Chunk {} at 0x{:08X} ({} bytes), entry at 0x{:08X}",
            id, offset, size, chunk.reserved_pos
        );
        Ok(desc)
    }

    /// Write the chunk table: a 32-bit count and one reserved descriptor per id
    ///
    /// All ids are validated before anything is written.
    pub fn write_chunk_table(&mut self, ids: &[u32]) -> Result<()> {
        let count = list_size(ids.len())?;
        let mut seen = HashSet::with_capacity(ids.len());
        for &id in ids {
            if self.chunks.contains_key(&id) || !seen.insert(id) {
                return Err(ChunkError::DuplicateChunk(id));
            }
        }

        self.write_u32(count)?;
        for &id in ids {
            self.reserve_chunk_desc(id)?;
        }

        debug!("Reserved chunk table with {} entries", count);
        Ok(())
    }

    /// Reserved chunk ids whose [`ChunkWriter::end_chunk`] never ran
    pub fn unfinished_chunks(&self) -> Vec<u32> {
        self.reserved
            .iter()
            .copied()
            .filter(|id| self.chunks.get(id).is_some_and(|c| c.size.is_none()))
            .collect()
    }

    /// Current state of chunk `id`'s descriptor; zero where not yet known
    pub fn chunk_desc(&self, id: u32) -> Option<ChunkDesc> {
        self.chunks.get(&id).map(|chunk| chunk.desc(id))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Check that every placeholder was patched, then flush the stream
    ///
    /// Fails with [`ChunkError::Unfinished`] if offsets are still reserved or
    /// chunks were never ended.
    pub fn finish(&mut self) -> Result<()> {
        let chunks = self.unfinished_chunks();
        if !self.offsets.is_empty() || !chunks.is_empty() {
            return Err(ChunkError::Unfinished {
                offsets: self.offsets.len(),
                chunks,
            });
        }

        self.cursor.get_mut().flush()?;
        debug!("Finished chunk file with {} chunks", self.reserved.len());
        Ok(())
    }

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

    fn find_chunk(&self, id: u32) -> Result<PendingChunk> {
        self.chunks
            .get(&id)
            .copied()
            .ok_or(ChunkError::UnknownChunk(id))
    }

    /// Jump to `pos`, overwrite with `value`, jump back
    ///
    /// The saved position is restored even when the overwrite fails, so the
    /// stream never stays parked on the placeholder.
    fn patch<T: FixedLayout>(&mut self, pos: u64, value: &T) -> Result<()> {
        self.cursor.push_and_seek(pos)?;
        let written = self.write(value);
        self.cursor.pop_and_restore()?;
        written
    }
}

impl<W> ChunkWriter<W> {
    pub fn header(&self) -> Option<&FileHeader> {
        self.cursor.header()
    }

    /// `"major.minor"` version of the written header
    pub fn version_string(&self) -> Option<String> {
        self.cursor.version_string()
    }

    pub fn cursor(&self) -> &StreamCursor<W> {
        &self.cursor
    }

    pub fn get_ref(&self) -> &W {
        self.cursor.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.cursor.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.cursor.into_inner()
    }
}

/// 32-bit count of a container, as stored in the format
///
/// Fails with [`ChunkError::ListTooLarge`] if `len` does not fit.
pub fn list_size(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ChunkError::ListTooLarge { len })
}

fn to_offset(pos: u64) -> Result<u32> {
    u32::try_from(pos).map_err(|_| ChunkError::PositionOverflow(pos))
}
