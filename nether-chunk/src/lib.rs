//! Nether-Chunk: versioned chunk container format for Nethercore content files
//!
//! Content files (games, scenes) are stored as a header, a table of chunk
//! descriptors, and the chunk payloads. This crate reads and writes that
//! container on top of any seekable byte stream; it never interprets the
//! payloads themselves.
//!
//! # Layout
//!
//! ```text
//! FileHeader : u32 magic | u16 version | u16 compatible_version | u32 flags
//! ChunkTable : u32 count | { u32 id | u32 offset | u32 size } * count
//! Payloads   : arbitrary, located through the table
//! ```
//!
//! All integers are little-endian. Strings are stored with an 8, 16 or
//! 32-bit length prefix followed by UTF-8 bytes (narrow) or UTF-16LE units
//! (wide).
//!
//! # Compatibility
//!
//! Every file declares the version it was written with and the oldest reader
//! version able to read it. A reader requesting an older version than that is
//! rejected when the header is read.
//!
//! # Usage
//!
//! ```
//! use std::io::Cursor;
//! use nether_chunk::{ChunkReader, ChunkWriter};
//!
//! let mut writer = ChunkWriter::new(Cursor::new(Vec::new()));
//! writer.write_header("TEST", 103, 100, 0)?;
//! writer.write_chunk_table(&[1])?;
//! writer.begin_chunk(1)?;
//! writer.write_string8("hello")?;
//! writer.end_chunk(1)?;
//! writer.finish()?;
//!
//! let mut reader = ChunkReader::new(Cursor::new(writer.into_inner().into_inner()));
//! reader.read_header("TEST", 100)?;
//! assert_eq!(reader.version_string().as_deref(), Some("1.03"));
//! reader.read_chunk_table()?;
//! reader.locate_chunk(1)?;
//! assert_eq!(reader.read_string8()?, "hello");
//! # Ok::<(), nether_chunk::ChunkError>(())
//! ```

mod cursor;
mod error;
mod format;
mod layout;
mod reader;
mod strings;
mod version;
mod writer;

pub use cursor::StreamCursor;
pub use error::{ChunkError, ErrorKind, Result};
pub use format::{ChunkDesc, ChunkFormat, FileHeader, Magic};
pub use layout::{FixedLayout, from_bytes, to_bytes};
pub use reader::ChunkReader;
pub use strings::{LengthPrefix, Narrow, PREVIEW_CHARS, StringEncoding, Wide};
pub use version::version_string;
pub use writer::{ChunkWriter, list_size};

// =============================================================================
// Constants
// =============================================================================

/// Encoded size of [`FileHeader`]
pub const HEADER_SIZE: usize = 12;

/// Encoded size of [`ChunkDesc`]
pub const CHUNK_DESC_SIZE: usize = 12;

/// Encoded size of an offset placeholder
pub const OFFSET_SIZE: usize = 4;

/// Byte offset of the chunk table when it directly follows the header
pub const CHUNK_TABLE_OFFSET: u64 = HEADER_SIZE as u64;

/// Encoded size of a chunk table with `count` entries, including its count
pub const fn chunk_table_size(count: usize) -> usize {
    4 + count * CHUNK_DESC_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(HEADER_SIZE, std::mem::size_of::<FileHeader>());
        assert_eq!(CHUNK_DESC_SIZE, std::mem::size_of::<ChunkDesc>());
        assert_eq!(OFFSET_SIZE, std::mem::size_of::<u32>());
    }

    #[test]
    fn test_chunk_table_size() {
        assert_eq!(chunk_table_size(0), 4);
        assert_eq!(chunk_table_size(2), 28);
    }
}
