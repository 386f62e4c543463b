//! Fixed records of the chunk file format
//!
//! ```text
//! FileHeader : u32 magic | u16 version | u16 compatible_version | u32 flags  (12 bytes)
//! ChunkDesc  : u32 id    | u32 offset  | u32 size                           (12 bytes)
//! ```
//!
//! Both records are `#[repr(C)]` and derive [`bytemuck::Pod`], which fails to
//! compile if a field change ever introduces padding. Encoding itself is
//! explicit little-endian through [`FixedLayout`], field by field.

use std::fmt;
use std::io::{self, Read, Write};

use bytemuck::{Pod, Zeroable};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};
use crate::layout::FixedLayout;
use crate::version::version_string;
use crate::{CHUNK_DESC_SIZE, HEADER_SIZE};

const _: () = assert!(std::mem::size_of::<FileHeader>() == HEADER_SIZE);
const _: () = assert!(std::mem::size_of::<ChunkDesc>() == CHUNK_DESC_SIZE);

// =============================================================================
// Magic
// =============================================================================

/// 4-byte file signature, e.g. `"TEST"`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct Magic([u8; 4]);

impl Magic {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Parse a magic string; it must be exactly 4 bytes long
    pub fn parse(magic: &str) -> Result<Self> {
        let bytes: [u8; 4] = magic
            .as_bytes()
            .try_into()
            .map_err(|_| ChunkError::InvalidMagicLength { len: magic.len() })?;
        Ok(Self(bytes))
    }

    /// Unpack from the stored 32-bit value
    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Pack the 4 raw bytes as a 32-bit value
    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0.escape_ascii())
    }
}

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Magic({self})")
    }
}

impl TryFrom<String> for Magic {
    type Error = ChunkError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Magic> for String {
    fn from(magic: Magic) -> Self {
        String::from_utf8_lossy(&magic.0).into_owned()
    }
}

// =============================================================================
// FileHeader
// =============================================================================

/// File header, written once right after the stream is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct FileHeader {
    /// Packed 4-byte signature
    pub magic: u32,
    /// Version the file was written with
    pub version: u16,
    /// Oldest reader version able to read this file
    pub compatible_version: u16,
    /// Format-specific flags
    pub flags: u32,
}

impl FileHeader {
    pub fn new(magic: Magic, version: u16, compatible_version: u16, flags: u32) -> Self {
        Self {
            magic: magic.to_u32(),
            version,
            compatible_version,
            flags,
        }
    }

    pub fn magic(&self) -> Magic {
        Magic::from_u32(self.magic)
    }

    /// `"major.minor"` form of [`FileHeader::version`]
    pub fn version_string(&self) -> String {
        version_string(self.version)
    }

    /// Whether a reader at `requested_version` may read this file
    pub fn is_readable_by(&self, requested_version: u16) -> bool {
        requested_version >= self.compatible_version
    }
}

impl FixedLayout for FileHeader {
    const SIZE: usize = HEADER_SIZE;

    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_u32::<LittleEndian>(self.magic)?;
        out.write_u16::<LittleEndian>(self.version)?;
        out.write_u16::<LittleEndian>(self.compatible_version)?;
        out.write_u32::<LittleEndian>(self.flags)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        Ok(Self {
            magic: input.read_u32::<LittleEndian>()?,
            version: input.read_u16::<LittleEndian>()?,
            compatible_version: input.read_u16::<LittleEndian>()?,
            flags: input.read_u32::<LittleEndian>()?,
        })
    }
}

// =============================================================================
// ChunkDesc
// =============================================================================

/// Entry of the chunk table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkDesc {
    /// Chunk id, unique within a file
    pub id: u32,
    /// Absolute stream position of the payload
    pub offset: u32,
    /// Payload length in bytes
    pub size: u32,
}

impl ChunkDesc {
    pub fn new(id: u32, offset: u32, size: u32) -> Self {
        Self { id, offset, size }
    }

    /// Absolute stream position one past the payload
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

impl FixedLayout for ChunkDesc {
    const SIZE: usize = CHUNK_DESC_SIZE;

    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_u32::<LittleEndian>(self.id)?;
        out.write_u32::<LittleEndian>(self.offset)?;
        out.write_u32::<LittleEndian>(self.size)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        Ok(Self {
            id: input.read_u32::<LittleEndian>()?,
            offset: input.read_u32::<LittleEndian>()?,
            size: input.read_u32::<LittleEndian>()?,
        })
    }
}

// =============================================================================
// ChunkFormat
// =============================================================================

/// Format descriptor: everything needed to write or validate a header
///
/// Content formats declare one of these as a constant, tools load it from a
/// manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFormat {
    /// File signature
    pub magic: Magic,
    /// Current format version
    pub version: u16,
    /// Oldest reader version able to read files of this version
    pub compatible_version: u16,
    /// Header flags
    #[serde(default)]
    pub flags: u32,
}

impl ChunkFormat {
    pub const fn new(magic: &[u8; 4], version: u16, compatible_version: u16) -> Self {
        Self {
            magic: Magic::from_bytes(*magic),
            version,
            compatible_version,
            flags: 0,
        }
    }

    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Header a writer emits for this format
    pub fn header(&self) -> FileHeader {
        FileHeader::new(self.magic, self.version, self.compatible_version, self.flags)
    }

    /// `"major.minor"` form of [`ChunkFormat::version`]
    pub fn version_string(&self) -> String {
        version_string(self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::layout::{from_bytes, to_bytes};

    #[test]
    fn test_magic_parse() {
        let magic = Magic::parse("TEST").unwrap();
        assert_eq!(magic.as_bytes(), b"TEST");
        assert_eq!(magic.to_u32(), u32::from_le_bytes(*b"TEST"));
        assert_eq!(Magic::from_u32(magic.to_u32()), magic);
    }

    #[test]
    fn test_magic_wrong_length() {
        for bad in ["", "ABC", "ABCDE"] {
            let err = Magic::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        // 4 characters but 5 bytes
        assert!(Magic::parse("ÄBCD").is_err());
    }

    #[test]
    fn test_magic_display_escapes() {
        assert_eq!(Magic::from_bytes(*b"TEST").to_string(), "'TEST'");
        assert_eq!(Magic::from_bytes([b'A', 0, b'B', 0xFF]).to_string(), "'A\\x00B\\xff'");
    }

    #[test]
    fn test_header_layout() {
        let header = FileHeader::new(Magic::from_bytes(*b"TEST"), 103, 100, 0xAABB_CCDD);
        let bytes = to_bytes(&header).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"TEST");
        assert_eq!(&bytes[4..6], &103u16.to_le_bytes());
        assert_eq!(&bytes[6..8], &100u16.to_le_bytes());
        assert_eq!(&bytes[8..12], &0xAABB_CCDDu32.to_le_bytes());
        assert_eq!(from_bytes::<FileHeader>(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_compatibility() {
        let header = FileHeader::new(Magic::from_bytes(*b"TEST"), 103, 100, 0);
        assert!(header.is_readable_by(100));
        assert!(header.is_readable_by(200));
        assert!(!header.is_readable_by(99));
        assert_eq!(header.version_string(), "1.03");
    }

    #[test]
    fn test_chunk_desc_layout() {
        let desc = ChunkDesc::new(7, 0x40, 10);
        let bytes = to_bytes(&desc).unwrap();
        assert_eq!(bytes.len(), CHUNK_DESC_SIZE);
        assert_eq!(&bytes[0..4], &7u32.to_le_bytes());
        assert_eq!(from_bytes::<ChunkDesc>(&bytes).unwrap(), desc);
        assert_eq!(desc.end(), 0x4A);
        assert_eq!(ChunkDesc::zeroed(), ChunkDesc::default());
    }

    #[test]
    fn test_chunk_format_from_toml() {
        let format: ChunkFormat = toml::from_str(
            r#"
            magic = "SCNE"
            version = 210
            compatible_version = 200
            "#,
        )
        .unwrap();
        assert_eq!(format, ChunkFormat::new(b"SCNE", 210, 200));
        assert_eq!(format.version_string(), "2.10");

        let bad = toml::from_str::<ChunkFormat>(
            r#"
            magic = "SCENE"
            version = 1
            compatible_version = 1
            "#,
        );
        assert!(bad.is_err());
    }
}
