//! Error types for chunk file reading and writing

use std::io;

use crate::format::Magic;

/// Errors that can occur when reading or writing chunk files
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// Magic string passed by the caller is not exactly 4 bytes
    #[error("Magic 'number' must have 4 characters, got {len} bytes")]
    InvalidMagicLength { len: usize },

    /// String is too long for the chosen length prefix
    #[error("String \"{preview}\"... is too long, maximal size is {max}")]
    StringTooLong { preview: String, max: u64 },

    /// Container length does not fit into a 32-bit count
    #[error("Container exceeded maximal size for the chunk file format: {len} entries")]
    ListTooLarge { len: usize },

    /// Chunk id was already reserved in this session
    #[error("ID for chunk description is already occupied: {0}")]
    DuplicateChunk(u32),

    /// Chunk id was never reserved in this session
    #[error("ID for chunk description has not been reserved: {0}")]
    UnknownChunk(u32),

    /// Stream position does not fit into a 32-bit offset field
    #[error("Stream position 0x{0:X} exceeds the 32-bit offset range of the chunk file format")]
    PositionOverflow(u64),

    /// Stored magic differs from the expected one
    #[error("Invalid magic number: expected {expected}, found {found}")]
    MagicMismatch { expected: Magic, found: Magic },

    /// Reader is older than the oldest version the file supports
    #[error("Requested format version {requested} is too old (file requires at least {compatible})")]
    IncompatibleVersion { requested: u16, compatible: u16 },

    /// Chunk table lists the same id twice
    #[error("Chunk table contains duplicate ID {0}")]
    DuplicateChunkInTable(u32),

    /// String payload is not valid UTF-8 / UTF-16
    #[error("String at offset 0x{offset:X} is not valid {encoding}")]
    InvalidString {
        offset: u64,
        encoding: &'static str,
    },

    /// `pop_and_restore` without a matching `push_and_seek`
    #[error("Can not restore position with empty stack")]
    EmptyPositionStack,

    /// `resolve_offset` without a matching `reserve_offset`
    #[error("Can not resolve offset with empty stack")]
    EmptyOffsetStack,

    /// `end_chunk` before `begin_chunk`
    #[error("Chunk {0} has not been begun")]
    ChunkNotBegun(u32),

    /// `end_chunk` called at a position before the chunk's payload start
    #[error("Chunk {id} ends at 0x{end:X}, before its payload start 0x{offset:X}")]
    ChunkEndsBeforeStart { id: u32, offset: u32, end: u32 },

    /// Session closed with placeholders still unpatched
    #[error("Session closed with {offsets} unresolved offset(s) and unfinished chunk(s) {chunks:?}")]
    Unfinished { offsets: usize, chunks: Vec<u32> },

    /// IO error reported by the underlying stream
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Broad classification of [`ChunkError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-side misuse detectable without I/O
    InvalidArgument,
    /// Stream content violates the format contract
    Format,
    /// Reserve/resolve or push/pop calls were not paired
    InvalidState,
    /// Failure of the underlying stream
    Io,
}

impl ChunkError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMagicLength { .. }
            | Self::StringTooLong { .. }
            | Self::ListTooLarge { .. }
            | Self::DuplicateChunk(_)
            | Self::UnknownChunk(_)
            | Self::PositionOverflow(_) => ErrorKind::InvalidArgument,
            Self::MagicMismatch { .. }
            | Self::IncompatibleVersion { .. }
            | Self::DuplicateChunkInTable(_)
            | Self::InvalidString { .. } => ErrorKind::Format,
            Self::EmptyPositionStack
            | Self::EmptyOffsetStack
            | Self::ChunkNotBegun(_)
            | Self::ChunkEndsBeforeStart { .. }
            | Self::Unfinished { .. } => ErrorKind::InvalidState,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ChunkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ChunkError::InvalidMagicLength { len: 3 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(ChunkError::UnknownChunk(7).kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            ChunkError::IncompatibleVersion {
                requested: 1,
                compatible: 2
            }
            .kind(),
            ErrorKind::Format
        );
        assert_eq!(ChunkError::EmptyOffsetStack.kind(), ErrorKind::InvalidState);
        let io = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(ChunkError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_io_error_is_transparent() {
        let err = ChunkError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"));
        assert_eq!(err.to_string(), "short read");
        match err {
            ChunkError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_string_too_long_message() {
        let err = ChunkError::StringTooLong {
            preview: "aaaaaaaaaa".to_string(),
            max: 255,
        };
        assert_eq!(
            err.to_string(),
            "String \"aaaaaaaaaa\"... is too long, maximal size is 255"
        );
    }
}
