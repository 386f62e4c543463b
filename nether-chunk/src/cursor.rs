//! Stream position bookkeeping shared by [`ChunkReader`](crate::ChunkReader)
//! and [`ChunkWriter`](crate::ChunkWriter)
//!
//! Back-patching always follows the same jump-write-jump-back triple:
//! [`StreamCursor::push_and_seek`] to the placeholder, write, then
//! [`StreamCursor::pop_and_restore`].

use std::io::{Seek, SeekFrom};

use crate::error::{ChunkError, Result};
use crate::format::FileHeader;
use crate::version::version_string;

/// Owned stream plus a LIFO stack of saved positions and the session header
#[derive(Debug)]
pub struct StreamCursor<S> {
    stream: S,
    stack: Vec<u64>,
    header: Option<FileHeader>,
}

impl<S: Seek> StreamCursor<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            stack: Vec::new(),
            header: None,
        }
    }

    /// Current stream offset
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    /// Move to an absolute stream offset
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Save the current position, seek to `pos`, and return the saved position
    pub fn push_and_seek(&mut self, pos: u64) -> Result<u64> {
        let previous = self.position()?;
        self.seek_to(pos)?;
        self.stack.push(previous);
        Ok(previous)
    }

    /// Seek back to the most recently saved position
    ///
    /// Fails with [`ChunkError::EmptyPositionStack`] when push and pop calls
    /// are unbalanced.
    pub fn pop_and_restore(&mut self) -> Result<()> {
        let pos = self.stack.pop().ok_or(ChunkError::EmptyPositionStack)?;
        self.seek_to(pos)
    }

    /// Number of saved positions
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl<S> StreamCursor<S> {
    /// Header of this session, once read or written
    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    pub(crate) fn set_header(&mut self, header: FileHeader) {
        self.header = Some(header);
    }

    /// `"major.minor"` form of the session header's version
    pub fn version_string(&self) -> Option<String> {
        self.header.map(|h| version_string(h.version))
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::format::Magic;
    use std::io::Cursor;

    fn cursor() -> StreamCursor<Cursor<Vec<u8>>> {
        StreamCursor::new(Cursor::new(vec![0u8; 64]))
    }

    #[test]
    fn test_seek_and_position() {
        let mut c = cursor();
        assert_eq!(c.position().unwrap(), 0);
        c.seek_to(20).unwrap();
        assert_eq!(c.position().unwrap(), 20);
    }

    #[test]
    fn test_push_returns_previous_position() {
        let mut c = cursor();
        c.seek_to(10).unwrap();
        let previous = c.push_and_seek(40).unwrap();
        assert_eq!(previous, 10);
        assert_eq!(c.position().unwrap(), 40);
        assert_eq!(c.depth(), 1);

        c.pop_and_restore().unwrap();
        assert_eq!(c.position().unwrap(), 10);
        assert_eq!(c.depth(), 0);
    }

    #[test]
    fn test_nested_push_pop_is_lifo() {
        let mut c = cursor();
        c.seek_to(5).unwrap();
        c.push_and_seek(15).unwrap();
        c.push_and_seek(25).unwrap();
        c.pop_and_restore().unwrap();
        assert_eq!(c.position().unwrap(), 15);
        c.pop_and_restore().unwrap();
        assert_eq!(c.position().unwrap(), 5);
    }

    #[test]
    fn test_pop_empty_stack() {
        let mut c = cursor();
        let err = c.pop_and_restore().unwrap_err();
        assert!(matches!(err, ChunkError::EmptyPositionStack));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_version_string_requires_header() {
        let mut c = cursor();
        assert_eq!(c.version_string(), None);
        c.set_header(FileHeader::new(Magic::from_bytes(*b"TEST"), 7, 1, 0));
        assert_eq!(c.version_string().as_deref(), Some("0.07"));
    }
}
