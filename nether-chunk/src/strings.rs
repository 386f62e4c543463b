//! Length-prefixed string encodings
//!
//! A stored string is a length prefix of 8, 16 or 32 bits followed by that
//! many character units. Narrow strings store UTF-8 bytes (1 byte per unit),
//! wide strings store UTF-16LE code units (2 bytes per unit). The reader and
//! writer route all six variants through one generic algorithm parameterized
//! by [`LengthPrefix`] and [`StringEncoding`].

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::layout::FixedLayout;

/// Number of characters of an oversized string quoted in error messages
pub const PREVIEW_CHARS: usize = 10;

/// UTF-16 units encoded per `write_all` when streaming wide strings
const WIDE_BATCH: usize = 256;

/// Integer type used as a string length prefix
pub trait LengthPrefix: FixedLayout {
    /// Largest length representable by this prefix
    const MAX: u64;

    /// Narrow a unit count, or `None` if it does not fit
    fn from_len(len: usize) -> Option<Self>;

    fn to_len(&self) -> usize;
}

macro_rules! impl_length_prefix {
    ($($ty:ty),*) => {
        $(
            impl LengthPrefix for $ty {
                const MAX: u64 = <$ty>::MAX as u64;

                fn from_len(len: usize) -> Option<Self> {
                    <$ty>::try_from(len).ok()
                }

                fn to_len(&self) -> usize {
                    *self as usize
                }
            }
        )*
    };
}

impl_length_prefix!(u8, u16, u32);

/// Character width of a stored string
pub trait StringEncoding {
    /// Bytes per character unit
    const UNIT_SIZE: usize;

    /// Encoding name used in error messages
    const NAME: &'static str;

    /// Number of units `s` occupies
    fn unit_count(s: &str) -> usize;

    /// Stream the encoded units of `s` to `out`
    fn write_units<W: Write + ?Sized>(s: &str, out: &mut W) -> io::Result<()>;

    /// Decode stored units, or `None` if they are malformed
    fn decode(bytes: Vec<u8>) -> Option<String>;
}

/// 8-bit characters (UTF-8 bytes)
#[derive(Debug, Clone, Copy)]
pub enum Narrow {}

/// 16-bit characters (UTF-16LE code units)
#[derive(Debug, Clone, Copy)]
pub enum Wide {}

impl StringEncoding for Narrow {
    const UNIT_SIZE: usize = 1;
    const NAME: &'static str = "UTF-8";

    fn unit_count(s: &str) -> usize {
        s.len()
    }

    fn write_units<W: Write + ?Sized>(s: &str, out: &mut W) -> io::Result<()> {
        out.write_all(s.as_bytes())
    }

    fn decode(bytes: Vec<u8>) -> Option<String> {
        String::from_utf8(bytes).ok()
    }
}

impl StringEncoding for Wide {
    const UNIT_SIZE: usize = 2;
    const NAME: &'static str = "UTF-16";

    fn unit_count(s: &str) -> usize {
        s.encode_utf16().count()
    }

    fn write_units<W: Write + ?Sized>(s: &str, out: &mut W) -> io::Result<()> {
        let mut units = [0u16; WIDE_BATCH];
        let mut bytes = [0u8; WIDE_BATCH * 2];
        let mut source = s.encode_utf16();

        loop {
            let mut filled = 0;
            for (slot, unit) in units.iter_mut().zip(source.by_ref()) {
                *slot = unit;
                filled += 1;
            }
            if filled == 0 {
                return Ok(());
            }

            let encoded = &mut bytes[..filled * 2];
            LittleEndian::write_u16_into(&units[..filled], encoded);
            out.write_all(encoded)?;
        }
    }

    fn decode(bytes: Vec<u8>) -> Option<String> {
        if bytes.len() % 2 != 0 {
            return None;
        }
        let mut units = vec![0u16; bytes.len() / 2];
        LittleEndian::read_u16_into(&bytes, &mut units);
        String::from_utf16(&units).ok()
    }
}

/// First [`PREVIEW_CHARS`] characters of `s`
pub(crate) fn preview(s: &str) -> String {
    s.chars().take(PREVIEW_CHARS).collect()
}
