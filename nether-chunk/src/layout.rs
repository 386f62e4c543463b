//! Fixed-width little-endian encoding
//!
//! Every value the chunk format stores directly (integers, floats, booleans
//! and the fixed 12-byte records) goes through [`FixedLayout`], so the reader
//! and writer need a single generic `read`/`write` path.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;

/// A value with a fixed encoded size and little-endian byte layout
pub trait FixedLayout: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Write exactly `SIZE` bytes to `out`
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()>;

    /// Read exactly `SIZE` bytes from `input`
    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self>;
}

macro_rules! impl_fixed_layout {
    ($($ty:ty => $read:ident, $write:ident);* $(;)?) => {
        $(
            impl FixedLayout for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
                    out.$write::<LittleEndian>(*self)
                }

                #[inline]
                fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
                    input.$read::<LittleEndian>()
                }
            }
        )*
    };
}

impl_fixed_layout! {
    u16 => read_u16, write_u16;
    i16 => read_i16, write_i16;
    u32 => read_u32, write_u32;
    i32 => read_i32, write_i32;
    u64 => read_u64, write_u64;
    i64 => read_i64, write_i64;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
}

impl FixedLayout for u8 {
    const SIZE: usize = 1;

    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(*self)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        input.read_u8()
    }
}

impl FixedLayout for i8 {
    const SIZE: usize = 1;

    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_i8(*self)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        input.read_i8()
    }
}

impl FixedLayout for bool {
    const SIZE: usize = 1;

    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(u8::from(*self))
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        Ok(input.read_u8()? != 0)
    }
}

/// Encode a value into a freshly allocated buffer
pub fn to_bytes<T: FixedLayout>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(T::SIZE);
    value.write_to(&mut out)?;
    Ok(out)
}

/// Decode a value from the start of `bytes`
///
/// Fails with an `UnexpectedEof` I/O error if `bytes` is shorter than `SIZE`.
pub fn from_bytes<T: FixedLayout>(mut bytes: &[u8]) -> Result<T> {
    Ok(T::read_from(&mut bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_integer_layout_is_little_endian() {
        assert_eq!(to_bytes(&0x1234_5678u32).unwrap(), [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(to_bytes(&0xBEEFu16).unwrap(), [0xEF, 0xBE]);
        assert_eq!(to_bytes(&-2i16).unwrap(), [0xFE, 0xFF]);
        assert_eq!(
            from_bytes::<u32>(&[0x78, 0x56, 0x34, 0x12]).unwrap(),
            0x1234_5678
        );
    }

    #[test]
    fn test_sizes_match_encoding() {
        assert_eq!(<u8 as FixedLayout>::SIZE, 1);
        assert_eq!(<i64 as FixedLayout>::SIZE, 8);
        assert_eq!(<f32 as FixedLayout>::SIZE, 4);
        assert_eq!(<bool as FixedLayout>::SIZE, 1);
        assert_eq!(to_bytes(&7u64).unwrap().len(), <u64 as FixedLayout>::SIZE);
        assert_eq!(to_bytes(&-7i8).unwrap().len(), <i8 as FixedLayout>::SIZE);
    }

    #[test]
    fn test_bool() {
        assert_eq!(to_bytes(&true).unwrap(), [1]);
        assert_eq!(to_bytes(&false).unwrap(), [0]);
        assert!(from_bytes::<bool>(&[7]).unwrap());
        assert!(!from_bytes::<bool>(&[0]).unwrap());
    }

    #[test]
    fn test_float_bits_preserved() {
        let bytes = to_bytes(&-1.5f64).unwrap();
        assert_eq!(from_bytes::<f64>(&bytes).unwrap(), -1.5);
        assert!(from_bytes::<f32>(&to_bytes(&f32::NAN).unwrap()).unwrap().is_nan());
    }

    #[test]
    fn test_short_input() {
        let err = from_bytes::<u32>(&[1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
