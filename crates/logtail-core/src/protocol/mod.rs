//! Wire Primitives
//!
//! This module provides the reader/writer pair every LogTail value is encoded
//! with, plus the `WireValue` trait for fixed-layout values.
//!
//! ## Encoding Rules
//!
//! - All integers are little-endian
//! - Fixed-layout values are written field by field with no padding
//! - Variable-length sections are always preceded by an explicit u32 length
//!
//! ## Sticky Errors
//!
//! Both `ProtocolWriter` and `ProtocolReader` keep the first error they hit.
//! Later writes become no-ops and later reads return that same error, so an
//! encoder can emit a sequence of fields and check once at the end.
//!
//! ## Zero-Copy
//!
//! The reader owns its receive buffer as `Bytes`; `read_bytes` hands out a
//! counted slice of it instead of a copy. The writer can link caller-owned
//! `Bytes` into its output (`write_without_copy`) instead of duplicating them.
//!
//! ## Example
//! ```ignore
//! let mut writer = ProtocolWriter::new();
//! writer.write(&7u32);
//! writer.write_without_copy(&Bytes::from_static(b"data"));
//! let bytes = writer.finish()?;
//!
//! let mut reader = ProtocolReader::new(bytes);
//! let len: u32 = reader.read()?;
//! let data = reader.read_bytes(4)?;
//! reader.finish()?;
//! ```

mod reader;
mod writer;

pub use reader::ProtocolReader;
pub use writer::ProtocolWriter;

use bytes::{Buf, BufMut};

/// A value with a fixed little-endian wire layout
pub trait WireValue: Sized {
    /// Encoded size in bytes
    const WIRE_SIZE: usize;

    fn put(&self, buf: &mut impl BufMut);

    /// Decode from `buf`, which holds at least `WIRE_SIZE` bytes.
    fn get(buf: &mut impl Buf) -> Self;
}

macro_rules! impl_wire_scalar {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl WireValue for $ty {
                const WIRE_SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put(&self, buf: &mut impl BufMut) {
                    buf.$put(*self);
                }

                #[inline]
                fn get(buf: &mut impl Buf) -> Self {
                    buf.$get()
                }
            }
        )*
    };
}

impl_wire_scalar! {
    u8 => put_u8, get_u8;
    u16 => put_u16_le, get_u16_le;
    u32 => put_u32_le, get_u32_le;
    u64 => put_u64_le, get_u64_le;
    i64 => put_i64_le, get_i64_le;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_scalar_sizes() {
        assert_eq!(<u8 as WireValue>::WIRE_SIZE, 1);
        assert_eq!(<u16 as WireValue>::WIRE_SIZE, 2);
        assert_eq!(<u32 as WireValue>::WIRE_SIZE, 4);
        assert_eq!(<u64 as WireValue>::WIRE_SIZE, 8);
        assert_eq!(<i64 as WireValue>::WIRE_SIZE, 8);
    }

    #[test]
    fn test_scalars_are_little_endian() {
        let mut buf = BytesMut::new();
        0x0102_0304u32.put(&mut buf);
        (-2i64).put(&mut buf);

        assert_eq!(&buf[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[4..], &[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

        let mut cursor = &buf[..];
        assert_eq!(u32::get(&mut cursor), 0x0102_0304);
        assert_eq!(i64::get(&mut cursor), -2);
    }
}
