//! Little-endian primitive reads over byte buffers.
//!
//! CodeView symbol records are stored little-endian throughout, so this module only offers the
//! little-endian half of the usual endian-aware helpers. Everything is bounds-checked and
//! reports [`crate::Error::OutOfBounds`] instead of panicking on truncated input.
//!
//! # Key Components
//!
//! - [`crate::file::io::ByteIO`] - Conversion from a fixed-size byte array into a primitive
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//!
//! # Examples
//!
//! ```rust,ignore
//! use pdbscope::file::io::read_le_at;
//!
//! // S_END record: length 2, kind 0x0006
//! let data = [0x02, 0x00, 0x06, 0x00];
//! let mut offset = 0;
//!
//! let length: u16 = read_le_at(&data, &mut offset)?;
//! let kind: u16 = read_le_at(&data, &mut offset)?;
//! assert_eq!((length, kind, offset), (2, 6, 4));
//! # Ok::<(), pdbscope::Error>(())
//! ```

use crate::Result;

/// Primitive types which can be decoded from their little-endian byte representation.
///
/// The associated `Bytes` array has exactly `size_of::<Self>()` elements, which is what
/// [`read_le_at`] relies on when slicing the input buffer.
pub trait ByteIO: Sized {
    /// Fixed-size byte array holding the encoded value
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decode `Self` from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_byte_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_byte_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Reads a value of type `T` in little-endian byte order at `offset`, advancing the offset
/// by the size of `T` on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value would extend past the end of `data`.
/// The offset is left untouched in that case.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_u16() {
        let result = read_le_at::<u16>(&TEST_BUFFER, &mut 0).unwrap();
        assert_eq!(result, 0x0201);
    }

    #[test]
    fn read_le_u32() {
        let result = read_le_at::<u32>(&TEST_BUFFER, &mut 0).unwrap();
        assert_eq!(result, 0x0403_0201);
    }

    #[test]
    fn read_le_i64() {
        let result = read_le_at::<i64>(&TEST_BUFFER, &mut 0).unwrap();
        assert_eq!(result, 0x0807060504030201);
    }

    #[test]
    fn read_le_f32() {
        let data = 1.5f32.to_le_bytes();
        assert_eq!(read_le_at::<f32>(&data, &mut 0).unwrap(), 1.5);
    }

    #[test]
    fn read_le_at_advances() {
        let mut offset = 2;
        let value: u16 = read_le_at(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(value, 0x0403);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_le_at_out_of_bounds_keeps_offset() {
        let mut offset = 6;
        let result = read_le_at::<u32>(&TEST_BUFFER, &mut offset);
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }
}
