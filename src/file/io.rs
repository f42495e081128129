//! Big-endian primitive reads and writes for bytecode streams.
//!
//! JVM-style method code stores every multi-byte operand in big-endian order. The
//! [`CodeIO`] trait abstracts over the integer widths that occur in instruction operands so
//! that [`crate::file::parser::Parser`] and [`crate::assembly::InstructionEncoder`] can share
//! one bounds-checked implementation.

use crate::Result;

/// Integer types that can appear as instruction operands.
pub trait CodeIO: Sized + Copy {
    /// Fixed-size byte representation of the type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode from big-endian bytes.
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Encode to big-endian bytes.
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_code_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl CodeIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_code_io!(u8 => 1, i8 => 1, u16 => 2, i16 => 2, u32 => 4, i32 => 4);

/// Safely reads a value of type `T` in big-endian byte order from `data` at `offset`.
///
/// On success the offset is advanced past the value.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: CodeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
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

    Ok(T::from_be_bytes(read))
}

/// Overwrites the bytes at `offset` with the big-endian encoding of `value`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into the buffer.
pub fn write_be_at<T: CodeIO>(data: &mut [u8], offset: usize, value: T) -> Result<()> {
    let bytes = value.to_be_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[offset..end].copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_be_advances() {
        let data = [0x12, 0x34, 0xFF, 0xFE];
        let mut offset = 0;

        assert_eq!(read_be_at::<u16>(&data, &mut offset).unwrap(), 0x1234);
        assert_eq!(offset, 2);
        assert_eq!(read_be_at::<i16>(&data, &mut offset).unwrap(), -2);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_be_out_of_bounds() {
        let data = [0x00, 0x01, 0x02];
        let mut offset = 0;

        assert!(read_be_at::<u32>(&data, &mut offset).is_err());
        assert_eq!(offset, 0);
    }

    #[test]
    fn write_be_in_place() {
        let mut data = [0u8; 6];

        write_be_at::<i32>(&mut data, 1, -8).unwrap();
        assert_eq!(data, [0x00, 0xFF, 0xFF, 0xFF, 0xF8, 0x00]);

        assert!(write_be_at::<u16>(&mut data, 5, 1).is_err());
    }
}
