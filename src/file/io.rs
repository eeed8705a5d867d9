//! Low-level byte order and safe reading utilities for project-file parsing.
//!
//! This module provides the [`WireIO`] trait for safe reading of primitive types from byte
//! slices. The project-file container stores every multi-byte integer big-endian, so only
//! big-endian readers are exposed. It is used throughout the file and record modules to
//! ensure correct parsing of binary structures.

use crate::{Error::ShortRead, Result};

/// Trait for implementing type specific safe readers
///
/// This trait abstracts over reading primitive types from byte slices in a safe way.
/// It is implemented for all integer widths that occur in the project-file layout.
pub trait WireIO: Sized {
    #[allow(missing_docs)]
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

impl WireIO for u8 {
    type Bytes = [u8; 1];

    fn from_be_bytes(bytes: Self::Bytes) -> Self {
        u8::from_be_bytes(bytes)
    }
}

impl WireIO for u16 {
    type Bytes = [u8; 2];

    fn from_be_bytes(bytes: Self::Bytes) -> Self {
        u16::from_be_bytes(bytes)
    }
}

impl WireIO for u32 {
    type Bytes = [u8; 4];

    fn from_be_bytes(bytes: Self::Bytes) -> Self {
        u32::from_be_bytes(bytes)
    }
}

impl WireIO for u64 {
    type Bytes = [u8; 8];

    fn from_be_bytes(bytes: Self::Bytes) -> Self {
        u64::from_be_bytes(bytes)
    }
}

/// Generic method to safely read T in big-endian from a data stream. Currently T can be
/// u8, u16, u32 and u64
///
/// ## Arguments
/// * 'data' - The data buffer / stream to read from
///
/// # Errors
/// Returns [`ShortRead`] if the buffer is smaller than the requested type
pub fn read_be<T: WireIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Generic method to safely read T from an offset and in big-endian from a data stream.
///
/// ## Arguments
/// * 'data'    - The data buffer / stream to read from
/// * 'offset'  - An offset to read from, will be advanced by the amount of bytes read
///
/// # Errors
/// Returns [`ShortRead`] if reading would exceed the data length
pub fn read_be_at<T: WireIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    if (type_len + *offset) > data.len() {
        return Err(ShortRead {
            offset: *offset as u64,
            wanted: type_len,
            got: data.len().saturating_sub(*offset),
        });
    }

    let Ok(read) = data[*offset..*offset + type_len].try_into() else {
        return Err(ShortRead {
            offset: *offset as u64,
            wanted: type_len,
            got: 0,
        });
    };

    *offset += type_len;

    Ok(T::from_be_bytes(read))
}
