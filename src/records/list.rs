//! List-wrapper and pointer-vector decoders.
//!
//! Collections in the container are stored as a two-part structure: a fixed-shape list
//! wrapper carrying an element count and a pointer to the backing storage, and a pointer
//! vector holding `capacity` u64 slots. The effective length of a list is the wrapper
//! count; `capacity >= count` always holds in well-formed files and the callers truncate
//! the vector accordingly.

use crate::{
    file::ProjectFile,
    Error::{LimitExceeded, SignatureMismatch},
    Result,
};

/// Signature opening every list-wrapper record.
pub(crate) const LIST_WRAPPER_SIG: [u8; 10] =
    [0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x0a, 0x01, 0x00, 0x0e];

/// Pointer vectors larger than this are rejected as corrupt.
const MAX_VECTOR_CAPACITY: u32 = 1_000_000;

/// A decoded list wrapper.
#[derive(Debug, Clone, Copy)]
pub struct ListWrapper {
    /// Number of live elements in the list
    pub count: u32,
    /// Pointer to the backing pointer-vector record
    pub vec_ptr: u64,
}

/// Reads the list wrapper at `ptr`.
///
/// Layout: the 10-byte signature, `count: u32` at offset 10, `vec_ptr: u64` at offset 14.
///
/// # Errors
/// Returns [`SignatureMismatch`] when the constant prefix is absent and an invariant
/// error when the vector pointer is not interior.
pub fn read_list_wrapper(file: &ProjectFile, ptr: u64) -> Result<ListWrapper> {
    let buf = file.read_exact_at(ptr, 22)?;
    if buf[..LIST_WRAPPER_SIG.len()] != LIST_WRAPPER_SIG {
        return Err(SignatureMismatch { offset: ptr });
    }

    let count = u32::from_be_bytes(buf[10..14].try_into().unwrap());
    let vec_ptr = u64::from_be_bytes(buf[14..22].try_into().unwrap());
    if !file.contains_pointer(vec_ptr) {
        return Err(invariant_error!(
            "list wrapper at 0x{:x} has non-interior vector pointer 0x{:x}",
            ptr,
            vec_ptr
        ));
    }

    Ok(ListWrapper { count, vec_ptr })
}

/// Reads the pointer vector at `ptr`.
///
/// Layout: `total_len: u32`, `capacity: u32`, then `capacity` big-endian u64 slots.
/// Invariant: `total_len == 8 + 8 * capacity`.
///
/// # Errors
/// Returns an error when the capacity is zero or above 1 000 000 or the length
/// invariant does not hold.
pub fn read_pointer_vector(file: &ProjectFile, ptr: u64) -> Result<Vec<u64>> {
    let total_len = file.read_u32_at(ptr)?;
    let capacity = file.read_u32_at(ptr + 4)?;

    if capacity == 0 {
        return Err(invariant_error!("pointer vector at 0x{:x} with zero capacity", ptr));
    }
    if capacity > MAX_VECTOR_CAPACITY {
        return Err(LimitExceeded {
            what: "pointer vector capacity",
            value: u64::from(capacity),
            limit: u64::from(MAX_VECTOR_CAPACITY),
        });
    }

    let expected_total = 8 + capacity as u64 * 8;
    if u64::from(total_len) != expected_total {
        return Err(invariant_error!(
            "pointer vector length invariant: total={} expected={}",
            total_len,
            expected_total
        ));
    }

    let data = file.read_exact_at(ptr + 8, capacity as usize * 8)?;
    let ptrs = data
        .chunks_exact(8)
        .map(|chunk| u64::from_be_bytes(chunk.try_into().unwrap()))
        .collect();

    Ok(ptrs)
}
