//! Typed-record header decoders.
//!
//! A typed record opens with a header that enumerates its fields: each descriptor is three
//! bytes, `(field_id: u8, field_offset: u16)`, with offsets measured from the start of the
//! record. Two header dialects exist. The compact dialect carries a `u16` record type and a
//! `u16` field count; it is used for scanner issues, their index entries, and UI tasks. The
//! wide dialect carries only a `u32` field count; it is used for the container records that
//! task scope strings hang off.
//!
//! Both dialects share the validation rules: a positive, bounded field count, a first field
//! offset equal to the header length, and non-decreasing offsets. Violations reject the
//! record, which is how signature-scan false positives are filtered out.

use crate::{
    file::{parser::Parser, ProjectFile},
    Error::LimitExceeded,
    Result,
};

/// Maximum field count accepted in a compact typed record.
const MAX_COMPACT_FIELDS: u16 = 256;

/// Maximum field count accepted in a wide typed record.
const MAX_WIDE_FIELDS: u32 = 10_000;

/// Typed-record reads larger than this are rejected when following pointer fields.
const MAX_RECORD_READ: usize = 64 * 1024;

/// One field descriptor of a typed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDesc {
    /// Field id, unique within the record
    pub id: u8,
    /// Offset of the field value from the start of the record
    pub offset: u16,
}

/// A decoded compact typed-record header.
#[derive(Debug, Clone)]
pub struct CompactRecord {
    /// The record type tag; selects the interpretation of the fields
    pub record_type: u16,
    /// Field descriptors in on-disk order
    pub fields: Vec<FieldDesc>,
}

/// A decoded wide typed-record header (no type tag).
#[derive(Debug, Clone)]
pub struct WideRecord {
    /// Field descriptors in on-disk order
    pub fields: Vec<FieldDesc>,
}

impl CompactRecord {
    /// Returns the in-record offset of the field with the given id.
    #[must_use]
    pub fn field_offset(&self, id: u8) -> Option<u16> {
        field_offset(&self.fields, id)
    }
}

impl WideRecord {
    /// Returns the in-record offset of the field with the given id.
    #[must_use]
    pub fn field_offset(&self, id: u8) -> Option<u16> {
        field_offset(&self.fields, id)
    }
}

fn field_offset(fields: &[FieldDesc], id: u8) -> Option<u16> {
    fields.iter().find(|f| f.id == id).map(|f| f.offset)
}

/// Reads a compact typed-record header at `ptr`.
///
/// # Errors
/// Returns an error when the field count is zero or above 256, the descriptor table
/// cannot be read, the first offset does not equal the header length, or offsets
/// decrease.
pub fn read_compact(file: &ProjectFile, ptr: u64) -> Result<CompactRecord> {
    let header = file.read_exact_at(ptr, 4)?;
    let mut cursor = Parser::new(header);
    let record_type = cursor.read_be::<u16>()?;
    let field_count = cursor.read_be::<u16>()?;

    if field_count == 0 {
        return Err(invariant_error!("typed record with zero fields at 0x{:x}", ptr));
    }
    if field_count > MAX_COMPACT_FIELDS {
        return Err(LimitExceeded {
            what: "compact typed-record field count",
            value: u64::from(field_count),
            limit: u64::from(MAX_COMPACT_FIELDS),
        });
    }

    let fields = read_descriptors(file, ptr, u32::from(field_count))?;
    Ok(CompactRecord {
        record_type,
        fields,
    })
}

/// Reads a wide typed-record header at `ptr`.
///
/// # Errors
/// Same validation as [`read_compact`], with the field count widened to `u32` and capped
/// at 10 000.
pub fn read_wide(file: &ProjectFile, ptr: u64) -> Result<WideRecord> {
    let field_count = file.read_u32_at(ptr)?;

    if field_count == 0 {
        return Err(invariant_error!("wide record with zero fields at 0x{:x}", ptr));
    }
    if field_count > MAX_WIDE_FIELDS {
        return Err(LimitExceeded {
            what: "wide typed-record field count",
            value: u64::from(field_count),
            limit: u64::from(MAX_WIDE_FIELDS),
        });
    }

    let fields = read_descriptors(file, ptr, field_count)?;
    Ok(WideRecord { fields })
}

fn read_descriptors(file: &ProjectFile, ptr: u64, field_count: u32) -> Result<Vec<FieldDesc>> {
    let desc_len = field_count as usize * 3;
    let desc = file.read_exact_at(ptr + 4, desc_len)?;
    let header_len = 4 + desc_len as u32;

    let mut cursor = Parser::new(desc);
    let mut fields = Vec::with_capacity(field_count as usize);
    let mut prev = 0u16;
    for i in 0..field_count {
        let id = cursor.read_be::<u8>()?;
        let offset = cursor.read_be::<u16>()?;
        if u32::from(offset) < header_len {
            return Err(invariant_error!(
                "field 0x{:02x} offset 0x{:x} inside header of length 0x{:x}",
                id,
                offset,
                header_len
            ));
        }
        if i == 0 && u32::from(offset) != header_len {
            return Err(invariant_error!(
                "first field offset 0x{:x}, header length 0x{:x}",
                offset,
                header_len
            ));
        }
        if offset < prev {
            return Err(invariant_error!(
                "field offsets not ascending at field 0x{:02x}",
                id
            ));
        }
        prev = offset;
        fields.push(FieldDesc { id, offset });
    }

    Ok(fields)
}

/// Reads every field of a typed record as a u64 pointer, keeping the interior ones.
///
/// Unknown record shapes are followed this way during evidence extraction: any field
/// holding a plausible pointer becomes a child to visit. Fields that do not pass the
/// pointer predicate are skipped silently.
#[must_use]
pub fn pointer_children(file: &ProjectFile, ptr: u64, fields: &[FieldDesc]) -> Vec<u64> {
    let Some(max_offset) = fields.iter().map(|f| f.offset as usize).max() else {
        return Vec::new();
    };

    let read_len = max_offset + 8;
    if read_len > MAX_RECORD_READ {
        return Vec::new();
    }

    let Ok(buf) = file.read_exact_at(ptr, read_len) else {
        return Vec::new();
    };

    let mut ptrs = Vec::new();
    for field in fields {
        let off = field.offset as usize;
        if off + 8 > buf.len() {
            continue;
        }
        let value = u64::from_be_bytes(buf[off..off + 8].try_into().unwrap());
        if file.contains_pointer(value) {
            ptrs.push(value);
        }
    }
    ptrs
}
