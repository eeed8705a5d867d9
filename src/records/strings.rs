//! String-record decoders.
//!
//! The container stores strings in two unrelated layouts. Byte-string records carry an
//! 8-byte `(total_len, byte_len)` header and a raw payload; they hold issue paths and
//! evidence bodies. Wide-string records carry UTF-16BE code units behind one of three
//! header shapes; they hold display strings such as issue locations, task names, and
//! repeater tab titles.
//!
//! On-disk pointers to wide-string records are unreliable by two bytes in either
//! direction, depending on which subsystem produced them. Every wide-string read
//! therefore probes the bases `p`, `p + 2`, `p - 2` in that order; the constant header
//! prefixes make false positives impossible, so probing is safe. A debug diagnostic is
//! emitted when a non-primary base decodes.

use widestring::U16Str;

use crate::{file::ProjectFile, Error::LimitExceeded, Result};

/// Constant prefix of a framed wide-string record, first shape.
pub(crate) const WIDE_V1_PREFIX: [u8; 12] = [
    0x00, 0x02, 0x00, 0x00, 0x0a, 0x01, 0x00, 0x12, 0x00, 0x00, 0x00, 0x00,
];

/// Descriptor bytes of a framed wide-string record, second shape.
pub(crate) const WIDE_V2_DESC: [u8; 6] = [0x00, 0x00, 0x0a, 0x01, 0x00, 0x12];

/// Wide-string records longer than this are rejected as corrupt.
const MAX_WIDE_CHARS: u32 = 1_000_000;

/// Decodes the payload of a byte-string record, with trailing NULs stripped.
///
/// Layout: `total_len: u32`, `byte_len: u32`, then `byte_len` payload bytes.
/// Invariant: `total_len == 8 + byte_len`.
///
/// # Errors
/// Returns an error when the pointer is not interior, the header cannot be read, or the
/// length invariant does not hold.
pub fn read_byte_string_raw(file: &ProjectFile, ptr: u64) -> Result<Vec<u8>> {
    if !file.contains_pointer(ptr) {
        return Err(invariant_error!("byte-string pointer 0x{:x} not interior", ptr));
    }

    let total_len = file.read_u32_at(ptr)?;
    let byte_len = file.read_u32_at(ptr + 4)?;
    if total_len != byte_len.wrapping_add(8) {
        return Err(invariant_error!(
            "byte-string length invariant: total={} bytes={}",
            total_len,
            byte_len
        ));
    }

    if byte_len == 0 {
        return Ok(Vec::new());
    }

    let mut data = file.read_exact_at(ptr + 8, byte_len as usize)?.to_vec();
    while data.last() == Some(&0) {
        data.pop();
    }
    Ok(data)
}

/// Decodes a byte-string record as text.
///
/// Convenience wrapper over [`read_byte_string_raw`]; invalid UTF-8 sequences are
/// replaced, which only affects binary payloads that callers should fetch raw anyway.
///
/// # Errors
/// Same failure modes as [`read_byte_string_raw`].
pub fn read_byte_string(file: &ProjectFile, ptr: u64) -> Result<String> {
    Ok(String::from_utf8_lossy(&read_byte_string_raw(file, ptr)?).into_owned())
}

/// Decodes a framed wide-string record, tolerating the ±2 pointer shift.
///
/// At each candidate base the first shape (32-byte prefix with `total_len: u64` at 20 and
/// `char_len: u32` at 28) is tried, then the second (30-byte prefix with a leading
/// `u32 == 2` field count, `total_len: u64` at 0x12 and `char_len: u32` at 0x1a). Both
/// share the invariant `total_len == 8 + 2 * char_len`. A well-formed empty record
/// decodes to an empty string.
///
/// # Errors
/// Returns the last failure when no candidate base decodes under either shape.
pub fn read_wide_string(file: &ProjectFile, ptr: u64) -> Result<String> {
    let mut last_err = invariant_error!("wide-string pointer 0x{:x} undecodable", ptr);

    for start in candidate_bases(ptr) {
        if !file.contains_pointer(start) {
            continue;
        }

        match try_framed_v1(file, start) {
            Ok(s) => {
                diagnose_shifted_base(ptr, start, "v1");
                return Ok(s);
            }
            Err(err) => last_err = err,
        }

        match try_framed_v2(file, start) {
            Ok(s) => {
                diagnose_shifted_base(ptr, start, "v2");
                return Ok(s);
            }
            Err(err) => last_err = err,
        }
    }

    Err(last_err)
}

/// Decodes a fixed-32 wide-string record, tolerating the ±2 pointer shift.
///
/// This shape has the 8-byte header `total_len == 0x48`, `char_len == 0x20` followed by
/// exactly 64 payload bytes; it is used for repeater tab names and task scope strings.
///
/// # Errors
/// Returns an error when no candidate base carries the fixed header.
pub fn read_fixed32_wide_string(file: &ProjectFile, ptr: u64) -> Result<String> {
    for start in candidate_bases(ptr) {
        if !file.contains_pointer(start) {
            continue;
        }

        let Ok(total_len) = file.read_u32_at(start) else {
            continue;
        };
        let Ok(char_len) = file.read_u32_at(start + 4) else {
            continue;
        };
        if total_len != 0x48 || char_len != 0x20 {
            continue;
        }

        let Ok(data) = file.read_exact_at(start + 8, char_len as usize * 2) else {
            continue;
        };
        diagnose_shifted_base(ptr, start, "fixed-32");
        return Ok(decode_utf16be(data));
    }

    Err(invariant_error!(
        "fixed-32 wide-string pointer 0x{:x} undecodable",
        ptr
    ))
}

fn candidate_bases(ptr: u64) -> [u64; 3] {
    [ptr, ptr.wrapping_add(2), ptr.wrapping_sub(2)]
}

fn diagnose_shifted_base(ptr: u64, base: u64, shape: &str) {
    if base != ptr {
        log::debug!(
            "wide-string pointer 0x{ptr:x} decoded as {shape} at shifted base 0x{base:x}"
        );
    }
}

fn try_framed_v1(file: &ProjectFile, start: u64) -> Result<String> {
    const HEADER_LEN: usize = 32;

    let header = file.read_exact_at(start, HEADER_LEN)?;
    if header[..WIDE_V1_PREFIX.len()] != WIDE_V1_PREFIX {
        return Err(crate::Error::SignatureMismatch { offset: start });
    }

    let total_len = u64::from_be_bytes(header[20..28].try_into().unwrap());
    let char_len = u32::from_be_bytes(header[28..32].try_into().unwrap());
    read_wide_payload(file, start + HEADER_LEN as u64, total_len, char_len)
}

fn try_framed_v2(file: &ProjectFile, start: u64) -> Result<String> {
    const HEADER_LEN: usize = 0x1e;

    let header = file.read_exact_at(start, HEADER_LEN)?;
    if u32::from_be_bytes(header[0..4].try_into().unwrap()) != 2 {
        return Err(crate::Error::SignatureMismatch { offset: start });
    }
    if header[4..10] != WIDE_V2_DESC {
        return Err(crate::Error::SignatureMismatch { offset: start });
    }

    let total_len = u64::from_be_bytes(header[0x12..0x1a].try_into().unwrap());
    let char_len = u32::from_be_bytes(header[0x1a..0x1e].try_into().unwrap());
    read_wide_payload(file, start + HEADER_LEN as u64, total_len, char_len)
}

fn read_wide_payload(
    file: &ProjectFile,
    payload_at: u64,
    total_len: u64,
    char_len: u32,
) -> Result<String> {
    if total_len != 8 + u64::from(char_len) * 2 {
        return Err(invariant_error!(
            "wide-string length invariant: total={} chars={}",
            total_len,
            char_len
        ));
    }
    if char_len == 0 {
        return Ok(String::new());
    }
    if char_len > MAX_WIDE_CHARS {
        return Err(LimitExceeded {
            what: "wide-string char count",
            value: u64::from(char_len),
            limit: u64::from(MAX_WIDE_CHARS),
        });
    }

    let data = file.read_exact_at(payload_at, char_len as usize * 2)?;
    Ok(decode_utf16be(data))
}

/// Decodes big-endian UTF-16 bytes up to the first NUL code unit.
///
/// An odd trailing byte is ignored; unpaired surrogates are replaced.
pub(crate) fn decode_utf16be(data: &[u8]) -> String {
    let mut units = Vec::with_capacity(data.len() / 2);
    for pair in data.chunks_exact(2) {
        let unit = u16::from_be_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }

    if units.is_empty() {
        return String::new();
    }
    U16Str::from_slice(&units).to_string_lossy()
}
