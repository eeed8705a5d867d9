//! HTTP request/response locator.
//!
//! Plaintext HTTP traffic is embedded in the container without explicit record lengths,
//! so requests are found by scanning for method tokens and pairs are delimited
//! heuristically: `Content-Length` when present and plausible, otherwise the next
//! message boundary, otherwise a hard cap. Termination is best-effort by design - the
//! producer never recorded where these slices end.
//!
//! A method token inside a header or body is almost always preceded by `\n` (or sits in
//! NUL padding), while a real record start is preceded by the container's framing bytes.
//! The preceding-byte check below rejects the former without any knowledge of the
//! framing itself.

use crate::{
    file::ProjectFile,
    http::{content_length_of, METHOD_TOKENS, RESPONSE_TOKEN},
    scan::{next_index, scan_windows},
};
use rustc_hash::FxHashSet;

/// Per-record read used to delimit one request/response pair.
const RECORD_WINDOW: usize = 128 * 1024;

/// Scan-window overlap; the longest method token plus its space is 8 bytes.
const TOKEN_OVERLAP: usize = 20;

/// Request bodies above this are assumed to be a misparsed `Content-Length`.
const MAX_REQUEST_BODY: usize = 100_000;

/// Response bodies above this fall back to boundary-based delimiting.
const MAX_RESPONSE_BODY: usize = 500_000;

/// Hard cap on a response body when no boundary is found.
const FALLBACK_RESPONSE_BODY: usize = 50_000;

/// Location of one request/response pair inside the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpRecordLocation {
    /// Absolute offset of the request start
    pub request_offset: u64,
    /// Delimited request length in bytes
    pub request_len: u32,
    /// Absolute offset of the response start, 0 when none was found
    pub response_offset: u64,
    /// Delimited response length in bytes, 0 when none was found
    pub response_len: u32,
}

/// Scans the whole file for request/response pairs.
///
/// Results are deduplicated and returned in ascending request offset, which downstream
/// consumers rely on as the entry ordering.
#[must_use]
pub fn scan_http_records(file: &ProjectFile) -> Vec<HttpRecordLocation> {
    let mut offsets = Vec::new();
    let mut seen = FxHashSet::default();

    scan_windows(file, TOKEN_OVERLAP, |window_offset, data| {
        for pattern in METHOD_TOKENS {
            let mut idx = 0;
            while let Some(pos) = next_index(data, idx, pattern) {
                if accept_hit(data, pos) {
                    let absolute = window_offset + pos as u64;
                    if seen.insert(absolute) {
                        offsets.push(absolute);
                    }
                }
                idx = pos + pattern.len();
            }
        }
    });

    offsets.sort_unstable();

    offsets
        .into_iter()
        .filter_map(|offset| {
            let loc = delimit_record(file, offset);
            (loc.request_len > 0).then_some(loc)
        })
        .collect()
}

/// The preceding-byte predicate for a method-token hit at `pos`.
///
/// Accepted at the very start of the scan buffer, or when at least 8 bytes in and the
/// byte before the token is neither a line feed nor NUL (i.e. framing, not text).
fn accept_hit(data: &[u8], pos: usize) -> bool {
    if pos == 0 {
        return true;
    }
    pos >= 8 && data[pos - 1] != b'\n' && data[pos - 1] != 0
}

/// Delimits the request starting at `offset` and pairs it with a following response.
fn delimit_record(file: &ProjectFile, offset: u64) -> HttpRecordLocation {
    let mut loc = HttpRecordLocation {
        request_offset: offset,
        ..HttpRecordLocation::default()
    };

    let Ok(data) = file.read_at(offset, RECORD_WINDOW) else {
        return loc;
    };
    if data.len() < 10 {
        return loc;
    }

    let request_end = find_request_end(data).unwrap_or_else(|| 1024.min(data.len()));
    loc.request_len = request_end as u32;

    let search_start = request_end;
    if search_start + 10 > data.len() {
        return loc;
    }

    if let Some(resp_idx) = next_index(data, search_start, RESPONSE_TOKEN) {
        let resp_data = &data[resp_idx..];
        if let Some(resp_end) = find_response_end(resp_data) {
            loc.response_offset = offset + resp_idx as u64;
            loc.response_len = resp_end as u32;
        }
    }

    loc
}

/// End of the request slice: header block plus a plausible `Content-Length` body.
fn find_request_end(data: &[u8]) -> Option<usize> {
    let Some(idx) = next_index(data, 0, b"\r\n\r\n") else {
        // LF-only captures keep just their header block.
        return next_index(data, 0, b"\n\n").map(|idx| idx + 2);
    };

    let header_end = idx + 4;
    let content_length = content_length_of(&String::from_utf8_lossy(&data[..idx]));

    if content_length > 0 && content_length < MAX_REQUEST_BODY {
        let body_end = header_end + content_length;
        if body_end <= data.len() {
            return Some(body_end);
        }
    }

    Some(header_end)
}

/// End of the response slice: `Content-Length`, next message boundary, or hard cap.
fn find_response_end(data: &[u8]) -> Option<usize> {
    let Some(idx) = next_index(data, 0, b"\r\n\r\n") else {
        return next_index(data, 0, b"\n\n").map(|idx| idx + 2);
    };

    let header_end = idx + 4;
    let content_length = content_length_of(&String::from_utf8_lossy(&data[..idx]));

    if content_length > 0 && content_length < MAX_RESPONSE_BODY {
        let body_end = header_end + content_length;
        if body_end <= data.len() {
            return Some(body_end);
        }
        return Some(data.len());
    }

    // No usable length: cut at the next request or response start.
    let search_data = &data[header_end..];
    let mut next_start: Option<usize> = None;
    for pattern in METHOD_TOKENS {
        if let Some(pos) = next_index(search_data, 0, pattern) {
            if pos > 0 && next_start.map_or(true, |best| pos < best) {
                next_start = Some(pos);
            }
        }
    }
    if let Some(pos) = next_index(search_data, 0, RESPONSE_TOKEN) {
        if pos > 0 && next_start.map_or(true, |best| pos < best) {
            next_start = Some(pos);
        }
    }

    if let Some(pos) = next_start {
        return Some(header_end + pos);
    }

    if search_data.len() < FALLBACK_RESPONSE_BODY {
        Some(data.len())
    } else {
        Some(header_end + FALLBACK_RESPONSE_BODY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(extra: &[u8]) -> ProjectFile {
        let mut data = vec![0u8; ProjectFile::HEADER_SIZE as usize];
        data[0..4].copy_from_slice(&ProjectFile::MAGIC.to_be_bytes());
        data.extend_from_slice(extra);
        ProjectFile::from_mem(data).unwrap()
    }

    #[test]
    fn finds_request_at_scan_start() {
        let file = image(b"GET /foo HTTP/1.1\r\nHost: example.com\r\n\r\n");
        let locs = scan_http_records(&file);

        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].request_offset, 256);
        assert_eq!(locs[0].request_len, 40);
        assert_eq!(locs[0].response_len, 0);
    }

    #[test]
    fn pairs_request_with_response() {
        let req = b"POST /a?b=1 HTTP/1.1\r\nHost: h:8443\r\nContent-Length: 3\r\n\r\nabc";
        let resp = b"HTTP/1.1 201 Created\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 2\r\n\r\nok";
        let mut extra = Vec::new();
        extra.extend_from_slice(req);
        extra.extend_from_slice(resp);
        let file = image(&extra);

        let locs = scan_http_records(&file);
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].request_len as usize, req.len());
        assert_eq!(locs[0].response_offset, 256 + req.len() as u64);
        assert_eq!(locs[0].response_len as usize, resp.len());
    }

    #[test]
    fn token_after_newline_is_rejected() {
        // A method token inside a body, preceded by '\n', must not start a record.
        let mut extra = Vec::new();
        extra.extend_from_slice(&[0xAB; 8]); // framing noise
        extra.extend_from_slice(b"GET /real HTTP/1.1\r\nHost: a\r\n\r\n");
        extra.extend_from_slice(b"some text\nGET /fake HTTP/1.1 embedded");
        let file = image(&extra);

        let locs = scan_http_records(&file);
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].request_offset, 256 + 8);
    }

    #[test]
    fn token_in_nul_padding_is_rejected() {
        let mut extra = vec![0u8; 32];
        extra.extend_from_slice(b"GET /padded HTTP/1.1\r\nHost: a\r\n\r\n");
        let file = image(&extra);

        // preceded by NUL and not at buffer start: dropped
        assert!(scan_http_records(&file).is_empty());
    }

    #[test]
    fn locations_ascend_and_deduplicate() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&[0xAB; 8]);
        extra.extend_from_slice(b"POST /b HTTP/1.1\r\nHost: a\r\n\r\n");
        extra.extend_from_slice(&[0xAB; 8]);
        extra.extend_from_slice(b"GET /a HTTP/1.1\r\nHost: a\r\n\r\n");
        let file = image(&extra);

        let locs = scan_http_records(&file);
        assert_eq!(locs.len(), 2);
        assert!(locs[0].request_offset < locs[1].request_offset);
        // POST first in the file even though GET is scanned first
        assert_eq!(locs[0].request_offset, 264);
    }

    #[test]
    fn response_without_content_length_cut_at_next_request() {
        let req1 = b"GET /one HTTP/1.1\r\nHost: a\r\n\r\n";
        let resp = b"HTTP/1.1 200 OK\r\nServer: x\r\n\r\nbody-bytes-go-here";
        let req2 = b"GET /two HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut extra = Vec::new();
        extra.extend_from_slice(req1);
        extra.extend_from_slice(resp);
        extra.extend_from_slice(&[0xAB; 4]);
        extra.extend_from_slice(req2);
        let file = image(&extra);

        let locs = scan_http_records(&file);
        assert_eq!(locs.len(), 2);
        // response ends where the next request token begins (plus framing)
        let end = locs[0].response_offset + locs[0].response_len as u64;
        assert_eq!(end, 256 + req1.len() as u64 + resp.len() as u64 + 4);
    }

    #[test]
    fn oversized_content_length_is_ignored() {
        let req =
            b"POST /big HTTP/1.1\r\nHost: a\r\nContent-Length: 2000000\r\n\r\npartial body";
        let file = image(req);

        let locs = scan_http_records(&file);
        assert_eq!(locs.len(), 1);
        // body not trusted; slice ends at the header block
        let headers_len = req.len() - "partial body".len();
        assert_eq!(locs[0].request_len as usize, headers_len);
    }
}
