//! Evidence extraction behind scanner findings.
//!
//! The producer stores the request/response pair backing a finding in at least three
//! different record shapes, depending on which subsystem wrote it: as the payload of a
//! byte-string record, as a raw slice preceded by a `(total_len, data_len)` prefix inside
//! some larger container, or behind another layer of list/typed records. Each shape is a
//! [`MessageSource`]; the traversal driver probes all of them at every node and recurses
//! into whatever children the container shapes surface.
//!
//! The driver owns the cycle protection: a visited set keyed by absolute offset and a
//! depth cap of 6. Sources stay stateless.

use rustc_hash::FxHashSet;

use crate::{
    file::ProjectFile,
    http::{
        self, parse_message, request_host_and_path, HttpMessage, METHOD_TOKENS,
    },
    records::{
        pointer_children, read_byte_string_raw, read_compact, read_list_wrapper,
        read_pointer_vector,
    },
    scan::issues::IssueEvidence,
};

/// Bytes examined at a node when probing for a length-prefixed raw message.
const EVIDENCE_SCAN_LEN: usize = 64 * 1024;

/// Upper bound on a single recovered message.
const MAX_EVIDENCE_MESSAGE: u32 = 50 * 1024 * 1024;

/// Traversal depth cap; evidence graphs are shallow in practice and may contain cycles.
const MAX_TRAVERSAL_DEPTH: usize = 6;

/// What a [`MessageSource`] probe may deposit at a node.
#[derive(Default)]
struct ProbeSink {
    /// Messages recovered directly at this node
    messages: Vec<HttpMessage>,
    /// Child offsets for the driver to recurse into
    children: Vec<u64>,
}

/// One way HTTP messages are stored behind an evidence pointer.
trait MessageSource {
    /// Probes `offset` and deposits recovered messages and child offsets.
    fn probe(&self, file: &ProjectFile, offset: u64, sink: &mut ProbeSink);
}

/// Message stored as the payload of a byte-string record.
struct ByteStringSource;

impl MessageSource for ByteStringSource {
    fn probe(&self, file: &ProjectFile, offset: u64, sink: &mut ProbeSink) {
        let Ok(bytes) = read_byte_string_raw(file, offset) else {
            return;
        };
        if bytes.is_empty() {
            return;
        }

        let msg = parse_message(&bytes);
        if !msg.start_line.is_empty() && http::looks_like_start_line(&msg.start_line) {
            sink.messages.push(msg);
        }
    }
}

/// Message stored raw inside an arbitrary container, preceded by a length prefix.
///
/// The node's first 64 KiB are scanned for any start-line token; the 8 bytes before a
/// hit are read as `(total_len, data_len)` and the slice is accepted when the byte-string
/// length invariant holds and the message fits the file.
struct RawPrefixedSource;

impl MessageSource for RawPrefixedSource {
    fn probe(&self, file: &ProjectFile, offset: u64, sink: &mut ProbeSink) {
        let Ok(chunk) = file.read_at(offset, EVIDENCE_SCAN_LEN) else {
            return;
        };
        if chunk.len() < 16 {
            return;
        }

        let Some(start) = earliest_start_token(chunk, true) else {
            return;
        };
        if start < 8 {
            return;
        }

        let total_len = u32::from_be_bytes(chunk[start - 8..start - 4].try_into().unwrap());
        let data_len = u32::from_be_bytes(chunk[start - 4..start].try_into().unwrap());
        if total_len != data_len.wrapping_add(8) || data_len == 0 {
            return;
        }
        if data_len > MAX_EVIDENCE_MESSAGE {
            return;
        }
        if offset + start as u64 + u64::from(data_len) > file.size() {
            return;
        }

        let Ok(data) = file.read_exact_at(offset + start as u64, data_len as usize) else {
            return;
        };

        let msg = parse_message(data);
        if !msg.start_line.is_empty() && http::looks_like_start_line(&msg.start_line) {
            sink.messages.push(msg);
        }
    }
}

/// Messages reached through list wrappers and typed-record pointer fields.
struct ContainerSource;

impl MessageSource for ContainerSource {
    fn probe(&self, file: &ProjectFile, offset: u64, sink: &mut ProbeSink) {
        if let Ok(wrapper) = read_list_wrapper(file, offset) {
            if wrapper.count > 0 {
                if let Ok(mut ptrs) = read_pointer_vector(file, wrapper.vec_ptr) {
                    ptrs.truncate(wrapper.count as usize);
                    sink.children.extend(ptrs);
                }
            }
        }

        if let Ok(record) = read_compact(file, offset) {
            sink.children
                .extend(pointer_children(file, offset, &record.fields));
        }
    }
}

/// Extracts evidence entries behind `evidence_ptr`, plus any host/path recovered from
/// the first request message.
///
/// Returns `(entries, host, request_path)`; all three empty when nothing was found.
pub(crate) fn extract_evidence(
    file: &ProjectFile,
    evidence_ptr: u64,
) -> (Vec<IssueEvidence>, String, String) {
    if !file.contains_pointer(evidence_ptr) {
        return (Vec::new(), String::new(), String::new());
    }

    let mut entry_ptrs = resolve_entry_pointers(file, evidence_ptr);
    if entry_ptrs.is_empty() {
        entry_ptrs.push(evidence_ptr);
    }

    let mut evidence = Vec::new();
    let mut host = String::new();
    let mut path = String::new();

    for entry_ptr in entry_ptrs {
        let (request, response) = resolve_request_response(file, entry_ptr);
        if request.is_none() && response.is_none() {
            continue;
        }

        if host.is_empty() || path.is_empty() {
            let (msg_host, msg_path) = request
                .as_ref()
                .map(request_host_and_path)
                .unwrap_or_default();
            if host.is_empty() {
                host = msg_host;
            }
            if path.is_empty() {
                path = msg_path;
            }
        }

        evidence.push(IssueEvidence { request, response });
    }

    (evidence, host, path)
}

/// The evidence pointer usually addresses a list of per-entry records.
fn resolve_entry_pointers(file: &ProjectFile, evidence_ptr: u64) -> Vec<u64> {
    let Ok(wrapper) = read_list_wrapper(file, evidence_ptr) else {
        return Vec::new();
    };
    if wrapper.count == 0 {
        return Vec::new();
    }

    let Ok(mut ptrs) = read_pointer_vector(file, wrapper.vec_ptr) else {
        return Vec::new();
    };
    ptrs.truncate(wrapper.count as usize);
    ptrs.retain(|&ptr| file.contains_pointer(ptr));
    ptrs
}

/// Walks one evidence entry and keeps the first request and first response found.
fn resolve_request_response(
    file: &ProjectFile,
    entry_ptr: u64,
) -> (Option<HttpMessage>, Option<HttpMessage>) {
    let mut visited = FxHashSet::default();
    let mut messages = Vec::new();
    collect_messages(file, entry_ptr, &mut visited, 0, &mut messages);

    let mut request = None;
    let mut response = None;
    for msg in messages {
        if msg.start_line.is_empty() {
            continue;
        }
        if msg.start_line.starts_with("HTTP/") {
            if response.is_none() {
                response = Some(msg);
            }
            continue;
        }
        if request.is_none() && http::is_method_start(&msg.start_line) {
            request = Some(msg);
        }
    }

    (request, response)
}

/// The traversal driver; owns the visited set and depth cap.
fn collect_messages(
    file: &ProjectFile,
    offset: u64,
    visited: &mut FxHashSet<u64>,
    depth: usize,
    out: &mut Vec<HttpMessage>,
) {
    if depth > MAX_TRAVERSAL_DEPTH || !file.contains_pointer(offset) {
        return;
    }
    if !visited.insert(offset) {
        return;
    }

    const SOURCES: [&dyn MessageSource; 3] =
        [&ByteStringSource, &RawPrefixedSource, &ContainerSource];

    let mut sink = ProbeSink::default();
    for source in SOURCES {
        source.probe(file, offset, &mut sink);
    }

    out.append(&mut sink.messages);
    for child in sink.children {
        collect_messages(file, child, visited, depth + 1, out);
    }
}

/// Position of the earliest start-line token in `chunk`.
fn earliest_start_token(chunk: &[u8], include_responses: bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for pattern in METHOD_TOKENS {
        if let Some(pos) = super::next_index(chunk, 0, pattern) {
            if best.map_or(true, |b| pos < b) {
                best = Some(pos);
            }
        }
    }
    if include_responses {
        if let Some(pos) = super::next_index(chunk, 0, b"HTTP/") {
            if best.map_or(true, |b| pos < b) {
                best = Some(pos);
            }
        }
    }
    best
}

/// Last-resort host/path recovery when the traversal surfaced no request.
///
/// Probes the evidence record itself for a length-prefixed request slice.
pub(crate) fn fallback_host_path(file: &ProjectFile, record_ptr: u64) -> (String, String) {
    if !file.contains_pointer(record_ptr) {
        return (String::new(), String::new());
    }

    let Ok(chunk) = file.read_at(record_ptr, EVIDENCE_SCAN_LEN) else {
        return (String::new(), String::new());
    };
    if chunk.len() < 32 {
        return (String::new(), String::new());
    }

    let Some(method_pos) = earliest_start_token(chunk, false) else {
        return (String::new(), String::new());
    };
    if method_pos < 8 {
        return (String::new(), String::new());
    }

    let total_len = u32::from_be_bytes(chunk[method_pos - 8..method_pos - 4].try_into().unwrap());
    let data_len = u32::from_be_bytes(chunk[method_pos - 4..method_pos].try_into().unwrap());
    if total_len != data_len.wrapping_add(8) || data_len == 0 {
        return (String::new(), String::new());
    }

    let Ok(data) = file.read_at(record_ptr + method_pos as u64, data_len as usize) else {
        return (String::new(), String::new());
    };
    if data.is_empty() {
        return (String::new(), String::new());
    }

    let msg = parse_message(data);
    if msg.start_line.is_empty() {
        return (String::new(), String::new());
    }
    request_host_and_path(&msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_string_record(payload: &[u8]) -> Vec<u8> {
        let mut rec = Vec::new();
        rec.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
        rec.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        rec.extend_from_slice(payload);
        rec
    }

    fn image(records: &[(u64, Vec<u8>)]) -> ProjectFile {
        let end = records
            .iter()
            .map(|(at, bytes)| *at as usize + bytes.len())
            .max()
            .unwrap()
            .max(0x200);
        let mut data = vec![0u8; end];
        data[0..4].copy_from_slice(&ProjectFile::MAGIC.to_be_bytes());
        for (at, bytes) in records {
            data[*at as usize..*at as usize + bytes.len()].copy_from_slice(bytes);
        }
        ProjectFile::from_mem(data).unwrap()
    }

    #[test]
    fn byte_string_message_is_recovered() {
        let req = b"GET /x HTTP/1.1\r\nHost: api.example.com\r\n\r\n";
        let file = image(&[(0x400, byte_string_record(req))]);

        let (evidence, host, path) = extract_evidence(&file, 0x400);
        assert_eq!(evidence.len(), 1);
        assert!(evidence[0].request.is_some());
        assert!(evidence[0].response.is_none());
        assert_eq!(host, "api.example.com");
        assert_eq!(path, "/x");
    }

    #[test]
    fn raw_prefixed_message_is_recovered() {
        // Arbitrary container bytes, then (total_len, data_len) directly before the
        // request text.
        let req = b"GET /raw HTTP/1.1\r\nHost: h\r\n\r\n";
        let mut container = vec![0xEE; 16];
        container.extend_from_slice(&(req.len() as u32 + 8).to_be_bytes());
        container.extend_from_slice(&(req.len() as u32).to_be_bytes());
        container.extend_from_slice(req);
        let file = image(&[(0x400, container)]);

        let (evidence, host, path) = extract_evidence(&file, 0x400);
        assert_eq!(evidence.len(), 1);
        assert_eq!(host, "h");
        assert_eq!(path, "/raw");
    }

    #[test]
    fn cyclic_graph_terminates() {
        // Two compact records whose single pointer field points at each other.
        fn record_pointing_at(target: u64) -> Vec<u8> {
            let mut rec = Vec::new();
            rec.extend_from_slice(&1u16.to_be_bytes()); // type
            rec.extend_from_slice(&1u16.to_be_bytes()); // field count
            rec.push(0x00);
            rec.extend_from_slice(&0x07u16.to_be_bytes());
            rec.extend_from_slice(&target.to_be_bytes());
            rec
        }
        let file = image(&[
            (0x400, record_pointing_at(0x500)),
            (0x500, record_pointing_at(0x400)),
        ]);

        let (evidence, host, path) = extract_evidence(&file, 0x400);
        assert!(evidence.is_empty());
        assert!(host.is_empty() && path.is_empty());
    }

    #[test]
    fn non_interior_pointer_yields_nothing() {
        let file = image(&[(0x400, byte_string_record(b"GET / HTTP/1.1\r\n\r\n"))]);
        let (evidence, ..) = extract_evidence(&file, 0);
        assert!(evidence.is_empty());
    }

    #[test]
    fn fallback_probe_recovers_host() {
        let req = b"GET /fb?x=1 HTTP/1.1\r\nHost: fallback.example\r\n\r\n";
        let mut container = vec![0xEE; 24];
        container.extend_from_slice(&(req.len() as u32 + 8).to_be_bytes());
        container.extend_from_slice(&(req.len() as u32).to_be_bytes());
        container.extend_from_slice(req);
        let file = image(&[(0x400, container)]);

        let (host, path) = fallback_host_path(&file, 0x400);
        assert_eq!(host, "fallback.example");
        assert_eq!(path, "/fb?x=1");
    }
}
