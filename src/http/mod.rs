//! HTTP message parsing and entry assembly.
//!
//! The container stores HTTP traffic as plaintext slices with no record framing of its
//! own, so this module works on byte slices that the locators have already delimited. A
//! slice is split into start line, header multimap, and body; request/response pairs are
//! then lifted into [`HttpEntry`] values carrying the derived fields (host, port, URL,
//! status, mime type) that every downstream consumer keys on.
//!
//! Parsing here is deliberately forgiving: missing headers leave defaults in place and
//! never fail the entry. The byte slices come out of a heuristic scan over a proprietary
//! container; a strict parser would reject half of real-world captures.

mod message;

pub use message::{parse_message, Headers, HttpMessage};

/// The request-line tokens the locators anchor on, longest first not required.
pub(crate) const METHOD_TOKENS: [&[u8]; 7] = [
    b"GET ", b"POST ", b"PUT ", b"DELETE ", b"PATCH ", b"HEAD ", b"OPTIONS ",
];

/// Token opening every HTTP response start line.
pub(crate) const RESPONSE_TOKEN: &[u8] = b"HTTP/1.";

/// One parsed request/response pair from the proxy history.
///
/// The id is the absolute file offset of the request, which is stable across re-opens of
/// the same file and is what all ordering guarantees are expressed in.
#[derive(Debug, Clone, Default)]
pub struct HttpEntry {
    /// Absolute file offset of the request; doubles as the stable entry id
    pub id: u64,
    /// Host from the `Host` header, without any port suffix
    pub host: String,
    /// Port from the `Host` header; 80 when the header carries none, 0 without a host
    pub port: u16,
    /// Protocol token from the request line (e.g. `HTTP/1.1`)
    pub protocol: String,
    /// Request method
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// Query string without the leading `?`, empty when absent
    pub query_string: String,
    /// URL reconstructed from host, port, path and query
    pub url: String,
    /// Status code of the response, 0 when no response was captured
    pub status_code: u16,
    /// Value of the response `Content-Length` header, 0 when absent
    pub content_length: u64,
    /// Response `Content-Type` with parameters stripped
    pub mime_type: String,
    /// The parsed request message
    pub request: Option<HttpMessage>,
    /// The parsed response message, if one followed the request
    pub response: Option<HttpMessage>,
}

/// Assembles an [`HttpEntry`] from delimited request/response slices.
///
/// Either slice may be absent or garbled; whatever fields can be derived are filled in
/// and the rest keep their defaults.
#[must_use]
pub fn build_entry(id: u64, request: Option<&[u8]>, response: Option<&[u8]>) -> HttpEntry {
    let mut entry = HttpEntry {
        id,
        ..HttpEntry::default()
    };

    if let Some(data) = request {
        let msg = parse_message(data);
        apply_request_line(&mut entry, &msg.start_line);
        apply_host_header(&mut entry, &msg.headers);
        entry.request = Some(msg);
    }

    if let Some(data) = response {
        let msg = parse_message(data);
        apply_status_line(&mut entry, &msg.start_line);
        apply_content_headers(&mut entry, &msg.headers);
        entry.response = Some(msg);
    }

    build_url(&mut entry);
    entry
}

/// Returns true when the line starts with one of the request-method tokens.
#[must_use]
pub fn is_method_start(line: &str) -> bool {
    METHOD_TOKENS
        .iter()
        .any(|token| line.as_bytes().starts_with(token))
}

/// Returns true when the line opens an HTTP message in either direction.
#[must_use]
pub fn looks_like_start_line(line: &str) -> bool {
    line.starts_with("HTTP/") || is_method_start(line)
}

/// Parses the leading decimal digits of `s`, ignoring anything after them.
pub(crate) fn leading_int(s: &str) -> u64 {
    let mut n = 0u64;
    for c in s.bytes() {
        if c.is_ascii_digit() {
            n = n.saturating_mul(10).saturating_add(u64::from(c - b'0'));
        } else {
            break;
        }
    }
    n
}

/// Lifts host and path (with query) out of a parsed request message.
///
/// Returns empty strings when the message is not a request.
pub(crate) fn request_host_and_path(msg: &HttpMessage) -> (String, String) {
    if msg.start_line.is_empty() || !is_method_start(&msg.start_line) {
        return (String::new(), String::new());
    }

    let mut entry = HttpEntry::default();
    apply_request_line(&mut entry, &msg.start_line);
    apply_host_header(&mut entry, &msg.headers);

    let mut path = entry.path;
    if !entry.query_string.is_empty() {
        path.push('?');
        path.push_str(&entry.query_string);
    }
    (entry.host, path)
}

/// Extracts a `Content-Length` value from a raw header block.
///
/// Used by the locators to delimit bodies before any message is parsed.
pub(crate) fn content_length_of(header_block: &str) -> usize {
    const NAME: &[u8] = b"content-length:";

    for line in header_block.split('\n') {
        let line = line.trim();
        if line.len() >= NAME.len() && line.as_bytes()[..NAME.len()].eq_ignore_ascii_case(NAME) {
            return leading_int(line[NAME.len()..].trim()) as usize;
        }
    }
    0
}

fn apply_request_line(entry: &mut HttpEntry, line: &str) {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(full_path)) = (parts.next(), parts.next()) else {
        return;
    };

    entry.method = method.to_string();
    match full_path.split_once('?') {
        Some((path, query)) => {
            entry.path = path.to_string();
            entry.query_string = query.to_string();
        }
        None => entry.path = full_path.to_string(),
    }
    if let Some(protocol) = parts.next() {
        entry.protocol = protocol.to_string();
    }
}

fn apply_status_line(entry: &mut HttpEntry, line: &str) {
    let mut parts = line.split_whitespace();
    if let (Some(_), Some(code)) = (parts.next(), parts.next()) {
        entry.status_code = leading_int(code) as u16;
    }
}

fn apply_host_header(entry: &mut HttpEntry, headers: &Headers) {
    let Some(host_port) = headers.get("Host") else {
        return;
    };

    match host_port.split_once(':') {
        Some((host, port)) => {
            entry.host = host.to_string();
            entry.port = leading_int(port) as u16;
        }
        None => {
            entry.host = host_port.to_string();
            entry.port = 80;
        }
    }
}

fn apply_content_headers(entry: &mut HttpEntry, headers: &Headers) {
    if let Some(content_type) = headers.get("Content-Type") {
        let mime = match content_type.split_once(';') {
            Some((mime, _)) => mime.trim(),
            None => content_type,
        };
        entry.mime_type = mime.to_string();
    }

    if let Some(length) = headers.get("Content-Length") {
        entry.content_length = leading_int(length);
    }
}

fn build_url(entry: &mut HttpEntry) {
    if entry.host.is_empty() {
        return;
    }

    let scheme = if entry.port == 443 { "https" } else { "http" };
    entry.url = if entry.port == 80 || entry.port == 443 {
        format!("{scheme}://{}{}", entry.host, entry.path)
    } else {
        format!("{scheme}://{}:{}{}", entry.host, entry.port, entry.path)
    };

    if !entry.query_string.is_empty() {
        entry.url.push('?');
        entry.url.push_str(&entry.query_string);
    }
}
