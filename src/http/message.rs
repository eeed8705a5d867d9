//! Byte-slice to message splitting and the header multimap.

/// An order-preserving, case-insensitive HTTP header multimap.
///
/// Header names are stored as captured; lookups ignore case and duplicates are appended,
/// matching how proxies record repeated headers such as `Set-Cookie`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Headers {
        Headers::default()
    }

    /// Appends a header, keeping earlier values of the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first value of the named header, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value of the named header in capture order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header lines captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no headers were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One HTTP message split into its parts, with the raw bytes retained.
#[derive(Debug, Clone, Default)]
pub struct HttpMessage {
    /// The undisturbed bytes the message was parsed from
    pub raw: Vec<u8>,
    /// First line of the message, trimmed
    pub start_line: String,
    /// Header lines following the start line
    pub headers: Headers,
    /// Message body, empty when the blank-line separator was missing
    pub body: Vec<u8>,
}

/// Splits a byte slice into start line, headers, and body.
///
/// The header block ends at the first `\r\n\r\n`, falling back to `\n\n`; a slice with
/// neither separator is treated as all headers. Header lines split at the first `:` with
/// both sides trimmed; lines without a colon are dropped. This never fails - a garbled
/// slice yields a message with whatever could be recovered.
#[must_use]
pub fn parse_message(data: &[u8]) -> HttpMessage {
    let (header_end, body_start) = match find_subslice(data, b"\r\n\r\n") {
        Some(at) => (at, at + 4),
        None => match find_subslice(data, b"\n\n") {
            Some(at) => (at, at + 2),
            None => (data.len(), data.len()),
        },
    };

    let header_section = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = header_section.split('\n');

    let start_line = lines.next().unwrap_or("").trim().to_string();

    let mut headers = Headers::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if !name.trim().is_empty() {
                headers.append(name.trim(), value.trim());
            }
        }
    }

    let body = if body_start < data.len() {
        data[body_start..].to_vec()
    } else {
        Vec::new()
    };

    HttpMessage {
        raw: data.to_vec(),
        start_line,
        headers,
        body,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
