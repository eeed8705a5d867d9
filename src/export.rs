//! Export writers for history entries and scanner findings.
//!
//! Four formats: pretty/compact JSON, newline-delimited JSON, CSV, and HAR 1.2. All of
//! them work on plain exported shapes derived from the decoder's output; nothing here
//! touches the file window. Body handling is shared: bodies are included or dropped,
//! truncated at a caller-chosen cap, and binary response bodies in HAR output are
//! base64-encoded with the standard `encoding` marker.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::{
    http::{HttpEntry, HttpMessage},
    scan::{IssueEvidence, IssueMeta},
    utils::base64_encode,
    Result,
};

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// One JSON array (pretty-printed when [`ExportOptions::pretty_print`] is set)
    #[default]
    Json,
    /// One JSON object per line
    JsonLines,
    /// Comma-separated summary columns, no bodies
    Csv,
    /// HTTP Archive 1.2
    Har,
}

/// Export tuning; the decoder takes none of this, it belongs to the writers.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Format to write
    pub format: ExportFormat,
    /// Include message bodies
    pub include_body: bool,
    /// Pretty-print JSON output
    pub pretty_print: bool,
    /// Truncate bodies beyond this many bytes; 0 means unlimited
    pub max_body_size: usize,
    /// Include the raw message bytes alongside the parsed parts
    pub include_raw: bool,
}

impl Default for ExportOptions {
    fn default() -> ExportOptions {
        ExportOptions {
            format: ExportFormat::Json,
            include_body: true,
            pretty_print: true,
            max_body_size: 10 * 1024,
            include_raw: false,
        }
    }
}

/// One history entry in exported shape.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedEntry {
    /// Stable entry id (request file offset)
    pub id: u64,
    /// Target host
    pub host: String,
    #[serde(skip_serializing_if = "is_zero_u16")]
    /// Target port
    pub port: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Protocol token from the request line
    pub protocol: String,
    /// Request method
    pub method: String,
    /// Request path
    pub path: String,
    /// Reconstructed URL
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Query string without the `?`
    pub query_string: String,
    #[serde(skip_serializing_if = "is_zero_u16")]
    /// Response status code
    pub status_code: u16,
    #[serde(skip_serializing_if = "is_zero_u64")]
    /// Response content length
    pub content_length: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Response mime type
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parsed request, when captured
    pub request: Option<ExportedMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parsed response, when captured
    pub response: Option<ExportedMessage>,
}

/// One message in exported shape; headers flattened to their first value.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Start line of the message
    pub start_line: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    /// First value of each header
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Body text, possibly truncated
    pub body: String,
    #[serde(skip_serializing_if = "is_zero_usize")]
    /// Untruncated body size in bytes
    pub body_size: usize,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Raw message text, possibly truncated
    pub raw: String,
}

/// One scanner finding in exported shape.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedIssue {
    /// File offset of the finding record
    pub record_offset: u64,
    /// Finding serial number
    pub serial_number: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    /// Producing task id
    pub task_id: u64,
    /// Vendor issue type id
    #[serde(rename = "type")]
    pub type_id: u32,
    /// Severity display name
    pub severity: String,
    /// Confidence display name
    pub confidence: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Affected host
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Affected path
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    /// Location display string
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Resolved definition name
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Typical severity from the definition
    pub typical_severity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    /// Evidence request/response pairs
    pub evidence: Vec<ExportedEvidence>,
}

/// One evidence pair in exported shape.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Evidence request
    pub request: Option<ExportedMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Evidence response
    pub response: Option<ExportedMessage>,
}

fn is_zero_u16(value: &u16) -> bool {
    *value == 0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

fn is_zero_usize(value: &usize) -> bool {
    *value == 0
}

/// Writes history entries in the selected format.
///
/// # Errors
/// Fails on serialization or I/O errors of the underlying writer.
pub fn export(w: &mut dyn Write, entries: &[HttpEntry], opts: &ExportOptions) -> Result<()> {
    match opts.format {
        ExportFormat::Json => export_json(w, entries, opts),
        ExportFormat::JsonLines => export_json_lines(w, entries, opts),
        ExportFormat::Csv => export_csv(w, entries),
        ExportFormat::Har => export_har(w, entries, opts),
    }
}

/// Writes findings as JSON (array) or JSONL; other formats fall back to JSON.
///
/// # Errors
/// Fails on serialization or I/O errors of the underlying writer.
pub fn export_issues(w: &mut dyn Write, metas: &[IssueMeta], opts: &ExportOptions) -> Result<()> {
    let exported: Vec<ExportedIssue> = metas.iter().map(exported_issue).collect();
    match opts.format {
        ExportFormat::JsonLines => {
            for issue in &exported {
                serde_json::to_writer(&mut *w, issue).map_err(serde_error)?;
                writeln!(w)?;
            }
            Ok(())
        }
        _ => {
            write_json(w, &exported, opts.pretty_print)?;
            writeln!(w)?;
            Ok(())
        }
    }
}

/// Converts one entry to its exported shape.
#[must_use]
pub fn exported_entry(entry: &HttpEntry, opts: &ExportOptions) -> ExportedEntry {
    ExportedEntry {
        id: entry.id,
        host: entry.host.clone(),
        port: entry.port,
        protocol: entry.protocol.clone(),
        method: entry.method.clone(),
        path: entry.path.clone(),
        url: entry.url.clone(),
        query_string: entry.query_string.clone(),
        status_code: entry.status_code,
        content_length: entry.content_length,
        mime_type: entry.mime_type.clone(),
        request: entry.request.as_ref().map(|msg| exported_message(msg, opts)),
        response: entry.response.as_ref().map(|msg| exported_message(msg, opts)),
    }
}

/// Converts one finding to its exported shape.
///
/// Evidence messages are always exported whole (bodies and raw bytes, no cap); they
/// are the point of a finding export.
#[must_use]
pub fn exported_issue(meta: &IssueMeta) -> ExportedIssue {
    let evidence_opts = ExportOptions {
        include_body: true,
        include_raw: true,
        max_body_size: 0,
        ..ExportOptions::default()
    };

    ExportedIssue {
        record_offset: meta.record_offset,
        serial_number: meta.serial,
        task_id: meta.task_id,
        type_id: meta.type_id,
        severity: meta.severity.to_string(),
        confidence: meta.confidence.to_string(),
        host: meta.host.clone(),
        path: meta.path.clone(),
        location: meta.location.clone(),
        name: meta.definition.as_ref().map(|def| def.name.clone()),
        typical_severity: meta
            .definition
            .as_ref()
            .filter(|def| !def.typical_severity.is_empty())
            .map(|def| def.typical_severity.clone()),
        evidence: meta
            .evidence
            .iter()
            .map(|pair| exported_evidence(pair, &evidence_opts))
            .collect(),
    }
}

fn exported_evidence(pair: &IssueEvidence, opts: &ExportOptions) -> ExportedEvidence {
    ExportedEvidence {
        request: pair.request.as_ref().map(|msg| exported_message(msg, opts)),
        response: pair.response.as_ref().map(|msg| exported_message(msg, opts)),
    }
}

fn exported_message(msg: &HttpMessage, opts: &ExportOptions) -> ExportedMessage {
    let mut headers = BTreeMap::new();
    for (name, value) in msg.headers.iter() {
        headers
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }

    let (body, body_size) = if opts.include_body && !msg.body.is_empty() {
        let capped = cap(&msg.body, opts.max_body_size);
        (String::from_utf8_lossy(capped).into_owned(), msg.body.len())
    } else {
        (String::new(), 0)
    };

    let raw = if opts.include_raw && !msg.raw.is_empty() {
        let capped = cap(&msg.raw, opts.max_body_size.saturating_mul(2));
        String::from_utf8_lossy(capped).into_owned()
    } else {
        String::new()
    };

    ExportedMessage {
        start_line: msg.start_line.clone(),
        headers,
        body,
        body_size,
        raw,
    }
}

fn cap(data: &[u8], limit: usize) -> &[u8] {
    if limit > 0 && data.len() > limit {
        &data[..limit]
    } else {
        data
    }
}

fn serde_error(err: serde_json::Error) -> crate::Error {
    crate::Error::InvalidFile(format!("serialize export: {err}"))
}

fn write_json<T: Serialize>(w: &mut dyn Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *w, value).map_err(serde_error)?;
    } else {
        serde_json::to_writer(&mut *w, value).map_err(serde_error)?;
    }
    Ok(())
}

fn export_json(w: &mut dyn Write, entries: &[HttpEntry], opts: &ExportOptions) -> Result<()> {
    let exported: Vec<ExportedEntry> = entries
        .iter()
        .map(|entry| exported_entry(entry, opts))
        .collect();
    write_json(w, &exported, opts.pretty_print)?;
    writeln!(w)?;
    Ok(())
}

fn export_json_lines(w: &mut dyn Write, entries: &[HttpEntry], opts: &ExportOptions) -> Result<()> {
    for entry in entries {
        let exported = exported_entry(entry, opts);
        serde_json::to_writer(&mut *w, &exported).map_err(serde_error)?;
        writeln!(w)?;
    }
    Ok(())
}

fn export_csv(w: &mut dyn Write, entries: &[HttpEntry]) -> Result<()> {
    writeln!(w, "id,method,host,path,url,status_code,content_length,mime_type")?;

    for entry in entries {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{}",
            entry.id,
            csv_escape(&entry.method),
            csv_escape(&entry.host),
            csv_escape(&entry.path),
            csv_escape(&entry.url),
            entry.status_code,
            entry.content_length,
            csv_escape(&entry.mime_type),
        )?;
    }
    Ok(())
}

fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// HAR 1.2 shapes; field names follow the published schema.

#[derive(Serialize)]
struct HarLog {
    log: HarLogContent,
}

#[derive(Serialize)]
struct HarLogContent {
    version: &'static str,
    creator: HarCreator,
    entries: Vec<HarEntry>,
}

#[derive(Serialize)]
struct HarCreator {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarEntry {
    started_date_time: String,
    time: f64,
    request: HarRequest,
    response: HarResponse,
    cache: serde_json::Map<String, serde_json::Value>,
    timings: HarTimings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarRequest {
    method: String,
    url: String,
    http_version: String,
    headers: Vec<HarPair>,
    query_string: Vec<HarPair>,
    cookies: Vec<HarPair>,
    headers_size: i64,
    body_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_data: Option<HarPostData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarResponse {
    status: u16,
    status_text: String,
    http_version: String,
    headers: Vec<HarPair>,
    cookies: Vec<HarPair>,
    content: HarContent,
    #[serde(rename = "redirectURL")]
    redirect_url: String,
    headers_size: i64,
    body_size: i64,
}

#[derive(Serialize)]
struct HarPair {
    name: String,
    value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarPostData {
    mime_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HarContent {
    size: i64,
    mime_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    encoding: String,
}

#[derive(Serialize)]
struct HarTimings {
    send: f64,
    wait: f64,
    receive: f64,
}

fn export_har(w: &mut dyn Write, entries: &[HttpEntry], opts: &ExportOptions) -> Result<()> {
    let har = HarLog {
        log: HarLogContent {
            version: "1.2",
            creator: HarCreator {
                name: "burpscope",
                version: env!("CARGO_PKG_VERSION"),
            },
            entries: entries
                .iter()
                .map(|entry| har_entry(entry, opts))
                .collect(),
        },
    };

    write_json(w, &har, opts.pretty_print)?;
    writeln!(w)?;
    Ok(())
}

fn har_entry(entry: &HttpEntry, opts: &ExportOptions) -> HarEntry {
    HarEntry {
        started_date_time: String::new(),
        time: 0.0,
        request: har_request(entry, opts),
        response: har_response(entry, opts),
        cache: serde_json::Map::new(),
        timings: HarTimings {
            send: -1.0,
            wait: -1.0,
            receive: -1.0,
        },
    }
}

fn har_request(entry: &HttpEntry, opts: &ExportOptions) -> HarRequest {
    let mut request = HarRequest {
        method: entry.method.clone(),
        url: entry.url.clone(),
        http_version: entry.protocol.clone(),
        headers: Vec::new(),
        query_string: query_pairs(&entry.query_string),
        cookies: Vec::new(),
        headers_size: -1,
        body_size: -1,
        post_data: None,
    };

    if let Some(msg) = &entry.request {
        request.headers = header_pairs(msg);

        if opts.include_body && !msg.body.is_empty() {
            let body = cap(&msg.body, opts.max_body_size);
            request.body_size = body.len() as i64;
            request.post_data = Some(HarPostData {
                mime_type: "application/octet-stream".to_string(),
                text: String::from_utf8_lossy(body).into_owned(),
            });
        }
    }

    request
}

fn har_response(entry: &HttpEntry, opts: &ExportOptions) -> HarResponse {
    let mut response = HarResponse {
        status: entry.status_code,
        status_text: status_text(entry.status_code).to_string(),
        http_version: "HTTP/1.1".to_string(),
        headers: Vec::new(),
        cookies: Vec::new(),
        content: HarContent {
            size: entry.content_length as i64,
            mime_type: entry.mime_type.clone(),
            text: String::new(),
            encoding: String::new(),
        },
        redirect_url: String::new(),
        headers_size: -1,
        body_size: entry.content_length as i64,
    };

    if let Some(msg) = &entry.response {
        response.headers = header_pairs(msg);

        if opts.include_body && !msg.body.is_empty() {
            let body = cap(&msg.body, opts.max_body_size);
            if is_binary_content(&entry.mime_type) {
                response.content.text = base64_encode(body);
                response.content.encoding = "base64".to_string();
            } else {
                response.content.text = String::from_utf8_lossy(body).into_owned();
            }
        }
    }

    response
}

fn header_pairs(msg: &HttpMessage) -> Vec<HarPair> {
    msg.headers
        .iter()
        .map(|(name, value)| HarPair {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect()
}

fn query_pairs(query: &str) -> Vec<HarPair> {
    if query.is_empty() {
        return Vec::new();
    }

    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => HarPair {
                name: name.to_string(),
                value: value.to_string(),
            },
            None => HarPair {
                name: pair.to_string(),
                value: String::new(),
            },
        })
        .collect()
}

fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn is_binary_content(mime_type: &str) -> bool {
    let mime = mime_type.to_ascii_lowercase();
    const TEXT_TYPES: [&str; 5] = [
        "text/",
        "application/json",
        "application/xml",
        "application/javascript",
        "application/x-www-form-urlencoded",
    ];
    !TEXT_TYPES.iter().any(|t| mime.starts_with(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_entry;

    fn entries() -> Vec<HttpEntry> {
        vec![build_entry(
            256,
            Some(b"POST /a?b=1&c HTTP/1.1\r\nHost: h:8443\r\nContent-Length: 3\r\n\r\nabc"),
            Some(b"HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\nok"),
        )]
    }

    #[test]
    fn json_roundtrips_through_serde() {
        let mut out = Vec::new();
        export(&mut out, &entries(), &ExportOptions::default()).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let first = &parsed[0];
        assert_eq!(first["id"], 256);
        assert_eq!(first["url"], "http://h:8443/a?b=1&c");
        assert_eq!(first["status_code"], 201);
        assert_eq!(first["request"]["body"], "abc");
    }

    #[test]
    fn jsonl_is_one_object_per_line() {
        let mut out = Vec::new();
        export(
            &mut out,
            &entries(),
            &ExportOptions {
                format: ExportFormat::JsonLines,
                ..ExportOptions::default()
            },
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["method"], "POST");
    }

    #[test]
    fn csv_escapes_fields() {
        let mut history = entries();
        history[0].mime_type = "weird,type".to_string();
        let mut out = Vec::new();
        export(
            &mut out,
            &history,
            &ExportOptions {
                format: ExportFormat::Csv,
                ..ExportOptions::default()
            },
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("id,method,host,"));
        assert!(text.contains("\"weird,type\""));
    }

    #[test]
    fn har_has_log_envelope_and_query_params() {
        let mut out = Vec::new();
        export(
            &mut out,
            &entries(),
            &ExportOptions {
                format: ExportFormat::Har,
                ..ExportOptions::default()
            },
        )
        .unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["log"]["version"], "1.2");
        let entry = &parsed["log"]["entries"][0];
        assert_eq!(entry["request"]["method"], "POST");
        assert_eq!(entry["request"]["queryString"][0]["name"], "b");
        assert_eq!(entry["request"]["queryString"][1]["name"], "c");
        assert_eq!(entry["response"]["status"], 201);
        // json body stays plain text
        assert_eq!(entry["response"]["content"]["text"], "ok");
    }

    #[test]
    fn body_truncation() {
        let mut out = Vec::new();
        export(
            &mut out,
            &entries(),
            &ExportOptions {
                format: ExportFormat::Json,
                max_body_size: 2,
                ..ExportOptions::default()
            },
        )
        .unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["request"]["body"], "ab");
        assert_eq!(parsed[0]["request"]["body_size"], 3);
    }

    #[test]
    fn binary_detection() {
        assert!(!is_binary_content("text/html; charset=utf-8"));
        assert!(!is_binary_content("application/json"));
        assert!(is_binary_content("image/png"));
        assert!(is_binary_content(""));
    }
}
