//! End-to-end scenarios over synthetic project images.

mod common;

use std::sync::Arc;

use burpscope::{
    prelude::*,
    scan::sort_for_display,
};
use common::ImageBuilder;

/// A bare 256-byte header: everything empty, nothing fails.
#[test]
fn minimal_valid_file() {
    let reader = ProjectReader::from_bytes(ImageBuilder::new(256).bytes()).unwrap();

    assert_eq!(reader.metadata().file_size, 256);
    assert_eq!(reader.http_history_count(), 0);
    assert!(reader.http_history().is_empty());
    assert!(reader.scanner_issue_metas().is_empty());
    assert!(reader.repeater_tab_names().is_empty());
}

#[test]
fn wrong_magic_is_fatal() {
    let mut image = ImageBuilder::new(256).bytes();
    image[0] = 0x00;
    assert!(matches!(
        ProjectReader::from_bytes(image),
        Err(Error::InvalidMagic { .. })
    ));
}

/// A single request at the very start of the scan window, no response.
#[test]
fn single_request_without_response() {
    let mut b = ImageBuilder::new(0x400);
    b.put(256, b"GET /foo HTTP/1.1\r\nHost: example.com\r\n\r\n");
    let reader = ProjectReader::from_bytes(b.bytes()).unwrap();

    let history = reader.http_history();
    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry.id, 256);
    assert_eq!(entry.method, "GET");
    assert_eq!(entry.path, "/foo");
    assert_eq!(entry.host, "example.com");
    assert_eq!(entry.port, 80);
    assert_eq!(entry.url, "http://example.com/foo");
    assert_eq!(entry.status_code, 0);
    assert!(entry.response.is_none());
    assert_eq!(reader.http_history_count(), history.len());
}

/// Request with query string and a paired response.
#[test]
fn request_with_query_and_response() {
    let mut traffic = Vec::new();
    traffic.extend_from_slice(b"POST /a?b=1 HTTP/1.1\r\nHost: h:8443\r\nContent-Length: 3\r\n\r\nabc");
    traffic.extend_from_slice(
        b"HTTP/1.1 201 Created\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 2\r\n\r\nok",
    );
    let mut b = ImageBuilder::new(0x400 + traffic.len());
    b.put(256, &traffic);
    let reader = ProjectReader::from_bytes(b.bytes()).unwrap();

    let history = reader.http_history();
    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry.method, "POST");
    assert_eq!(entry.query_string, "b=1");
    assert_eq!(entry.host, "h");
    assert_eq!(entry.port, 8443);
    assert_eq!(entry.url, "http://h:8443/a?b=1");
    assert_eq!(entry.status_code, 201);
    assert_eq!(entry.mime_type, "application/json");
    assert_eq!(entry.content_length, 2);
    assert_eq!(
        entry.response.as_ref().unwrap().body,
        b"ok".to_vec()
    );
}

/// A repeater tab present twice is reported once.
#[test]
fn repeater_tab_deduplicated() {
    let mut b = ImageBuilder::new(0x1000);
    b.repeater_tab(0x400, "My Tab");
    b.repeater_tab(0x600, "My Tab");
    let reader = ProjectReader::from_bytes(b.bytes()).unwrap();

    assert_eq!(*reader.repeater_tab_names(), vec!["My Tab".to_string()]);
}

/// Scanner finding with linked strings and an evidence pair.
#[test]
fn scanner_issue_happy_path() {
    let request = b"GET /admin HTTP/1.1\r\nHost: api.example.com\r\n\r\n";
    let response = b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n";

    let mut b = ImageBuilder::new(0x2000);
    b.issue_record(0x400, 7, 42, 0x600, 0x700, 3, 2, 0x800, 0x0010_0A00)
        .byte_string(0x600, b"/admin")
        .wide_string(0x700, "Admin panel")
        // evidence: list -> vector -> entry record -> two byte-string messages
        .list_wrapper(0x800, 1, 0x900)
        .pointer_vector(0x900, &[0xA00])
        .compact_record(0xA00, 1, &[(0x00, 0xB00), (0x01, 0xC00)])
        .byte_string(0xB00, request)
        .byte_string(0xC00, response);
    let reader = ProjectReader::from_bytes(b.bytes()).unwrap();

    let metas = reader.scanner_issue_metas();
    assert_eq!(metas.len(), 1);
    let meta = &metas[0];
    assert_eq!(meta.serial, 7);
    assert_eq!(meta.task_id, 42);
    assert_eq!(meta.severity, Severity::Medium);
    assert_eq!(meta.confidence, Confidence::Firm);
    assert_eq!(meta.path, "/admin");
    assert_eq!(meta.location, "Admin panel");
    assert_eq!(meta.host, "api.example.com");
    assert_eq!(meta.evidence.len(), 1);
    let pair = &meta.evidence[0];
    assert_eq!(
        pair.request.as_ref().unwrap().start_line,
        "GET /admin HTTP/1.1"
    );
    assert_eq!(
        pair.response.as_ref().unwrap().start_line,
        "HTTP/1.1 403 Forbidden"
    );
    // 0x00100A00 resolves through the embedded dictionary
    assert_eq!(meta.definition.as_ref().unwrap().name, "LDAP injection");
}

/// Live audit task with a scope string, per the UI numbering convention.
#[test]
fn ui_task_live_audit() {
    let mut b = ImageBuilder::new(0x1000);
    b.list_wrapper(0x1F4, 1, 0x400)
        .pointer_vector(0x400, &[0x500])
        .compact_record(0x500, 5, &[(0x02, 0x600)])
        .wide_record(0x600, &[(3, 0x700)])
        .list_wrapper(0x700, 1, 0x800)
        .pointer_vector(0x800, &[0x900])
        .fixed32_string(0x900, "in-scope URLs");
    let reader = ProjectReader::from_bytes(b.bytes()).unwrap();

    let tasks = reader.ui_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "1. Live audit from in-scope URLs");
    assert_eq!(tasks[0].scope, "in-scope URLs");
}

/// Everything at once: history, findings, tasks, tabs, and the derived consumers.
#[test]
fn combined_project_with_consumers() {
    let mut b = ImageBuilder::new(0x4000);
    // traffic, contiguous at the scan start
    let mut traffic = Vec::new();
    traffic.extend_from_slice(b"GET /api/users HTTP/1.1\r\nHost: app.example.com\r\n\r\n");
    traffic.extend_from_slice(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n[]",
    );
    b.put(256, &traffic);
    // one finding, no evidence
    b.issue_record(0x1000, 1, 5, 0x1100, 0, 4, 3, 0, 0x0010_0000);
    b.byte_string(0x1100, b"/api");
    // one repeater tab
    b.repeater_tab(0x2000, "Replay");
    let reader = Arc::new(ProjectReader::from_bytes(b.bytes()).unwrap());

    // history + site map
    let history = reader.http_history();
    assert_eq!(history.len(), 1);
    let map = reader.site_map();
    assert_eq!(map.hosts.len(), 1);
    assert_eq!(map.hosts[0].host, "app.example.com");

    // findings sorted for display
    let mut metas = (*reader.scanner_issue_metas()).clone();
    sort_for_display(&mut metas);
    assert_eq!(metas[0].severity, Severity::High);
    assert_eq!(metas[0].path, "/api");

    // task summaries attribute the finding
    let summaries = reader.scanner_task_summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].task_id, 5);
    assert_eq!(summaries[0].issue_count, 1);

    // filter and search over the materialized history
    let filtered = Filter::new().with_status_range(200, 299).apply(&history);
    assert_eq!(filtered.len(), 1);
    let found = search(
        &history,
        &SearchOptions {
            query: "users".into(),
            ..SearchOptions::default()
        },
    )
    .unwrap();
    assert_eq!(found.len(), 1);

    // export round-trips through serde
    let mut out = Vec::new();
    export(&mut out, &history, &ExportOptions::default()).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed[0]["host"], "app.example.com");

    // streaming with cancellation after the first entry
    let cancel = CancelToken::new();
    let (entries, _errors) = Arc::clone(&reader).stream_http_history(cancel.clone());
    let first = entries.recv().unwrap();
    assert_eq!(first.id, 256);
    cancel.cancel();
}
