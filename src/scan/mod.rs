//! Signature-based scanners over the project file.
//!
//! The container has no table of contents for most record classes; everything here is
//! recovered by streaming the file in large windows and anchoring on literal byte
//! signatures. Windows overlap by a little more than the longest signature so that no
//! hit is lost at a boundary, and every candidate is re-validated against its full record
//! layout before anything is emitted - a heuristic scan is expected to produce false
//! positives, and rejecting them quietly is part of the contract.
//!
//! - [`crate::scan::history`] - HTTP request/response locator
//! - [`crate::scan::issues`] - scanner-finding records, via index table and direct signature
//! - [`crate::scan::evidence`] - bounded traversal recovering messages behind a finding
//! - [`crate::scan::tasks`] - the UI task list at its fixed root offset
//! - [`crate::scan::summaries`] - per-task aggregation over the finding records
//! - [`crate::scan::repeater`] - repeater tab names

pub mod evidence;
pub mod history;
pub mod issues;
pub mod repeater;
pub mod summaries;
pub mod tasks;

pub use history::{scan_http_records, HttpRecordLocation};
pub use issues::{
    scan_issue_metas, severity_breakdown, sort_for_display, Confidence, IssueEvidence, IssueMeta,
    Severity,
};
pub use repeater::scan_repeater_tabs;
pub use summaries::{scan_task_summaries, TaskSummary};
pub use tasks::{scan_ui_tasks, UiTask};

use crate::file::ProjectFile;

/// Size of the streaming scan window.
const SCAN_WINDOW: usize = 1024 * 1024;

/// Streams the file in [`SCAN_WINDOW`]-sized chunks, starting past the file header.
///
/// Consecutive windows overlap by `overlap` bytes so records straddling a boundary are
/// seen whole at least once; callers deduplicate by absolute offset or by value.
pub(crate) fn scan_windows(file: &ProjectFile, overlap: usize, mut visit: impl FnMut(u64, &[u8])) {
    let mut offset = ProjectFile::HEADER_SIZE;

    while offset < file.size() {
        let Ok(data) = file.read_at(offset, SCAN_WINDOW) else {
            break;
        };
        if data.is_empty() {
            break;
        }

        visit(offset, data);

        if data.len() > overlap {
            offset += (data.len() - overlap) as u64;
        } else {
            offset += data.len() as u64;
        }
    }
}

/// Returns the position of the next occurrence of `pattern` in `data` at or after `from`.
pub(crate) fn next_index(data: &[u8], from: usize, pattern: &[u8]) -> Option<usize> {
    if from >= data.len() || pattern.is_empty() {
        return None;
    }
    data[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|pos| from + pos)
}
