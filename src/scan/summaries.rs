//! Per-task aggregation over scanner findings.
//!
//! Findings carry the id of the scan task that produced them, and the task id doubles as
//! the absolute offset of a task record elsewhere in the file. Summaries count findings
//! per task and, when the task record is recognizable, annotate the summary with the
//! target host, port, TLS flag, and timestamp stored there.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    file::ProjectFile,
    records::read_wide_string,
    scan::issues::IssueMeta,
};
use rustc_hash::{FxHashMap, FxHashSet};

/// Descriptor-table signature of a scan-task record (type 0, 7 fields).
const TASK_SIG: [u8; 25] = [
    0x00, 0x00, 0x00, 0x07, //
    0x00, 0x00, 0x19, //
    0x01, 0x00, 0x21, //
    0x02, 0x00, 0x25, //
    0x03, 0x00, 0x26, //
    0x04, 0x00, 0x27, //
    0x05, 0x00, 0x2f, //
    0x06, 0x00, 0x37, //
];

// Fixed field offsets inside a scan-task record.
const HOST_PTR_OFFSET: usize = 0x19;
const PORT_OFFSET: usize = 0x21;
const SECURE_OFFSET: usize = 0x25;
const TIMESTAMP_OFFSET: usize = 0x27;

/// Bytes a task record must provide to be annotated from.
const MIN_TASK_RECORD_LEN: usize = 0x2f + 8;

/// Aggregated view of one scan task's findings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskSummary {
    /// Task id as stored in the finding records
    pub task_id: u64,
    /// Target host, when the task record was found and readable
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Target port from the task record
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub port: u32,
    /// True when the task targeted a TLS endpoint
    pub secure: bool,
    /// Raw timestamp from the task record
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub timestamp: u64,
    /// Findings attributed to this task
    pub issue_count: usize,
    /// Finding count per severity display name
    pub severity_counts: BTreeMap<String, usize>,
    /// Finding count per confidence display name
    pub confidence_counts: BTreeMap<String, usize>,
    /// Distinct issue type ids seen
    pub unique_issue_types: usize,
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

/// Groups findings by task and annotates each group from its task record.
///
/// Sorted by finding count descending, then task id, for stable presentation.
#[must_use]
pub fn scan_task_summaries(file: &ProjectFile, metas: &[IssueMeta]) -> Vec<TaskSummary> {
    let mut by_task: FxHashMap<u64, TaskSummary> = FxHashMap::default();
    let mut type_sets: FxHashMap<u64, FxHashSet<u32>> = FxHashMap::default();

    for meta in metas {
        let summary = by_task.entry(meta.task_id).or_insert_with(|| TaskSummary {
            task_id: meta.task_id,
            ..TaskSummary::default()
        });

        summary.issue_count += 1;
        *summary
            .severity_counts
            .entry(meta.severity.to_string())
            .or_default() += 1;
        *summary
            .confidence_counts
            .entry(meta.confidence.to_string())
            .or_default() += 1;
        type_sets.entry(meta.task_id).or_default().insert(meta.type_id);
    }

    let mut summaries: Vec<TaskSummary> = by_task
        .into_values()
        .map(|mut summary| {
            summary.unique_issue_types =
                type_sets.get(&summary.task_id).map_or(0, |set| set.len());
            annotate_from_task_record(file, &mut summary);
            summary
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.issue_count
            .cmp(&a.issue_count)
            .then(a.task_id.cmp(&b.task_id))
    });
    summaries
}

/// Fills host/port/secure/timestamp when the task id addresses a task record.
///
/// Task ids that are not file offsets (or whose record bytes are gone) leave the
/// summary bare; that is not an error.
fn annotate_from_task_record(file: &ProjectFile, summary: &mut TaskSummary) {
    if summary.task_id == 0 {
        return;
    }

    let Ok(rec) = file.read_exact_at(summary.task_id, MIN_TASK_RECORD_LEN) else {
        return;
    };
    if !rec.starts_with(&TASK_SIG) {
        return;
    }

    let host_ptr = u64::from_be_bytes(rec[HOST_PTR_OFFSET..HOST_PTR_OFFSET + 8].try_into().unwrap());
    summary.port = u32::from_be_bytes(rec[PORT_OFFSET..PORT_OFFSET + 4].try_into().unwrap());
    summary.secure = rec[SECURE_OFFSET] == 1;
    summary.timestamp =
        u64::from_be_bytes(rec[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8].try_into().unwrap());
    summary.host = read_wide_string(file, host_ptr).unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::NoDefinitions;
    use crate::scan::issues::{scan_issue_metas, tests::issue_record};
    use crate::scan::tasks::tests::ImageBuilder;

    /// Scan-task record with host pointer, port, secure flag and timestamp.
    fn task_record(host_ptr: u64, port: u32, secure: bool, timestamp: u64) -> Vec<u8> {
        let mut rec = vec![0u8; MIN_TASK_RECORD_LEN];
        rec[..TASK_SIG.len()].copy_from_slice(&TASK_SIG);
        rec[HOST_PTR_OFFSET..HOST_PTR_OFFSET + 8].copy_from_slice(&host_ptr.to_be_bytes());
        rec[PORT_OFFSET..PORT_OFFSET + 4].copy_from_slice(&port.to_be_bytes());
        rec[SECURE_OFFSET] = u8::from(secure);
        rec[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 8].copy_from_slice(&timestamp.to_be_bytes());
        rec
    }

    #[test]
    fn groups_and_annotates() {
        let mut b = ImageBuilder::new(0x2000);
        // task record at 0x1000, host string at 0x1100
        b.put(0x1000, &task_record(0x1100, 8443, true, 1700000000));
        b.wide_v1_string(0x1100, "staging.example.com");
        // three findings for task 0x1000, one for task 99 (no record there)
        b.put(0x400, &issue_record(1, 0x1000, 0, 0, 4, 3, 0, 100));
        b.put(0x500, &issue_record(2, 0x1000, 0, 0, 4, 2, 0, 100));
        b.put(0x600, &issue_record(3, 0x1000, 0, 0, 2, 1, 0, 200));
        b.put(0x700, &issue_record(4, 99, 0, 0, 1, 1, 0, 300));
        let file = b.build();

        let metas = scan_issue_metas(&file, &NoDefinitions);
        let summaries = scan_task_summaries(&file, &metas);

        assert_eq!(summaries.len(), 2);
        let first = &summaries[0];
        assert_eq!(first.task_id, 0x1000);
        assert_eq!(first.issue_count, 3);
        assert_eq!(first.unique_issue_types, 2);
        assert_eq!(first.severity_counts["High"], 2);
        assert_eq!(first.severity_counts["Low"], 1);
        assert_eq!(first.confidence_counts["Certain"], 1);
        assert_eq!(first.host, "staging.example.com");
        assert_eq!(first.port, 8443);
        assert!(first.secure);
        assert_eq!(first.timestamp, 1700000000);

        let second = &summaries[1];
        assert_eq!(second.task_id, 99);
        assert_eq!(second.issue_count, 1);
        assert!(second.host.is_empty());
    }

    #[test]
    fn no_findings_no_summaries() {
        let b = ImageBuilder::new(0x400);
        assert!(scan_task_summaries(&b.build(), &[]).is_empty());
    }
}
