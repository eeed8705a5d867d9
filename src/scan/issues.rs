//! Scanner-finding decoder.
//!
//! Findings are typed records with a fixed, known descriptor table, which doubles as the
//! scan signature: the header bytes of the record are searched for literally and every
//! hit is re-validated by re-reading the record. Two discovery paths exist in the wild -
//! an index table whose entries point at finding records, and the finding records
//! themselves. Neither is reliably complete, so both run on every scan and the results
//! are unioned by serial number; a serial is emitted at most once.
//!
//! Field values live at fixed offsets inside the record (the descriptor table never
//! varies), so the whole 0x98-byte field block is read at once and sliced.

use rustc_hash::FxHashSet;
use serde::Serialize;
use strum::{Display, EnumIter, FromRepr, IntoEnumIterator};

use crate::{
    defs::{DefinitionLookup, IssueDefinition},
    file::ProjectFile,
    http::HttpMessage,
    records::{read_byte_string, read_wide_string},
    scan::{
        evidence::{extract_evidence, fallback_host_path},
        next_index, scan_windows,
    },
};

/// Descriptor-table signature of a finding record (type 0, 18 fields).
const ISSUE_SIG: [u8; 58] = [
    0x00, 0x00, 0x00, 0x12, //
    0x00, 0x00, 0x3a, //
    0x01, 0x00, 0x42, //
    0x02, 0x00, 0x4a, //
    0x03, 0x00, 0x52, //
    0x04, 0x00, 0x5a, //
    0x05, 0x00, 0x62, //
    0x06, 0x00, 0x6a, //
    0x07, 0x00, 0x6b, //
    0x08, 0x00, 0x6c, //
    0x09, 0x00, 0x6d, //
    0x0a, 0x00, 0x6e, //
    0x0b, 0x00, 0x72, //
    0x0c, 0x00, 0x73, //
    0x0d, 0x00, 0x7b, //
    0x0e, 0x00, 0x83, //
    0x0f, 0x00, 0x8b, //
    0x10, 0x00, 0x8f, //
    0x11, 0x00, 0x97, //
];

/// Descriptor-table signature of an index-table entry (type 0, 7 fields).
const INDEX_SIG: [u8; 25] = [
    0x00, 0x00, 0x00, 0x07, //
    0x00, 0x00, 0x19, //
    0x01, 0x00, 0x1d, //
    0x02, 0x00, 0x1e, //
    0x03, 0x00, 0x26, //
    0x04, 0x00, 0x27, //
    0x05, 0x00, 0x2f, //
    0x06, 0x00, 0x37, //
];

/// In-record offset of the pointer an index entry carries to its finding record.
const INDEX_ISSUE_PTR_OFFSET: u64 = 0x2f;

/// Minimum bytes an index entry must provide.
const MIN_INDEX_RECORD_LEN: usize = INDEX_ISSUE_PTR_OFFSET as usize + 8;

// Fixed field offsets inside a finding record.
const SERIAL_OFFSET: usize = 0x3a;
const TASK_ID_OFFSET: usize = 0x42;
const PATH_PTR_OFFSET: usize = 0x4a;
const LOCATION_PTR_OFFSET: usize = 0x52;
const SEVERITY_OFFSET: usize = 0x6a;
const CONFIDENCE_OFFSET: usize = 0x6b;
const EVIDENCE_PTR_OFFSET: usize = 0x73;
const TYPE_ID_OFFSET: usize = 0x8b;

/// Minimum bytes a finding record must provide.
const MIN_ISSUE_RECORD_LEN: usize = 0x98;

/// Scan-window overlap; generously larger than either signature.
const SIG_OVERLAP: usize = 1024;

/// Severity of a scanner finding, as stored in the record's severity byte.
///
/// Any byte outside `1..=4` rejects the enclosing record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, FromRepr, EnumIter,
)]
#[repr(u8)]
pub enum Severity {
    /// Informational finding
    #[strum(serialize = "Information")]
    #[serde(rename = "Information")]
    Info = 1,
    /// Low severity
    Low = 2,
    /// Medium severity
    Medium = 3,
    /// High severity
    High = 4,
}

/// Confidence of a scanner finding, as stored in the record's confidence byte.
///
/// Any byte outside `1..=3` rejects the enclosing record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, FromRepr, EnumIter,
)]
#[repr(u8)]
pub enum Confidence {
    /// The scanner is unsure
    Tentative = 1,
    /// The scanner is fairly sure
    Firm = 2,
    /// The scanner verified the finding
    Certain = 3,
}

/// The request/response pair(s) backing one finding.
#[derive(Debug, Clone, Default)]
pub struct IssueEvidence {
    /// Recovered request, if any
    pub request: Option<HttpMessage>,
    /// Recovered response, if any
    pub response: Option<HttpMessage>,
}

/// One decoded scanner finding.
#[derive(Debug, Clone)]
pub struct IssueMeta {
    /// Absolute file offset of the finding record
    pub record_offset: u64,
    /// Serial number; unique per finding across the whole file
    pub serial: u64,
    /// Id of the scan task that produced the finding
    pub task_id: u64,
    /// Vendor issue type id; resolves through the definition dictionary
    pub type_id: u32,
    /// Mapped severity
    pub severity: Severity,
    /// Mapped confidence
    pub confidence: Confidence,
    /// Affected host, possibly recovered from evidence
    pub host: String,
    /// Affected path, possibly recovered from evidence
    pub path: String,
    /// Location display string
    pub location: String,
    /// Dictionary entry for the type id, when the injected lookup knows it
    pub definition: Option<IssueDefinition>,
    /// Recovered evidence entries
    pub evidence: Vec<IssueEvidence>,
}

/// Scans the whole file for findings, running both discovery paths.
///
/// The direct path walks finding records in place; the indexed path walks the index
/// table and follows each entry's pointer. Results are unioned by serial. Per-record
/// failures (bad severity byte, unreadable strings, dangling pointers) drop the record
/// or field and the scan continues.
#[must_use]
pub fn scan_issue_metas(file: &ProjectFile, lookup: &dyn DefinitionLookup) -> Vec<IssueMeta> {
    let mut seen_serials = FxHashSet::default();
    let mut metas = Vec::new();

    scan_windows(file, SIG_OVERLAP, |window_offset, data| {
        let mut idx = 0;
        while let Some(pos) = next_index(data, idx, &ISSUE_SIG) {
            let abs = window_offset + pos as u64;
            if let Some(meta) = read_issue_meta_at(file, abs, lookup, &mut seen_serials) {
                metas.push(meta);
            }
            idx = pos + 1;
        }
    });

    scan_windows(file, SIG_OVERLAP, |window_offset, data| {
        let mut idx = 0;
        while let Some(pos) = next_index(data, idx, &INDEX_SIG) {
            let abs = window_offset + pos as u64;
            if let Some(issue_ptr) = follow_index_entry(file, abs) {
                if let Some(meta) = read_issue_meta_at(file, issue_ptr, lookup, &mut seen_serials)
                {
                    metas.push(meta);
                }
            }
            idx = pos + 1;
        }
    });

    metas
}

/// Sorts findings the way presentation layers expect: severity and confidence
/// descending, then serial ascending.
pub fn sort_for_display(metas: &mut [IssueMeta]) {
    metas.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.confidence.cmp(&a.confidence))
            .then(a.serial.cmp(&b.serial))
    });
}

/// Finding counts per severity, highest first; zero-count severities included.
#[must_use]
pub fn severity_breakdown(metas: &[IssueMeta]) -> Vec<(Severity, usize)> {
    Severity::iter()
        .rev()
        .map(|severity| {
            let count = metas.iter().filter(|m| m.severity == severity).count();
            (severity, count)
        })
        .collect()
}

/// Validates an index entry and returns the finding pointer it carries.
fn follow_index_entry(file: &ProjectFile, abs: u64) -> Option<u64> {
    let rec = file.read_exact_at(abs, MIN_INDEX_RECORD_LEN).ok()?;
    if !rec.starts_with(&INDEX_SIG) {
        return None;
    }

    let ptr = u64::from_be_bytes(
        rec[INDEX_ISSUE_PTR_OFFSET as usize..INDEX_ISSUE_PTR_OFFSET as usize + 8]
            .try_into()
            .unwrap(),
    );
    Some(ptr)
}

/// Decodes the finding record at `abs`, claiming its serial.
///
/// A serial is claimed even when the record is later rejected for an invalid severity
/// or confidence byte - both discovery paths reach the same record bytes, so the claim
/// is what keeps the union duplicate-free.
fn read_issue_meta_at(
    file: &ProjectFile,
    abs: u64,
    lookup: &dyn DefinitionLookup,
    seen_serials: &mut FxHashSet<u64>,
) -> Option<IssueMeta> {
    if abs == 0 || abs >= file.size() {
        return None;
    }

    let rec = file.read_exact_at(abs, MIN_ISSUE_RECORD_LEN).ok()?;
    if !rec.starts_with(&ISSUE_SIG) {
        return None;
    }

    let read_u64 = |at: usize| u64::from_be_bytes(rec[at..at + 8].try_into().unwrap());

    let serial = read_u64(SERIAL_OFFSET);
    if !seen_serials.insert(serial) {
        return None;
    }

    let severity = Severity::from_repr(rec[SEVERITY_OFFSET])?;
    let confidence = Confidence::from_repr(rec[CONFIDENCE_OFFSET])?;

    let task_id = read_u64(TASK_ID_OFFSET);
    let type_id = u32::from_be_bytes(rec[TYPE_ID_OFFSET..TYPE_ID_OFFSET + 4].try_into().unwrap());
    let path_ptr = read_u64(PATH_PTR_OFFSET);
    let location_ptr = read_u64(LOCATION_PTR_OFFSET);
    let evidence_ptr = read_u64(EVIDENCE_PTR_OFFSET);

    let mut path = read_byte_string(file, path_ptr).unwrap_or_default();
    let location = read_wide_string(file, location_ptr).unwrap_or_default();

    let (evidence, mut host, mut request_path) = extract_evidence(file, evidence_ptr);
    if host.is_empty() || request_path.is_empty() {
        let (fallback_h, fallback_p) = fallback_host_path(file, evidence_ptr);
        if host.is_empty() {
            host = fallback_h;
        }
        if request_path.is_empty() {
            request_path = fallback_p;
        }
    }
    if !request_path.is_empty() {
        path = request_path;
    }
    let path = path.trim_end().to_string();

    Some(IssueMeta {
        record_offset: abs,
        serial,
        task_id,
        type_id,
        severity,
        confidence,
        host,
        path,
        location,
        definition: lookup.lookup(type_id).cloned(),
        evidence,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::defs::{DefinitionSet, NoDefinitions};

    /// Builds a minimal finding record with the given field values.
    pub(crate) fn issue_record(
        serial: u64,
        task_id: u64,
        path_ptr: u64,
        location_ptr: u64,
        severity: u8,
        confidence: u8,
        evidence_ptr: u64,
        type_id: u32,
    ) -> Vec<u8> {
        let mut rec = vec![0u8; MIN_ISSUE_RECORD_LEN];
        rec[..ISSUE_SIG.len()].copy_from_slice(&ISSUE_SIG);
        rec[SERIAL_OFFSET..SERIAL_OFFSET + 8].copy_from_slice(&serial.to_be_bytes());
        rec[TASK_ID_OFFSET..TASK_ID_OFFSET + 8].copy_from_slice(&task_id.to_be_bytes());
        rec[PATH_PTR_OFFSET..PATH_PTR_OFFSET + 8].copy_from_slice(&path_ptr.to_be_bytes());
        rec[LOCATION_PTR_OFFSET..LOCATION_PTR_OFFSET + 8]
            .copy_from_slice(&location_ptr.to_be_bytes());
        rec[SEVERITY_OFFSET] = severity;
        rec[CONFIDENCE_OFFSET] = confidence;
        rec[EVIDENCE_PTR_OFFSET..EVIDENCE_PTR_OFFSET + 8]
            .copy_from_slice(&evidence_ptr.to_be_bytes());
        rec[TYPE_ID_OFFSET..TYPE_ID_OFFSET + 4].copy_from_slice(&type_id.to_be_bytes());
        rec
    }

    /// Builds an index entry pointing at a finding record.
    pub(crate) fn index_record(issue_ptr: u64) -> Vec<u8> {
        let mut rec = vec![0u8; MIN_INDEX_RECORD_LEN];
        rec[..INDEX_SIG.len()].copy_from_slice(&INDEX_SIG);
        rec[INDEX_ISSUE_PTR_OFFSET as usize..INDEX_ISSUE_PTR_OFFSET as usize + 8]
            .copy_from_slice(&issue_ptr.to_be_bytes());
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
    fn severity_and_confidence_bytes() {
        assert_eq!(Severity::from_repr(1), Some(Severity::Info));
        assert_eq!(Severity::from_repr(4), Some(Severity::High));
        assert_eq!(Severity::from_repr(0), None);
        assert_eq!(Severity::from_repr(5), None);
        assert_eq!(Severity::Info.to_string(), "Information");

        assert_eq!(Confidence::from_repr(3), Some(Confidence::Certain));
        assert_eq!(Confidence::from_repr(4), None);
        assert_eq!(Confidence::Firm.to_string(), "Firm");
    }

    #[test]
    fn direct_scan_decodes_record() {
        let file = image(&[(
            0x400,
            issue_record(7, 42, 0, 0, 3, 2, 0, 0x0010_0A00),
        )]);

        let metas = scan_issue_metas(&file, &NoDefinitions);
        assert_eq!(metas.len(), 1);
        let meta = &metas[0];
        assert_eq!(meta.record_offset, 0x400);
        assert_eq!(meta.serial, 7);
        assert_eq!(meta.task_id, 42);
        assert_eq!(meta.severity, Severity::Medium);
        assert_eq!(meta.confidence, Confidence::Firm);
        assert_eq!(meta.type_id, 0x0010_0A00);
        assert!(meta.definition.is_none());
        assert!(meta.evidence.is_empty());
    }

    #[test]
    fn invalid_severity_rejects_record() {
        let file = image(&[(0x400, issue_record(7, 42, 0, 0, 9, 2, 0, 1))]);
        assert!(scan_issue_metas(&file, &NoDefinitions).is_empty());
    }

    #[test]
    fn record_reached_via_both_paths_emitted_once() {
        let file = image(&[
            (0x400, index_record(0x500)),
            (0x500, issue_record(11, 1, 0, 0, 4, 3, 0, 2)),
        ]);

        let metas = scan_issue_metas(&file, &NoDefinitions);
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].serial, 11);
        assert_eq!(metas[0].severity, Severity::High);
    }

    #[test]
    fn definition_resolves_through_lookup() {
        let defs = DefinitionSet::from_json_slice(
            br#"[{"typeIndex": 1048576, "name": "SQL injection"}]"#,
        )
        .unwrap();
        let file = image(&[(0x400, issue_record(1, 1, 0, 0, 2, 1, 0, 1048576))]);

        let metas = scan_issue_metas(&file, &defs);
        assert_eq!(metas[0].definition.as_ref().unwrap().name, "SQL injection");
    }

    #[test]
    fn display_sort_orders_by_severity_then_confidence_then_serial() {
        let file = image(&[
            (0x400, issue_record(5, 1, 0, 0, 2, 1, 0, 1)),
            (0x500, issue_record(3, 1, 0, 0, 4, 2, 0, 1)),
            (0x600, issue_record(9, 1, 0, 0, 4, 3, 0, 1)),
            (0x700, issue_record(1, 1, 0, 0, 4, 3, 0, 1)),
        ]);

        let mut metas = scan_issue_metas(&file, &NoDefinitions);
        sort_for_display(&mut metas);
        let serials: Vec<u64> = metas.iter().map(|m| m.serial).collect();
        assert_eq!(serials, vec![1, 9, 3, 5]);
    }
}
