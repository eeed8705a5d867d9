//! Repeater tab-name decoder.
//!
//! Repeater tabs are found by a double anchor: the 8-byte header of a fixed-32 wide
//! string record, and a 16-byte tag that sits 0xB8 bytes after the header in every tab
//! record observed. Either signature alone collides with unrelated records; together
//! they do not. The tab name is the fixed-32 payload immediately after the header.

use rustc_hash::FxHashSet;

use crate::{
    file::ProjectFile,
    records::strings::decode_utf16be,
    scan::{next_index, scan_windows},
};

/// Header of a fixed-32 wide-string record: total_len 0x48, char_len 0x20.
const STRING_RECORD_HEADER: [u8; 8] = [0x00, 0x00, 0x00, 0x48, 0x00, 0x00, 0x00, 0x20];

/// Tag found 0xB8 bytes past the string header in repeater tab records.
const TAB_MARKER: [u8; 16] = [
    0x00, 0x02, 0x01, 0x00, 0x0a, 0x02, 0x00, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x58,
];

/// Distance from the string header to the marker tag.
const MARKER_OFFSET: usize = 0xb8;

/// Bytes a hit must provide: header through the end of the marker.
const MIN_RECORD_LEN: usize = MARKER_OFFSET + TAB_MARKER.len();

/// Payload of the name string starts right after the 8-byte header.
const NAME_OFFSET: usize = 8;

/// UTF-16 payload length of a fixed-32 string.
const NAME_BYTES: usize = 64;

/// Window overlap; must cover a whole tab record straddling a boundary.
const TAB_OVERLAP: usize = 512;

/// Scans the whole file for repeater tab names.
///
/// Duplicate names are dropped; first-seen order is kept, matching the tab order the
/// tool itself displays.
#[must_use]
pub fn scan_repeater_tabs(file: &ProjectFile) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = FxHashSet::default();

    scan_windows(file, TAB_OVERLAP, |_, data| {
        let mut idx = 0;
        while let Some(pos) = next_index(data, idx, &STRING_RECORD_HEADER) {
            if pos + MIN_RECORD_LEN <= data.len()
                && data[pos + MARKER_OFFSET..pos + MARKER_OFFSET + TAB_MARKER.len()] == TAB_MARKER
            {
                let name =
                    decode_utf16be(&data[pos + NAME_OFFSET..pos + NAME_OFFSET + NAME_BYTES]);
                if !name.is_empty() && seen.insert(name.clone()) {
                    names.push(name);
                }
            }
            idx = pos + 1;
        }
    });

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A full tab record: name string, filler, marker tag.
    fn tab_record(name: &str) -> Vec<u8> {
        let mut rec = vec![0u8; MIN_RECORD_LEN];
        rec[..8].copy_from_slice(&STRING_RECORD_HEADER);
        for (i, unit) in name.encode_utf16().take(32).enumerate() {
            rec[NAME_OFFSET + i * 2..NAME_OFFSET + i * 2 + 2].copy_from_slice(&unit.to_be_bytes());
        }
        rec[MARKER_OFFSET..].copy_from_slice(&TAB_MARKER);
        rec
    }

    fn image(records: &[(u64, Vec<u8>)]) -> ProjectFile {
        let end = records
            .iter()
            .map(|(at, bytes)| *at as usize + bytes.len())
            .max()
            .unwrap_or(0)
            .max(0x400);
        let mut data = vec![0u8; end];
        data[0..4].copy_from_slice(&ProjectFile::MAGIC.to_be_bytes());
        for (at, bytes) in records {
            data[*at as usize..*at as usize + bytes.len()].copy_from_slice(bytes);
        }
        ProjectFile::from_mem(data).unwrap()
    }

    #[test]
    fn finds_tab_name() {
        let file = image(&[(0x400, tab_record("My Tab"))]);
        assert_eq!(scan_repeater_tabs(&file), vec!["My Tab".to_string()]);
    }

    #[test]
    fn duplicate_names_reported_once() {
        let file = image(&[
            (0x400, tab_record("My Tab")),
            (0x600, tab_record("My Tab")),
            (0x800, tab_record("Other")),
        ]);
        assert_eq!(scan_repeater_tabs(&file), vec!["My Tab", "Other"]);
    }

    #[test]
    fn header_without_marker_is_ignored() {
        let mut rec = tab_record("Almost");
        rec[MARKER_OFFSET] = 0xFF;
        let file = image(&[(0x400, rec)]);
        assert!(scan_repeater_tabs(&file).is_empty());
    }

    #[test]
    fn empty_name_is_skipped() {
        let file = image(&[(0x400, tab_record(""))]);
        assert!(scan_repeater_tabs(&file).is_empty());
    }
}
