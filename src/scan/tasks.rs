//! UI task-list decoder.
//!
//! Unlike every other record class, the task list has a fixed root: a list wrapper at
//! file offset 0x1F4. Each element is a compact typed record whose type tag selects how
//! the display name is built. Live crawl and audit tasks are required to carry a scope
//! string; custom tasks carry a user-given wide-string name; anything else degrades to a
//! generic label.
//!
//! Scope strings hang deep: task field 0x02 points at a wide-dialect container whose
//! field 3 holds a list wrapper, whose first element is a fixed-32 wide string.

use serde::Serialize;

use crate::{
    file::ProjectFile,
    records::{
        read_compact, read_fixed32_wide_string, read_list_wrapper, read_pointer_vector,
        read_wide, read_wide_string, CompactRecord,
    },
    Error::{LimitExceeded, MissingField},
    Result,
};

/// Fixed file offset of the task-list wrapper.
const TASK_LIST_OFFSET: u64 = 0x1F4;

/// Sanity cap on the task-list length.
const MAX_TASK_COUNT: u32 = 256;

/// Task field holding the pointer to the scope container.
const FIELD_SCOPE_CONTAINER: u8 = 0x02;

/// Task field holding the pointer to the user-given name.
const FIELD_CUSTOM_NAME: u8 = 0x08;

/// Scope-container field holding the pointer to the scope list.
const FIELD_SCOPE_LIST: u8 = 3;

/// One entry of the UI task list.
#[derive(Debug, Clone, Serialize)]
pub struct UiTask {
    /// Absolute file offset of the task record; stable across re-opens
    pub id: u64,
    /// Type tag of the task record
    #[serde(rename = "type")]
    pub task_type: u16,
    /// Display name, numbered the way the tool's UI numbers tasks
    pub name: String,
    /// Scope string, empty when the task type carries none
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

/// Walks the task list at its fixed root offset.
///
/// # Errors
/// Fails when the root wrapper is absent or malformed, the list is implausibly long,
/// or a crawl/audit task carries no scope string. Per the tool's own behavior this is
/// all-or-nothing: a corrupt task record fails the listing.
pub fn scan_ui_tasks(file: &ProjectFile) -> Result<Vec<UiTask>> {
    let wrapper = read_list_wrapper(file, TASK_LIST_OFFSET)?;
    if wrapper.count == 0 {
        return Ok(Vec::new());
    }
    if wrapper.count > MAX_TASK_COUNT {
        return Err(LimitExceeded {
            what: "UI task count",
            value: u64::from(wrapper.count),
            limit: u64::from(MAX_TASK_COUNT),
        });
    }

    let ptrs = read_pointer_vector(file, wrapper.vec_ptr)?;
    if (ptrs.len() as u32) < wrapper.count {
        return Err(invariant_error!(
            "task vector holds {} pointers, list claims {}",
            ptrs.len(),
            wrapper.count
        ));
    }

    let mut tasks = Vec::with_capacity(wrapper.count as usize);
    for (index, &task_ptr) in ptrs[..wrapper.count as usize].iter().enumerate() {
        if !file.contains_pointer(task_ptr) {
            return Err(invariant_error!(
                "task pointer at index {} not interior: 0x{:x}",
                index,
                task_ptr
            ));
        }

        let record = read_compact(file, task_ptr)?;
        let (scope, name) = build_display_name(file, task_ptr, &record, index + 1)?;
        tasks.push(UiTask {
            id: task_ptr,
            task_type: record.record_type,
            name,
            scope,
        });
    }

    Ok(tasks)
}

fn build_display_name(
    file: &ProjectFile,
    task_ptr: u64,
    record: &CompactRecord,
    index: usize,
) -> Result<(String, String)> {
    let scope = read_scope(file, task_ptr, record).unwrap_or_default();

    match record.record_type {
        4 => {
            if scope.is_empty() {
                return Err(invariant_error!(
                    "live passive crawl task at 0x{:x} carries no scope",
                    task_ptr
                ));
            }
            let name = format!("{index}. Live passive crawl from {scope}");
            Ok((scope, name))
        }
        5 => {
            if scope.is_empty() {
                return Err(invariant_error!(
                    "live audit task at 0x{:x} carries no scope",
                    task_ptr
                ));
            }
            let name = format!("{index}. Live audit from {scope}");
            Ok((scope, name))
        }
        2 | 3 => {
            let custom = read_custom_name(file, task_ptr, record).unwrap_or_default();
            if custom.is_empty() {
                return Ok((scope, format!("{index}. Custom task")));
            }
            if has_numeric_prefix(&custom) {
                return Ok((scope, custom));
            }
            Ok((scope, format!("{index}. {custom}")))
        }
        other => {
            if scope.is_empty() {
                Ok((String::new(), format!("{index}. Task (type={other})")))
            } else {
                let name = format!("{index}. Task (type={other}) {scope}");
                Ok((scope, name))
            }
        }
    }
}

/// True when the name already starts `digit`, `.`, space - the tool's own numbering.
fn has_numeric_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_digit() && s[1..].starts_with(". ")
}

fn read_custom_name(file: &ProjectFile, task_ptr: u64, record: &CompactRecord) -> Result<String> {
    let field_off = record
        .field_offset(FIELD_CUSTOM_NAME)
        .ok_or(MissingField {
            id: FIELD_CUSTOM_NAME,
        })?;

    let name_ptr = file.read_pointer_at(task_ptr + u64::from(field_off))?;
    Ok(read_wide_string(file, name_ptr)?.trim().to_string())
}

fn read_scope(file: &ProjectFile, task_ptr: u64, record: &CompactRecord) -> Result<String> {
    let field_off = record
        .field_offset(FIELD_SCOPE_CONTAINER)
        .ok_or(MissingField {
            id: FIELD_SCOPE_CONTAINER,
        })?;

    let container_ptr = file.read_pointer_at(task_ptr + u64::from(field_off))?;
    let container = read_wide(file, container_ptr)?;
    let list_field = container
        .field_offset(FIELD_SCOPE_LIST)
        .ok_or(MissingField {
            id: FIELD_SCOPE_LIST,
        })?;

    let list_ptr = file.read_pointer_at(container_ptr + u64::from(list_field))?;
    let wrapper = read_list_wrapper(file, list_ptr)?;
    if wrapper.count == 0 {
        return Ok(String::new());
    }

    let ptrs = read_pointer_vector(file, wrapper.vec_ptr)?;
    if ptrs.is_empty() {
        return Err(invariant_error!("scope vector empty, list claims {}", wrapper.count));
    }

    let scope = read_fixed32_wide_string(file, ptrs[0])?;
    Ok(scope.trim().to_string())
}
