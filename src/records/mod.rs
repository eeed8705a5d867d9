//! Record-level decoders for the project-file container.
//!
//! The container stores heterogeneous records with no global table of contents; each record
//! class is recognized by a constant byte signature or a typed-record descriptor convention
//! and decoded at a pointer produced by another record. This module holds the three record
//! primitives everything else composes:
//!
//! - [`crate::records::strings`] - byte-string and wide-string record layouts
//! - [`crate::records::typed`] - typed records (compact and wide field-count dialects)
//! - [`crate::records::list`] - list wrapper and pointer-vector records
//!
//! All decoders take the [`crate::file::ProjectFile`] window plus an absolute pointer, and
//! report structured errors; callers decide whether a failure is fatal or a skippable
//! false positive.

pub mod list;
pub mod strings;
pub mod typed;

pub use list::{read_list_wrapper, read_pointer_vector, ListWrapper};
pub use strings::{
    read_byte_string, read_byte_string_raw, read_fixed32_wide_string, read_wide_string,
};
pub use typed::{pointer_children, read_compact, read_wide, CompactRecord, FieldDesc, WideRecord};
