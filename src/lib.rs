// Copyright 2025-2026 The burpscope contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![allow(dead_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # burpscope
//!
//! A read-only forensic analyzer for Burp Suite project files. The on-disk format is a
//! proprietary binary container with no public schema; `burpscope` recovers its contents
//! from byte signatures, a typed-record descriptor convention, and pointer tables, and is
//! resilient to the unknown fields and false positives such an inference necessarily
//! meets.
//!
//! # Architecture
//!
//! The library is organized in layers, each building on the one below:
//!
//! - **File layer** - Memory-mapped window with bounds-checked reads and signature search
//! - **Record layer** - String, typed-record, and list/pointer-vector primitives
//! - **Scan layer** - Signature-based locators for HTTP traffic, scanner findings, UI
//!   tasks, and repeater tabs
//! - **Facade** - [`ProjectReader`] with immutable caches and a streaming history API
//! - **Consumers** - Filters, search, site map, and export writers over plain data
//!
//! ## Key Components
//!
//! - [`crate::ProjectReader`] - Main entry point for project analysis
//! - [`crate::file::ProjectFile`] - Low-level byte window
//! - [`crate::records`] - Record-level decoders
//! - [`crate::scan`] - Whole-file scanners
//! - [`crate::defs`] - Issue-definition dictionary and lookup injection
//! - [`crate::Error`] and [`crate::Result`] - Error handling
//!
//! # Usage Examples
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use burpscope::prelude::*;
//! use std::path::Path;
//!
//! let reader = ProjectReader::open(Path::new("project.burp"))?;
//! println!("{} HTTP entries", reader.http_history_count());
//!
//! for entry in reader.http_history().iter() {
//!     println!("{} {} -> {}", entry.method, entry.url, entry.status_code);
//! }
//!
//! for meta in reader.scanner_issue_metas().iter() {
//!     println!("[{}] {} {}", meta.severity, meta.host, meta.path);
//! }
//! # Ok::<(), burpscope::Error>(())
//! ```
//!
//! ## Streaming with cancellation
//!
//! ```rust,no_run
//! use burpscope::{CancelToken, ProjectReader};
//! use std::{path::Path, sync::Arc};
//!
//! let reader = Arc::new(ProjectReader::open(Path::new("project.burp"))?);
//! let cancel = CancelToken::new();
//! let (entries, errors) = reader.stream_http_history(cancel.clone());
//!
//! for entry in entries.iter().take(10) {
//!     println!("{}", entry.url);
//! }
//! cancel.cancel();
//! # Ok::<(), burpscope::Error>(())
//! ```
//!
//! # Resilience model
//!
//! Opening a file validates only the magic bytes; everything else is best-effort. During
//! scans, individual record failures are recovered locally: the record is skipped and the
//! scan continues. Only structurally unrecoverable conditions (a corrupt task-list root,
//! an unreadable file) surface as errors.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

pub mod defs;
pub mod export;
pub mod file;
pub mod filter;
pub mod http;
pub mod prelude;
pub mod project;
pub mod records;
pub mod scan;
pub mod search;
pub mod utils;

pub use error::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub use file::ProjectFile;
pub use http::{HttpEntry, HttpMessage};
pub use project::{CancelToken, ProjectMetadata, ProjectReader};
pub use scan::{Confidence, IssueMeta, Severity, UiTask};
