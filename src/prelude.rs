//! # burpscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! when working with project files. Import it to get everything a typical consumer
//! touches without spelling out the module paths:
//!
//! ```rust,no_run
//! use burpscope::prelude::*;
//! use std::path::Path;
//!
//! let reader = ProjectReader::open(Path::new("project.burp"))?;
//! let map = reader.site_map();
//! println!("{} hosts", map.hosts.len());
//! # Ok::<(), burpscope::Error>(())
//! ```

pub use crate::{
    defs::{DefinitionLookup, DefinitionSet, IssueDefinition, NoDefinitions},
    export::{export, export_issues, ExportFormat, ExportOptions},
    file::ProjectFile,
    filter::Filter,
    http::{HttpEntry, HttpMessage},
    project::{build_site_map, CancelToken, ProjectMetadata, ProjectReader, SiteMap},
    scan::{
        Confidence, HttpRecordLocation, IssueEvidence, IssueMeta, Severity, TaskSummary, UiTask,
    },
    search::{search, SearchOptions, SearchResult, SearchScope},
    Error, Result,
};
