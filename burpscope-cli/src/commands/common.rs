use std::{path::Path, sync::Arc};

use anyhow::Context;
use burpscope::{defs::DefinitionLookup, ProjectReader};

/// Opens a project with the embedded issue-definition dictionary.
pub fn open_project(path: &Path) -> anyhow::Result<ProjectReader> {
    ProjectReader::open(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Opens a project with a caller-chosen definition lookup.
pub fn open_project_with(
    path: &Path,
    definitions: Arc<dyn DefinitionLookup>,
) -> anyhow::Result<ProjectReader> {
    ProjectReader::open_with_definitions(path, definitions)
        .with_context(|| format!("failed to open {}", path.display()))
}
