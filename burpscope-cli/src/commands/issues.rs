use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use burpscope::{
    defs::DefinitionSet,
    export::{exported_issue, ExportedIssue},
    scan::{severity_breakdown, sort_for_display},
};

use crate::{
    app::GlobalOptions,
    commands::common::open_project_with,
    output::{print_output, Align, TabWriter},
};

pub fn run(
    path: &Path,
    jar: Option<&Path>,
    definitions: Option<&Path>,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    // Explicit sources are hard errors; otherwise fall back silently (auto-detected
    // jar when present, the embedded dictionary when not).
    let defs = match (jar, definitions) {
        (Some(jar_path), _) => DefinitionSet::from_jar(jar_path)
            .with_context(|| format!("failed to load definitions from {}", jar_path.display()))?,
        (None, Some(json_path)) => {
            let blob = fs::read(json_path)
                .with_context(|| format!("failed to read {}", json_path.display()))?;
            DefinitionSet::from_json_slice(&blob).with_context(|| {
                format!("failed to load definitions from {}", json_path.display())
            })?
        }
        (None, None) => DefinitionSet::auto_detect(),
    };
    log::debug!("issue dictionary holds {} definitions", defs.len());

    let reader = open_project_with(path, Arc::new(defs))?;
    let mut metas = (*reader.scanner_issue_metas()).clone();
    sort_for_display(&mut metas);

    let rows: Vec<ExportedIssue> = metas.iter().map(exported_issue).collect();

    print_output(&rows, global, |rows| {
        let mut table = TabWriter::new(vec![
            ("SEVERITY", Align::Left),
            ("CONFIDENCE", Align::Left),
            ("SERIAL", Align::Right),
            ("NAME", Align::Left),
            ("HOST", Align::Left),
            ("PATH", Align::Left),
        ]);
        for row in rows {
            let name = row
                .name
                .clone()
                .unwrap_or_else(|| format!("type 0x{:08x}", row.type_id));
            table.row(vec![
                row.severity.clone(),
                row.confidence.clone(),
                row.serial_number.to_string(),
                name,
                row.host.clone(),
                row.path.clone(),
            ]);
        }
        table.print();

        let breakdown = severity_breakdown(&metas);
        let summary: Vec<String> = breakdown
            .iter()
            .map(|(severity, count)| format!("{severity}: {count}"))
            .collect();
        println!("\n{} findings ({})", metas.len(), summary.join(", "));
    })
}
