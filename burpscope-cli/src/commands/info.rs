use std::path::Path;

use serde::Serialize;

use crate::{app::GlobalOptions, commands::common::open_project, output::print_output};

#[derive(Debug, Serialize)]
pub struct ProjectInfo {
    pub file: String,
    pub file_size: u64,
    pub http_entries: usize,
    pub scanner_issues: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_tasks: Option<usize>,
    pub repeater_tabs: usize,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let reader = open_project(path)?;

    // A corrupt task list should not sink the overview; report it as unknown.
    let ui_tasks = match reader.ui_tasks() {
        Ok(tasks) => Some(tasks.len()),
        Err(err) => {
            log::debug!("task list unreadable: {err}");
            None
        }
    };

    let info = ProjectInfo {
        file: path.display().to_string(),
        file_size: reader.metadata().file_size,
        http_entries: reader.http_history_count(),
        scanner_issues: reader.scanner_issue_metas().len(),
        ui_tasks,
        repeater_tabs: reader.repeater_tab_names().len(),
    };

    print_output(&info, opts, |info| {
        println!("File:            {}", info.file);
        println!("Size:            {} bytes", info.file_size);
        println!("HTTP entries:    {}", info.http_entries);
        println!("Scanner issues:  {}", info.scanner_issues);
        match info.ui_tasks {
            Some(count) => println!("UI tasks:        {count}"),
            None => println!("UI tasks:        (unreadable)"),
        }
        println!("Repeater tabs:   {}", info.repeater_tabs);
    })
}
