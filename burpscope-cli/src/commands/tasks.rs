use std::path::Path;

use anyhow::Context;

use crate::{app::GlobalOptions, commands::common::open_project, output::print_output};

pub fn run(path: &Path, global: &GlobalOptions) -> anyhow::Result<()> {
    let reader = open_project(path)?;
    let tasks = reader
        .ui_tasks()
        .context("failed to decode the task list")?;

    print_output(&*tasks, global, |tasks| {
        for task in tasks.iter() {
            println!("{}", task.name);
        }
        if tasks.is_empty() {
            println!("No tasks.");
        }
    })
}
