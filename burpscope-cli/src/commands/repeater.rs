use std::path::Path;

use crate::{app::GlobalOptions, commands::common::open_project, output::print_output};

pub fn run(path: &Path, global: &GlobalOptions) -> anyhow::Result<()> {
    let reader = open_project(path)?;
    let names = reader.repeater_tab_names();

    print_output(&*names, global, |names| {
        for name in names.iter() {
            println!("{name}");
        }
        if names.is_empty() {
            println!("No repeater tabs.");
        }
    })
}
