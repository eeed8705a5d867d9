use std::path::Path;

use burpscope::project::SiteMapNode;

use crate::{app::GlobalOptions, commands::common::open_project, output::print_output};

pub fn run(path: &Path, global: &GlobalOptions) -> anyhow::Result<()> {
    let reader = open_project(path)?;
    let map = reader.site_map();

    print_output(&map, global, |map| {
        for host in &map.hosts {
            println!("{} ({} entries)", host.host, host.entry_count);
            print_node(&host.root, 1);
        }
        if map.hosts.is_empty() {
            println!("No hosts.");
        }
    })
}

fn print_node(node: &SiteMapNode, depth: usize) {
    for child in &node.children {
        let count = child.entry_ids.len();
        let indent = "  ".repeat(depth);
        if count > 0 {
            println!("{indent}/{} ({count})", child.segment);
        } else {
            println!("{indent}/{}", child.segment);
        }
        print_node(child, depth + 1);
    }
}
