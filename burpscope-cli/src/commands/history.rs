use std::path::Path;

use burpscope::{
    export::{exported_entry, ExportOptions, ExportedEntry},
    filter::{parse_status_codes, Filter},
};

use crate::{
    app::GlobalOptions,
    commands::common::open_project,
    output::{print_output, Align, TabWriter},
};

pub struct HistoryOptions<'a> {
    pub host: Option<&'a str>,
    pub status: Option<&'a str>,
    pub method: Option<&'a str>,
    pub mime: Option<&'a str>,
    pub limit: Option<usize>,
}

pub fn run(path: &Path, opts: HistoryOptions<'_>, global: &GlobalOptions) -> anyhow::Result<()> {
    let reader = open_project(path)?;
    let history = reader.http_history();

    let mut filter = Filter::new();
    if let Some(host) = opts.host {
        filter = filter.with_host(host);
    }
    if let Some(status) = opts.status {
        let (codes, min, max) = parse_status_codes(status);
        filter = filter.with_status_codes(codes).with_status_range(min, max);
    }
    if let Some(method) = opts.method {
        filter = filter.with_methods(method.split(',').map(str::to_string).collect());
    }
    if let Some(mime) = opts.mime {
        filter = filter.with_content_types(mime.split(',').map(str::to_string).collect());
    }

    let mut entries = filter.apply(&history);
    if let Some(limit) = opts.limit {
        entries.truncate(limit);
    }

    // Listings carry no bodies; use `export` for the full messages.
    let export_opts = ExportOptions {
        include_body: false,
        ..ExportOptions::default()
    };
    let rows: Vec<ExportedEntry> = entries
        .iter()
        .map(|entry| exported_entry(entry, &export_opts))
        .collect();

    print_output(&rows, global, |rows| {
        let mut table = TabWriter::new(vec![
            ("ID", Align::Right),
            ("METHOD", Align::Left),
            ("STATUS", Align::Right),
            ("LENGTH", Align::Right),
            ("MIME", Align::Left),
            ("URL", Align::Left),
        ]);
        for row in rows {
            table.row(vec![
                row.id.to_string(),
                row.method.clone(),
                row.status_code.to_string(),
                row.content_length.to_string(),
                row.mime_type.clone(),
                row.url.clone(),
            ]);
        }
        table.print();
        println!("\n{} entries", rows.len());
    })
}
