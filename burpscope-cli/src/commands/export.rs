use std::{fs, io::Write, path::Path};

use anyhow::{bail, Context};
use burpscope::export::{export, ExportFormat, ExportOptions};

use crate::{app::GlobalOptions, commands::common::open_project};

pub struct BodyOptions {
    pub no_body: bool,
    pub include_raw: bool,
    pub max_body_size: usize,
}

pub fn run(
    path: &Path,
    format: &str,
    output: Option<&Path>,
    body: BodyOptions,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let format = match format.to_ascii_lowercase().as_str() {
        "json" => ExportFormat::Json,
        "jsonl" | "jsonlines" => ExportFormat::JsonLines,
        "csv" => ExportFormat::Csv,
        "har" => ExportFormat::Har,
        other => bail!("unknown export format: {other}"),
    };

    let reader = open_project(path)?;
    let history = reader.http_history();

    let opts = ExportOptions {
        format,
        include_body: !body.no_body,
        include_raw: body.include_raw,
        max_body_size: body.max_body_size,
        // on stdout in --json mode, keep the output machine-friendly
        pretty_print: !global.json,
    };

    match output {
        Some(out_path) => {
            let mut file = fs::File::create(out_path)
                .with_context(|| format!("failed to create {}", out_path.display()))?;
            export(&mut file, &history, &opts)
                .with_context(|| format!("failed to export history to {}", out_path.display()))?;
            log::info!("wrote {} entries to {}", history.len(), out_path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            export(&mut lock, &history, &opts).context("failed to export history")?;
            lock.flush()?;
        }
    }

    Ok(())
}
