use std::path::Path;

use anyhow::{bail, Context};
use burpscope::search::{search, SearchMatch, SearchOptions, SearchScope};
use serde::Serialize;

use crate::{app::GlobalOptions, commands::common::open_project, output::print_output};

pub struct SearchFlags<'a> {
    pub regex: bool,
    pub case_sensitive: bool,
    pub scope: &'a str,
    pub max_results: usize,
}

#[derive(Debug, Serialize)]
struct SearchRow {
    id: u64,
    url: String,
    score: usize,
    matches: Vec<SearchMatch>,
}

pub fn run(
    path: &Path,
    query: &str,
    flags: SearchFlags<'_>,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let scope = match flags.scope.to_ascii_lowercase().as_str() {
        "all" => SearchScope::All,
        "requests" => SearchScope::Requests,
        "responses" => SearchScope::Responses,
        "headers" => SearchScope::Headers,
        "bodies" => SearchScope::Bodies,
        "urls" => SearchScope::Urls,
        other => bail!("unknown search scope: {other}"),
    };

    let reader = open_project(path)?;
    let history = reader.http_history();

    let results = search(
        &history,
        &SearchOptions {
            query: query.to_string(),
            case_sensitive: flags.case_sensitive,
            scope,
            regex: flags.regex,
            max_results: flags.max_results,
        },
    )
    .context("failed to run search")?;

    let rows: Vec<SearchRow> = results
        .into_iter()
        .map(|result| SearchRow {
            id: result.entry.id,
            url: result.entry.url.clone(),
            score: result.score,
            matches: result.matches,
        })
        .collect();

    print_output(&rows, global, |rows| {
        for row in rows {
            println!("#{} {} ({} matches)", row.id, row.url, row.score);
            for found in &row.matches {
                println!("  [{}] {}", found.location, found.context);
            }
        }
        println!("\n{} matching entries", rows.len());
    })
}
