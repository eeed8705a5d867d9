mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // Show burpscope info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("burpscope", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Info { path } => commands::info::run(path, &cli.global),
        Command::History {
            path,
            host,
            status,
            method,
            mime,
            limit,
        } => commands::history::run(
            path,
            commands::history::HistoryOptions {
                host: host.as_deref(),
                status: status.as_deref(),
                method: method.as_deref(),
                mime: mime.as_deref(),
                limit: *limit,
            },
            &cli.global,
        ),
        Command::Export {
            path,
            format,
            output,
            no_body,
            include_raw,
            max_body_size,
        } => commands::export::run(
            path,
            format,
            output.as_deref(),
            commands::export::BodyOptions {
                no_body: *no_body,
                include_raw: *include_raw,
                max_body_size: *max_body_size,
            },
            &cli.global,
        ),
        Command::Issues {
            path,
            jar,
            definitions,
        } => commands::issues::run(path, jar.as_deref(), definitions.as_deref(), &cli.global),
        Command::Tasks { path } => commands::tasks::run(path, &cli.global),
        Command::Repeater { path } => commands::repeater::run(path, &cli.global),
        Command::Search {
            path,
            query,
            regex,
            case_sensitive,
            scope,
            max_results,
        } => commands::search::run(
            path,
            query,
            commands::search::SearchFlags {
                regex: *regex,
                case_sensitive: *case_sensitive,
                scope,
                max_results: *max_results,
            },
            &cli.global,
        ),
        Command::Sitemap { path } => commands::sitemap::run(path, &cli.global),
    }
}
