use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// burpscope - Burp Suite project file inspection and export
#[derive(Debug, Parser)]
#[command(name = "burpscope", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display project overview: file size and per-section record counts.
    Info {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List proxy-history entries.
    History {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Filter by host (regex).
        #[arg(long)]
        host: Option<String>,

        /// Filter by status codes, e.g. "200,301-399,500".
        #[arg(long)]
        status: Option<String>,

        /// Filter by HTTP method (comma-separated).
        #[arg(long)]
        method: Option<String>,

        /// Filter by content-type substring (comma-separated).
        #[arg(long)]
        mime: Option<String>,

        /// Show at most this many entries.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Export proxy history to a file or stdout.
    Export {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Output format: json, jsonl, csv, or har.
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Write to this file instead of stdout.
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Leave message bodies out of the export.
        #[arg(long)]
        no_body: bool,

        /// Include the raw message bytes alongside the parsed parts.
        #[arg(long)]
        include_raw: bool,

        /// Truncate bodies beyond this many bytes (0 = unlimited).
        #[arg(long, default_value_t = 10 * 1024)]
        max_body_size: usize,
    },

    /// List scanner findings with severity and confidence.
    Issues {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Load issue definitions from this Burp Suite jar.
        #[arg(long, value_name = "JAR")]
        jar: Option<PathBuf>,

        /// Load issue definitions from this JSON file.
        #[arg(long, value_name = "JSON")]
        definitions: Option<PathBuf>,
    },

    /// List the UI task list with display names.
    Tasks {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List repeater tab names.
    Repeater {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Search proxy history for text or a regex.
    Search {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// The text or pattern to look for.
        #[arg(value_name = "QUERY")]
        query: String,

        /// Treat the query as a regular expression.
        #[arg(short, long)]
        regex: bool,

        /// Match case-sensitively.
        #[arg(long)]
        case_sensitive: bool,

        /// Search scope: all, requests, responses, headers, bodies, or urls.
        #[arg(long, default_value = "all")]
        scope: String,

        /// Stop after this many matching entries (0 = unlimited).
        #[arg(long, default_value_t = 0)]
        max_results: usize,
    },

    /// Print the site map grouped by host and path.
    Sitemap {
        /// Path to the project file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}
