// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the CLI structure is a plain Rust struct and clap
// generates the parsing, --help and --version from its attributes.
//
// Usage:
//   level-crawler <URL> [--depth N] [--downloaders N] [--extractors N]
//                       [--per-host N] [--timeout SECS] [--json] [-v|-q]
// =============================================================================

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "level-crawler",
    version,
    about = "Crawl a website breadth-first, level by level",
    long_about = "level-crawler downloads a start page, then every page it links to, and so on, \
                  up to a depth limit. Downloads and link extraction run on separate worker pools, \
                  and no host ever gets more than --per-host downloads at once."
)]
pub struct Cli {
    /// URL to start crawling from (e.g., https://example.com)
    pub url: String,

    /// How many levels to download
    ///
    /// Depth 1 = just the starting page
    /// Depth 2 = starting page + all pages it links to
    /// Depth 0 = download nothing
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    /// Number of concurrent download workers
    #[arg(long, default_value_t = 32)]
    pub downloaders: usize,

    /// Number of concurrent link extraction workers
    #[arg(long, default_value_t = 8)]
    pub extractors: usize,

    /// Maximum concurrent downloads from a single host
    #[arg(long, default_value_t = 4)]
    pub per_host: usize,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// More logging (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
