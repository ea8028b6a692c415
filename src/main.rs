// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr)
// 3. Build the HTTP downloader and the crawler, run one crawl, shut down
// 4. Print the results as a table or JSON
// 5. Exit with proper code (0 = all downloaded, 1 = some URLs failed, 2 = error)
// =============================================================================

mod cli;   // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - the crawler core
mod fetch; // src/fetch/ - HTTP downloading, link extraction, host parsing

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use cli::Cli;
use crawl::{CrawlResult, Crawler, CrawlerConfig};
use fetch::HttpDownloader;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = every dispatched URL was downloaded
//   Ok(1) = at least one URL failed
//   Err   = the crawl itself failed
async fn run() -> Result<i32> {
    // Parse CLI arguments first, so --help works without any log setup
    let cli = Cli::parse();
    init_logging(&cli);
    debug!(?cli, "CLI arguments parsed");

    let downloader = HttpDownloader::new(Duration::from_secs(cli.timeout))
        .context("failed to create HTTP client")?;
    let config = CrawlerConfig::new(cli.downloaders, cli.extractors, cli.per_host);
    let crawler = Crawler::new(Arc::new(downloader), config)?;
    debug!(config = ?crawler.config(), "crawler ready");

    info!(url = %cli.url, depth = cli.depth, "starting crawl");
    let outcome = crawler.crawl(&cli.url, cli.depth).await;
    crawler.shutdown();
    let result = outcome?;

    print_results(&result, cli.json)?;

    Ok(if result.is_clean() { 0 } else { 1 })
}

// RUST_LOG wins; otherwise -q / -v pick the level
fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// The JSON shape of a crawl result
#[derive(Debug, Serialize)]
struct Report<'a> {
    downloaded: Vec<&'a str>,
    errors: BTreeMap<&'a str, ReportError>,
}

#[derive(Debug, Serialize)]
struct ReportError {
    kind: &'static str,
    message: String,
}

impl<'a> From<&'a CrawlResult> for Report<'a> {
    fn from(result: &'a CrawlResult) -> Self {
        Report {
            downloaded: result.downloaded.iter().map(String::as_str).collect(),
            errors: result
                .errors
                .iter()
                .map(|(url, error)| {
                    let report = ReportError {
                        kind: error.kind(),
                        message: error.to_string(),
                    };
                    (url.as_str(), report)
                })
                .collect(),
        }
    }
}

fn print_results(result: &CrawlResult, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(&Report::from(result))?;
        println!("{}", json_output);
    } else {
        print_table(result);
    }
    Ok(())
}

fn print_table(result: &CrawlResult) {
    println!("{:<60} {:<15} {:<30}", "URL", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(105));

    for url in &result.downloaded {
        println!("{:<60} {:<15}", truncate(url), "✅ DOWNLOADED");
    }
    for (url, error) in &result.errors {
        let status = match error {
            crawl::UrlError::MalformedUrl { .. } => "⚠️  MALFORMED",
            crawl::UrlError::Fetch(_) => "❌ FAILED",
        };
        println!("{:<60} {:<15} {:<30}", truncate(url), status, error);
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Downloaded: {}", result.downloaded.len());
    println!("   ❌ Failed: {}", result.errors.len());
    println!("   📋 Total: {}", result.total());
}

// Keeps long URLs from wrecking the table layout
fn truncate(url: &str) -> String {
    if url.chars().count() > 57 {
        let head: String = url.chars().take(57).collect();
        format!("{}...", head)
    } else {
        url.to_string()
    }
}
