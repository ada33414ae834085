//! Depth-Crawler main entry point
//!
//! Crawls from a seed URL and prints every visited URL on standard output.
//! Per-URL errors are printed on standard error.

use anyhow::Context;
use clap::Parser;
use depth_crawler::config::{load_config_with_hash, validate, Config};
use depth_crawler::output::{write_report, CrawlStats};
use depth_crawler::{CrawlEngine, HttpDownloader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Depth-Crawler: a level-synchronized web crawler
///
/// Walks the link graph breadth-first from URL, fetching at most DEPTH
/// levels. Positional arguments override the configuration file.
#[derive(Parser, Debug)]
#[command(name = "crawl")]
#[command(version)]
#[command(about = "A level-synchronized, depth-bounded web crawler", long_about = None)]
struct Cli {
    /// Seed URL
    url: String,

    /// Number of levels to crawl (the seed is level 1)
    depth: Option<u32>,

    /// Number of concurrent fetch workers
    fetch_workers: Option<usize>,

    /// Number of concurrent link-extraction workers
    extract_workers: Option<usize>,

    /// Maximum concurrent fetches per host
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip URLs containing this substring (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "SUBSTRING")]
    excludes: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let depth = cli.depth.unwrap_or(config.crawl.depth);
    let mut excludes = config.crawl.excludes.clone();
    excludes.extend(cli.excludes.iter().cloned());

    let downloader =
        HttpDownloader::new(&config.user_agent).context("Failed to build HTTP client")?;
    let engine =
        CrawlEngine::new(downloader, &config.engine).context("Failed to start crawl engine")?;

    tracing::info!(url = %cli.url, depth, excludes = excludes.len(), "Starting crawl");
    let result = engine.download(&cli.url, depth, &excludes).await;
    engine.close();
    let result = result.context("Crawl aborted")?;

    tracing::info!("{}", CrawlStats::from_result(&result));

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    write_report(&result, &mut stdout.lock(), &mut stderr.lock())
        .context("Failed to write crawl report")?;

    Ok(())
}

/// Loads the configuration file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(workers) = cli.fetch_workers {
        config.engine.fetch_workers = workers;
    }
    if let Some(workers) = cli.extract_workers {
        config.engine.extract_workers = workers;
    }
    if let Some(per_host) = cli.per_host {
        config.engine.per_host = Some(per_host);
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries only the visited URLs.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("depth_crawler=warn,crawl=warn"),
            1 => EnvFilter::new("depth_crawler=info,crawl=info"),
            2 => EnvFilter::new("depth_crawler=debug,crawl=debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
