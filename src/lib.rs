//! Depth-Crawler: a level-synchronized, depth-bounded web crawler
//!
//! This crate walks a link graph breadth-first, one depth level at a time,
//! using two independently sized worker pools (fetching and link extraction),
//! a per-host concurrency ceiling, and a per-URL error map that never aborts
//! the traversal.

pub mod config;
pub mod crawler;
pub mod downloader;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Errors that are fatal to an engine operation as a whole
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl engine is closed")]
    EngineClosed,

    #[error("The {pool} pool is shut down")]
    PoolClosed { pool: &'static str },

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Failures reported by a [`downloader::Downloader`] or its documents
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("No such page: {url}")]
    NotFound { url: String },

    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("{url}: {message}")]
    Failed { url: String, message: String },
}

/// A single entry of the per-URL error map
#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[source] UrlError),

    #[error("fetch failed: {0}")]
    Fetch(#[source] DownloadError),

    #[error("link extraction failed: {0}")]
    Extract(#[source] DownloadError),

    #[error("{stage} task panicked: {message}")]
    Panicked { stage: &'static str, message: String },
}

impl PageError {
    /// Returns true if the URL never produced a document
    pub fn is_fetch_failure(&self) -> bool {
        !matches!(self, Self::Extract(_) | Self::Panicked { stage: "extract", .. })
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::{Config, EngineConfig};
pub use crawler::{CrawlEngine, CrawlResult};
pub use downloader::{Document, Downloader, HttpDownloader, MemoryDownloader};
pub use url::{host_of, normalize_url, ExcludeFilter};
