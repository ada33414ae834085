use serde::Deserialize;

/// Upper bound accepted for either worker pool
pub const MAX_WORKERS: usize = 1024;

/// Main configuration structure for Depth-Crawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub crawl: CrawlDefaults,
}

/// Worker pool sizing and per-host admission
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Number of concurrent fetch workers
    #[serde(rename = "fetch-workers", default = "default_workers")]
    pub fetch_workers: usize,

    /// Number of concurrent link-extraction workers
    #[serde(rename = "extract-workers", default = "default_workers")]
    pub extract_workers: usize,

    /// Maximum in-flight fetches per host (`None` means unbounded)
    #[serde(rename = "per-host", default)]
    pub per_host: Option<usize>,
}

impl EngineConfig {
    pub fn new(fetch_workers: usize, extract_workers: usize, per_host: Option<usize>) -> Self {
        Self {
            fetch_workers,
            extract_workers,
            per_host,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(default_workers(), default_workers(), None)
    }
}

/// User agent identification for the HTTP downloader
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Whole-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
            request_timeout_secs: default_timeout(),
        }
    }
}

/// Defaults for a crawl started from the command line
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlDefaults {
    /// Number of levels to crawl, the seed being level one
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// URL substrings that are never crawled
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl Default for CrawlDefaults {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            excludes: Vec::new(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_WORKERS)
}

fn default_crawler_name() -> String {
    "depth-crawler".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_depth() -> u32 {
    1
}
