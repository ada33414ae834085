//! HTTP downloader implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Redirect handling (followed by the client, final URL kept as link base)
//! - Error classification

use crate::config::UserAgentConfig;
use crate::downloader::parser::parse_html;
use crate::downloader::{Document, Downloader};
use crate::url::normalize_url;
use crate::DownloadError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single fetch
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use depth_crawler::config::UserAgentConfig;
/// use depth_crawler::downloader::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.request_timeout_secs.min(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Downloader`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Downloader for HttpDownloader {
    type Document = HtmlDocument;

    /// Fetches a URL
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Non-2xx status | `DownloadError::Status` |
    /// | Transport failure / timeout | `DownloadError::Request` |
    /// | 2xx, `text/html` | document with body |
    /// | 2xx, other content type | document without links |
    async fn fetch(&self, url: &str) -> Result<HtmlDocument, DownloadError> {
        let request_error = |source| DownloadError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            tracing::debug!(url, content_type = %content_type, "Not HTML, no links will be extracted");
            return Ok(HtmlDocument {
                base_url: final_url,
                body: None,
            });
        }

        let body = response.text().await.map_err(request_error)?;
        Ok(HtmlDocument {
            base_url: final_url,
            body: Some(body),
        })
    }
}

/// A page fetched over HTTP
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    /// URL after redirects, used to resolve relative links
    base_url: Url,

    /// Page body, absent for non-HTML responses
    body: Option<String>,
}

impl HtmlDocument {
    pub fn new(base_url: Url, body: Option<String>) -> Self {
        Self { base_url, body }
    }
}

impl Document for HtmlDocument {
    fn extract_links(&self) -> Result<Vec<String>, DownloadError> {
        let Some(body) = &self.body else {
            return Ok(Vec::new());
        };

        let parsed = parse_html(body, &self.base_url).map_err(|message| DownloadError::Parse {
            url: self.base_url.to_string(),
            message,
        })?;

        let mut links: Vec<String> = parsed
            .links
            .iter()
            .filter_map(|link| normalize_url(link).ok())
            .map(String::from)
            .collect();
        links.sort();
        links.dedup();
        Ok(links)
    }
}
