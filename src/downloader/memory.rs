//! In-memory downloader
//!
//! Serves a fixed link graph and keeps a journal of what the engine did with
//! it: the order of fetch and extraction events, how often each URL was
//! fetched, and the highest number of concurrent fetches seen per host.

use crate::downloader::{Document, Downloader};
use crate::url::host_of;
use crate::DownloadError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Something the engine did with a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    FetchStarted(String),
    FetchFinished(String),
    LinksExtracted(String),
}

#[derive(Debug, Clone, Default)]
struct PageSpec {
    links: Vec<String>,
    fetch_error: Option<String>,
    extract_error: Option<String>,
}

#[derive(Debug, Default)]
struct Journal {
    events: Vec<FetchEvent>,
    fetch_counts: HashMap<String, usize>,
    in_flight: HashMap<String, usize>,
    peak_in_flight: HashMap<String, usize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`Downloader`] over a static page graph
///
/// # Example
///
/// ```
/// use depth_crawler::downloader::MemoryDownloader;
///
/// let downloader = MemoryDownloader::new()
///     .page("https://a.test/", ["https://a.test/b", "https://a.test/c"])
///     .page("https://a.test/b", ["https://a.test/d"])
///     .failing_fetch("https://a.test/c", "connection reset");
/// assert_eq!(downloader.fetch_count("https://a.test/"), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDownloader {
    pages: HashMap<String, PageSpec>,
    latency: Duration,
    journal: Arc<Mutex<Journal>>,
}

impl MemoryDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page with the given outbound links
    pub fn page<I, S>(mut self, url: &str, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages.entry(url.to_string()).or_default().links =
            links.into_iter().map(Into::into).collect();
        self
    }

    /// Makes fetching `url` fail with `message`
    pub fn failing_fetch(mut self, url: &str, message: &str) -> Self {
        self.pages.entry(url.to_string()).or_default().fetch_error = Some(message.to_string());
        self
    }

    /// Makes link extraction for `url` fail with `message`
    pub fn failing_extract(mut self, url: &str, message: &str) -> Self {
        self.pages.entry(url.to_string()).or_default().extract_error = Some(message.to_string());
        self
    }

    /// Delays every fetch by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of times `url` was fetched
    pub fn fetch_count(&self, url: &str) -> usize {
        lock(&self.journal).fetch_counts.get(url).copied().unwrap_or(0)
    }

    /// Total number of fetches performed
    pub fn total_fetches(&self) -> usize {
        lock(&self.journal).fetch_counts.values().sum()
    }

    /// Highest number of simultaneous fetches observed for `host`
    pub fn peak_in_flight(&self, host: &str) -> usize {
        lock(&self.journal)
            .peak_in_flight
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    /// Every event in the order it happened
    pub fn events(&self) -> Vec<FetchEvent> {
        lock(&self.journal).events.clone()
    }

    fn host_key(url: &str) -> String {
        host_of(url).unwrap_or_else(|_| url.to_string())
    }

    fn begin(&self, url: &str) {
        let host = Self::host_key(url);
        let mut journal = lock(&self.journal);
        journal.events.push(FetchEvent::FetchStarted(url.to_string()));
        *journal.fetch_counts.entry(url.to_string()).or_default() += 1;

        let current = {
            let count = journal.in_flight.entry(host.clone()).or_default();
            *count += 1;
            *count
        };
        let peak = journal.peak_in_flight.entry(host).or_default();
        *peak = (*peak).max(current);
    }

    fn finish(&self, url: &str) {
        let host = Self::host_key(url);
        let mut journal = lock(&self.journal);
        journal.events.push(FetchEvent::FetchFinished(url.to_string()));
        if let Some(count) = journal.in_flight.get_mut(&host) {
            *count = count.saturating_sub(1);
        }
    }
}

impl Downloader for MemoryDownloader {
    type Document = MemoryDocument;

    async fn fetch(&self, url: &str) -> Result<MemoryDocument, DownloadError> {
        self.begin(url);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.finish(url);

        let spec = self.pages.get(url).ok_or_else(|| DownloadError::NotFound {
            url: url.to_string(),
        })?;

        if let Some(message) = &spec.fetch_error {
            return Err(DownloadError::Failed {
                url: url.to_string(),
                message: message.clone(),
            });
        }

        Ok(MemoryDocument {
            url: url.to_string(),
            spec: spec.clone(),
            journal: Arc::clone(&self.journal),
        })
    }
}

/// A page served by [`MemoryDownloader`]
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    url: String,
    spec: PageSpec,
    journal: Arc<Mutex<Journal>>,
}

impl Document for MemoryDocument {
    fn extract_links(&self) -> Result<Vec<String>, DownloadError> {
        let result = match &self.spec.extract_error {
            Some(message) => Err(DownloadError::Parse {
                url: self.url.clone(),
                message: message.clone(),
            }),
            None => Ok(self.spec.links.clone()),
        };

        lock(&self.journal)
            .events
            .push(FetchEvent::LinksExtracted(self.url.clone()));
        result
    }
}
