use crate::url::ExcludeFilter;
use crate::PageError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Shared bookkeeping for a single traversal
///
/// - `dispatched`: every URL handed to the fetch path (the visited set used
///   for deduplication across all levels)
/// - `downloaded`: URLs whose fetch succeeded (the reported result)
/// - `pending`: links discovered during the current level
/// - `errors`: one entry per failing URL
#[derive(Debug, Default)]
pub struct CrawlState {
    dispatched: Mutex<HashSet<String>>,
    downloaded: Mutex<HashSet<String>>,
    pending: Mutex<HashSet<String>>,
    errors: Mutex<HashMap<String, PageError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a URL as dispatched
    ///
    /// Returns true only for the first caller; the check and the insert happen
    /// under one lock.
    pub fn mark_dispatched(&self, url: &str) -> bool {
        let mut dispatched = lock(&self.dispatched);
        if dispatched.contains(url) {
            return false;
        }
        dispatched.insert(url.to_string())
    }

    /// Records a successful fetch
    pub fn mark_downloaded(&self, url: &str) {
        lock(&self.downloaded).insert(url.to_string());
    }

    /// Adds links found on a page to the next level
    ///
    /// Links already dispatched in an earlier level, or matching the exclude
    /// filter, are dropped here. Returns the number of links that were new to
    /// the pending set.
    pub fn add_discovered<I>(&self, links: I, filter: &ExcludeFilter) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let dispatched = lock(&self.dispatched);
        let mut pending = lock(&self.pending);
        links
            .into_iter()
            .filter(|link| !filter.is_excluded(link) && !dispatched.contains(link))
            .filter(|link| pending.insert(link.clone()))
            .count()
    }

    /// Takes the links discovered during the level that just finished
    pub fn take_pending(&self) -> Vec<String> {
        lock(&self.pending).drain().collect()
    }

    /// Records an error for a URL
    ///
    /// The first error for a URL wins; a fetch failure is never followed by
    /// an extraction attempt, so at most one error is recorded per URL.
    pub fn record_error(&self, url: &str, error: PageError) {
        lock(&self.errors).entry(url.to_string()).or_insert(error);
    }

    /// Moves the accumulated results out, leaving the state empty
    ///
    /// Visited URLs are returned sorted.
    pub fn take_results(&self) -> (Vec<String>, HashMap<String, PageError>) {
        let mut visited: Vec<String> = lock(&self.downloaded).drain().collect();
        visited.sort();
        let errors = std::mem::take(&mut *lock(&self.errors));
        (visited, errors)
    }
}
