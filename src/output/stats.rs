//! Statistics for a finished crawl

use crate::crawler::CrawlResult;
use std::fmt;

/// Crawl statistics summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlStats {
    /// Number of pages fetched successfully
    pub visited: usize,

    /// URLs that never produced a document
    pub fetch_errors: usize,

    /// Fetched pages whose links could not be extracted
    pub extract_errors: usize,

    /// Levels that ran to completion
    pub levels: u32,
}

impl CrawlStats {
    pub fn from_result(result: &CrawlResult) -> Self {
        let fetch_errors = result
            .errors
            .values()
            .filter(|e| e.is_fetch_failure())
            .count();

        Self {
            visited: result.visited.len(),
            fetch_errors,
            extract_errors: result.errors.len() - fetch_errors,
            levels: result.levels,
        }
    }

    /// Total number of URLs that were attempted
    pub fn attempted(&self) -> usize {
        self.visited + self.fetch_errors
    }
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} visited, {} fetch errors, {} extraction errors over {} levels",
            self.visited, self.fetch_errors, self.extract_errors, self.levels
        )
    }
}
