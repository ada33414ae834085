//! Output module for crawl results
//!
//! This module handles:
//! - Writing the visited list and the per-URL errors
//! - Summarising a crawl for the log

pub mod stats;

pub use stats::CrawlStats;

use crate::crawler::CrawlResult;
use std::io::{self, Write};

/// Writes a crawl result as plain text
///
/// Visited URLs go to `out`, one per line. Errors go to `err` as
/// `url: error` lines, sorted by URL.
///
/// # Example
///
/// ```
/// use depth_crawler::output::write_report;
/// use depth_crawler::CrawlResult;
///
/// let result = CrawlResult {
///     visited: vec!["https://a.test/".to_string()],
///     ..Default::default()
/// };
/// let (mut out, mut err) = (Vec::new(), Vec::new());
/// write_report(&result, &mut out, &mut err).unwrap();
/// assert_eq!(out, b"https://a.test/\n");
/// assert!(err.is_empty());
/// ```
pub fn write_report<O: Write, E: Write>(
    result: &CrawlResult,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    for url in &result.visited {
        writeln!(out, "{}", url)?;
    }

    let mut failed: Vec<_> = result.errors.iter().collect();
    failed.sort_by(|a, b| a.0.cmp(b.0));
    for (url, error) in failed {
        writeln!(err, "{}: {}", url, error)?;
    }

    out.flush()?;
    err.flush()
}
