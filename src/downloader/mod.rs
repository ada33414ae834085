//! Downloader capability
//!
//! The engine never talks to the network itself. It is handed a
//! [`Downloader`] that turns a URL into a [`Document`], and a document knows
//! how to list its outbound links. Both steps may fail; failures are recorded
//! per URL by the engine.

mod http;
mod memory;
mod parser;

pub use http::{build_http_client, HtmlDocument, HttpDownloader};
pub use memory::{FetchEvent, MemoryDocument, MemoryDownloader};
pub use parser::{parse_html, ParsedPage};

use crate::DownloadError;
use std::future::Future;

/// Retrieves documents by URL
///
/// Implementations are shared between all fetch workers, so they must be
/// `Send + Sync`, and the returned future must be `Send`.
pub trait Downloader: Send + Sync + 'static {
    type Document: Document;

    /// Fetches the document at `url`
    fn fetch(&self, url: &str)
        -> impl Future<Output = Result<Self::Document, DownloadError>> + Send;
}

/// A fetched page
///
/// Link extraction is CPU-bound and is run on a blocking thread by the
/// extraction pool.
pub trait Document: Send + 'static {
    /// Returns the absolute URLs this document links to
    fn extract_links(&self) -> Result<Vec<String>, DownloadError>;
}
