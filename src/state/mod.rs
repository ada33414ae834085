//! Per-crawl shared state
//!
//! Everything in here is created fresh for one `download` call and mutated
//! concurrently by fetch and extraction tasks.

mod crawl_state;

pub use crawl_state::CrawlState;
