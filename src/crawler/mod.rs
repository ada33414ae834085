//! Crawler module: the concurrency engine
//!
//! This module contains the level-synchronized crawl machinery:
//! - Bounded worker pools for fetching and link extraction
//! - Per-host admission control for fetches
//! - The level barrier that tracks fetch and extraction work per depth
//! - The engine that ties them together

mod admission;
mod barrier;
mod coordinator;
mod pool;

pub use admission::HostAdmissionController;
pub use barrier::{BarrierTicket, LevelBarrier};
pub use coordinator::{CrawlEngine, CrawlResult};
pub use pool::{Job, WorkerPool};
