//! Crawl engine - level-by-level orchestration
//!
//! The engine owns two worker pools for its whole lifetime and runs each
//! `download` call as a sequence of levels:
//!
//! 1. Dispatch every new, non-excluded URL of the level as a fetch job, gated
//!    by per-host admission
//! 2. Each successful fetch schedules a link-extraction job on the second pool
//! 3. Extracted links accumulate into the pending set of the next level
//! 4. The level barrier clears once every fetch and extraction is done
//! 5. The pending set becomes the next level, until the depth is used up or
//!    nothing new was found

use crate::config::{validate_engine_config, EngineConfig};
use crate::crawler::admission::HostAdmissionController;
use crate::crawler::barrier::{BarrierTicket, LevelBarrier};
use crate::crawler::pool::{Job, WorkerPool};
use crate::downloader::{Document, Downloader};
use crate::state::CrawlState;
use crate::url::{host_of, normalize_url, ExcludeFilter};
use crate::{CrawlError, PageError};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Outcome of one `download` call
#[derive(Debug, Default)]
pub struct CrawlResult {
    /// Successfully fetched URLs, sorted
    pub visited: Vec<String>,

    /// One error per failing URL
    pub errors: HashMap<String, PageError>,

    /// Number of levels whose work completed
    pub levels: u32,
}

impl CrawlResult {
    /// True when no URL failed
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Everything a single traversal shares with its jobs
struct CrawlContext<D: Downloader> {
    downloader: Arc<D>,
    fetch_pool: WorkerPool,
    extract_pool: WorkerPool,
    hosts: HostAdmissionController<Job>,
    barrier: Arc<LevelBarrier>,
    state: CrawlState,
    filter: ExcludeFilter,
}

/// Depth-bounded, level-synchronized crawler
///
/// # Example
///
/// ```
/// use depth_crawler::{CrawlEngine, EngineConfig, MemoryDownloader};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), depth_crawler::CrawlError> {
/// let downloader = MemoryDownloader::new()
///     .page("https://a.test/", ["https://a.test/b"])
///     .page("https://a.test/b", Vec::<String>::new());
///
/// let engine = CrawlEngine::new(downloader, &EngineConfig::new(4, 2, Some(2)))?;
/// let result = engine.download("https://a.test/", 2, &[]).await?;
/// assert_eq!(result.visited, vec!["https://a.test/", "https://a.test/b"]);
/// engine.close();
/// # Ok(())
/// # }
/// ```
pub struct CrawlEngine<D: Downloader> {
    downloader: Arc<D>,
    fetch_pool: WorkerPool,
    extract_pool: WorkerPool,
    per_host: Option<usize>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl<D: Downloader> CrawlEngine<D> {
    /// Creates an engine and starts both worker pools
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// * `CrawlError::Config` - Invalid worker counts or per-host ceiling
    /// * `CrawlError::Runtime` - A pool could not be started
    pub fn new(downloader: D, config: &EngineConfig) -> Result<Self, CrawlError> {
        validate_engine_config(config)?;

        let fetch_pool = WorkerPool::new("fetch", config.fetch_workers)?;
        let extract_pool = match WorkerPool::new("extract", config.extract_workers) {
            Ok(pool) => pool,
            Err(e) => {
                fetch_pool.shutdown();
                return Err(e);
            }
        };

        tracing::info!(
            fetch_workers = config.fetch_workers,
            extract_workers = config.extract_workers,
            per_host = ?config.per_host,
            "Crawl engine started"
        );

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            downloader: Arc::new(downloader),
            fetch_pool,
            extract_pool,
            per_host: config.per_host,
            closed: AtomicBool::new(false),
            shutdown,
        })
    }

    /// The downloader shared by all fetch workers
    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Crawls from `seed` for `depth` levels, skipping URLs that contain any
    /// of `excludes`
    ///
    /// Per-URL failures end up in [`CrawlResult::errors`]; the call itself
    /// only fails when the engine is closed before or during the crawl.
    pub async fn download(
        &self,
        seed: &str,
        depth: u32,
        excludes: &[String],
    ) -> Result<CrawlResult, CrawlError> {
        if self.is_closed() {
            return Err(CrawlError::EngineClosed);
        }
        if depth == 0 {
            return Ok(CrawlResult::default());
        }

        let ctx = Arc::new(CrawlContext {
            downloader: Arc::clone(&self.downloader),
            fetch_pool: self.fetch_pool.clone(),
            extract_pool: self.extract_pool.clone(),
            hosts: HostAdmissionController::new(self.per_host),
            barrier: Arc::new(LevelBarrier::new()),
            state: CrawlState::new(),
            filter: ExcludeFilter::new(excludes.iter().cloned()),
        });
        let mut shutdown = self.shutdown.subscribe();
        let started = Instant::now();

        // Discovered links are normalized, so the seed must be too.
        let seed = normalize_url(seed).map_or_else(|_| seed.to_string(), String::from);
        let mut level = vec![seed];
        let mut levels = 0;

        for remaining in (1..=depth).rev() {
            let dispatched = level
                .drain(..)
                .filter(|url| dispatch(&ctx, url.as_str()))
                .count();

            if dispatched == 0 {
                break;
            }
            tracing::info!(level = levels + 1, remaining, urls = dispatched, "Level dispatched");

            // Closing aborts the workers, which can also clear the barrier.
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|closed| *closed) => {
                    let dropped = ctx.hosts.abandon();
                    tracing::warn!(dropped, "Engine closed during crawl, abandoning level");
                    return Err(CrawlError::EngineClosed);
                }
                generation = ctx.barrier.arrive_and_await() => {
                    tracing::debug!(generation, "Level barrier cleared");
                }
            }
            levels += 1;

            if remaining > 1 {
                level = ctx.state.take_pending();
                if level.is_empty() {
                    tracing::debug!("No new links discovered, stopping early");
                }
            }
        }

        let (visited, errors) = ctx.state.take_results();
        tracing::info!(
            visited = visited.len(),
            errors = errors.len(),
            levels,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Crawl finished"
        );

        Ok(CrawlResult {
            visited,
            errors,
            levels,
        })
    }

    /// Same as [`download`](Self::download) with no exclusions
    pub async fn download_all(&self, seed: &str, depth: u32) -> Result<CrawlResult, CrawlError> {
        self.download(seed, depth, &[]).await
    }

    /// Shuts down both pools
    ///
    /// In-flight and queued work is abandoned. Later calls do nothing, and
    /// later downloads fail with `CrawlError::EngineClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.send_replace(true);
        self.fetch_pool.shutdown();
        self.extract_pool.shutdown();
        tracing::info!("Crawl engine closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<D: Downloader> Drop for CrawlEngine<D> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sends one URL down the fetch path
///
/// Returns true when the URL was new for this crawl (it is then either
/// scheduled or recorded as an error).
fn dispatch<D: Downloader>(ctx: &Arc<CrawlContext<D>>, url: &str) -> bool {
    if ctx.filter.is_excluded(url) || !ctx.state.mark_dispatched(url) {
        return false;
    }

    let host = match host_of(url) {
        Ok(host) => host,
        Err(e) => {
            tracing::warn!(url, error = %e, "Skipping URL without a usable host");
            ctx.state.record_error(url, PageError::InvalidUrl(e));
            return true;
        }
    };

    let ticket = ctx.barrier.ticket();
    let job: Job = Box::pin(fetch_page(Arc::clone(ctx), url.to_string(), host.clone(), ticket));

    match ctx.hosts.admit_or_defer(&host, job) {
        Some(job) => submit(&ctx.fetch_pool, job),
        None => tracing::trace!(url, host = %host, "Fetch deferred by host admission"),
    }
    true
}

fn submit(pool: &WorkerPool, job: Job) {
    if let Err(e) = pool.submit(job) {
        tracing::debug!(error = %e, "Dropping job");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Admission slot held by a running fetch
///
/// Dropping it gives the slot back, passing it to the host's next deferred
/// fetch if there is one. This also happens when the fetch is abandoned.
struct HostSlot<D: Downloader> {
    ctx: Arc<CrawlContext<D>>,
    host: String,
}

impl<D: Downloader> Drop for HostSlot<D> {
    fn drop(&mut self) {
        if let Some(next) = self.ctx.hosts.release(&self.host) {
            submit(&self.ctx.fetch_pool, next);
        }
    }
}

async fn fetch_page<D: Downloader>(
    ctx: Arc<CrawlContext<D>>,
    url: String,
    host: String,
    ticket: BarrierTicket,
) {
    tracing::debug!(url = %url, "Fetching");
    let slot = HostSlot {
        ctx: Arc::clone(&ctx),
        host,
    };
    // `fetch` itself may panic before returning its future.
    let outcome = AssertUnwindSafe(async { ctx.downloader.fetch(&url).await })
        .catch_unwind()
        .await;

    // The host slot is only held for the fetch itself.
    drop(slot);

    match outcome {
        Ok(Ok(document)) => {
            ctx.state.mark_downloaded(&url);
            // Registered before this fetch's own ticket is dropped.
            let extract_ticket = ctx.barrier.ticket();
            let job: Job = Box::pin(extract_page(
                Arc::clone(&ctx),
                url,
                document,
                extract_ticket,
            ));
            submit(&ctx.extract_pool, job);
        }
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "Fetch failed");
            ctx.state.record_error(&url, PageError::Fetch(e));
        }
        Err(payload) => {
            let message = panic_message(payload);
            tracing::error!(url = %url, message = %message, "Downloader panicked");
            ctx.state.record_error(
                &url,
                PageError::Panicked {
                    stage: "fetch",
                    message,
                },
            );
        }
    }

    drop(ticket);
}

async fn extract_page<D: Downloader>(
    ctx: Arc<CrawlContext<D>>,
    url: String,
    document: D::Document,
    ticket: BarrierTicket,
) {
    let outcome = tokio::task::spawn_blocking(move || document.extract_links()).await;

    match outcome {
        Ok(Ok(links)) => {
            let found = links.len();
            let added = ctx.state.add_discovered(links, &ctx.filter);
            tracing::debug!(url = %url, found, added, "Links extracted");
        }
        Ok(Err(e)) => {
            tracing::warn!(url = %url, error = %e, "Link extraction failed");
            ctx.state.record_error(&url, PageError::Extract(e));
        }
        Err(join_error) => {
            let message = match join_error.try_into_panic() {
                Ok(payload) => panic_message(payload),
                Err(e) => e.to_string(),
            };
            tracing::error!(url = %url, message = %message, "Link extraction panicked");
            ctx.state.record_error(
                &url,
                PageError::Panicked {
                    stage: "extract",
                    message,
                },
            );
        }
    }

    drop(ticket);
}
