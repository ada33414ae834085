//! Bounded worker pools
//!
//! A pool is a fixed set of tokio tasks draining one unbounded job queue, so
//! at most `workers` jobs run at a time and `submit` never waits. The engine
//! owns two of them, one for fetching and one for link extraction, sized
//! independently.

use crate::CrawlError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A unit of work executed by a pool worker
pub type Job = BoxFuture<'static, ()>;

struct PoolInner {
    name: &'static str,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Fixed-size pool of async workers
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WorkerPool {
    /// Starts `workers` worker tasks on the current tokio runtime
    ///
    /// # Errors
    ///
    /// * `CrawlError::Runtime` - Called outside a tokio runtime, or with zero
    ///   workers
    pub fn new(name: &'static str, workers: usize) -> Result<Self, CrawlError> {
        if workers == 0 {
            return Err(CrawlError::Runtime(format!(
                "{} pool needs at least one worker",
                name
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CrawlError::Runtime(format!("cannot start {} pool: {}", name, e)))?;

        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers)
            .map(|id| runtime.spawn(run_worker(name, id, Arc::clone(&receiver))))
            .collect();

        tracing::debug!(pool = name, workers, "Worker pool started");

        Ok(Self {
            inner: Arc::new(PoolInner {
                name,
                sender: Mutex::new(Some(sender)),
                handles: Mutex::new(handles),
            }),
        })
    }

    /// Queues a job
    ///
    /// # Errors
    ///
    /// * `CrawlError::PoolClosed` - The pool has been shut down; the job is
    ///   dropped
    pub fn submit(&self, job: Job) -> Result<(), CrawlError> {
        let closed = CrawlError::PoolClosed {
            pool: self.inner.name,
        };
        match lock(&self.inner.sender).as_ref() {
            Some(sender) => sender.send(job).map_err(|_| closed),
            None => Err(closed),
        }
    }

    /// Stops accepting work and aborts the workers
    ///
    /// Queued and running jobs are dropped rather than awaited. Calling this
    /// more than once has no further effect.
    pub fn shutdown(&self) {
        if lock(&self.inner.sender).take().is_none() {
            return;
        }

        let handles = std::mem::take(&mut *lock(&self.inner.handles));
        for handle in &handles {
            handle.abort();
        }
        tracing::debug!(pool = self.inner.name, "Worker pool shut down");
    }
}

async fn run_worker(
    pool: &'static str,
    id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
) {
    loop {
        // The queue lock is held only while waiting for the next job.
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::error!(pool, worker = id, "Job panicked");
        }
    }
    tracing::trace!(pool, worker = id, "Worker exiting");
}
