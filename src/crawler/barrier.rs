//! Level barrier
//!
//! A generation-counted synchronization point: tasks register before they are
//! scheduled and deregister when they finish, and the orchestrator waits for
//! the outstanding count of the current generation to drop to zero. A task
//! that spawns follow-up work registers the follow-up *before* deregistering
//! itself, so the count can only reach zero once the whole tree of work for a
//! level is done.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Phase {
    generation: u64,
    outstanding: usize,
}

/// Generation-scoped completion barrier
#[derive(Debug, Default)]
pub struct LevelBarrier {
    phase: Mutex<Phase>,
    idle: Notify,
}

impl LevelBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers one task that is about to be scheduled
    pub fn register(&self) {
        self.phase().outstanding += 1;
    }

    /// Marks one registered task as finished
    ///
    /// An unmatched call is ignored, keeping the outstanding count at zero
    /// or above.
    pub fn arrive_and_deregister(&self) {
        let now_idle = {
            let mut phase = self.phase();
            if phase.outstanding == 0 {
                tracing::warn!(
                    generation = phase.generation,
                    "Barrier deregistration without a matching registration"
                );
                return;
            }
            phase.outstanding -= 1;
            phase.outstanding == 0
        };

        if now_idle {
            self.idle.notify_waiters();
        }
    }

    /// Waits until no registered task is outstanding, then advances the
    /// generation
    ///
    /// Returns the generation that was just completed.
    pub async fn arrive_and_await(&self) -> u64 {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Registered as a waiter before the count is checked, so a
            // notification between the check and the await is not lost.
            notified.as_mut().enable();

            {
                let mut phase = self.phase();
                if phase.outstanding == 0 {
                    let completed = phase.generation;
                    phase.generation += 1;
                    return completed;
                }
            }

            notified.await;
        }
    }

    /// Registers a task and returns a guard that deregisters it on drop
    pub fn ticket(self: &Arc<Self>) -> BarrierTicket {
        self.register();
        BarrierTicket {
            barrier: Arc::clone(self),
        }
    }

    /// Number of the generation currently being accumulated
    pub fn generation(&self) -> u64 {
        self.phase().generation
    }

    /// Registered tasks that have not yet deregistered
    pub fn outstanding(&self) -> usize {
        self.phase().outstanding
    }
}

/// One registration with a [`LevelBarrier`]
///
/// Dropping the ticket deregisters, which also covers tasks that are
/// abandoned or unwind before completing.
#[derive(Debug)]
pub struct BarrierTicket {
    barrier: Arc<LevelBarrier>,
}

impl Drop for BarrierTicket {
    fn drop(&mut self) {
        self.barrier.arrive_and_deregister();
    }
}
