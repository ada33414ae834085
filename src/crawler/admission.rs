//! Per-host admission control
//!
//! This module handles:
//! - Counting in-flight fetches per host
//! - Deferring work for hosts that are at their ceiling
//! - Handing a released slot straight to the oldest deferred task (FIFO per host)

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-host slot accounting
struct HostSlots<T> {
    /// Fetches currently admitted for this host
    in_flight: usize,

    /// Tasks waiting for a slot, oldest first
    deferred: VecDeque<T>,
}

impl<T> HostSlots<T> {
    fn new() -> Self {
        Self {
            in_flight: 0,
            deferred: VecDeque::new(),
        }
    }

    /// Takes a slot if one is free and nobody is queued ahead
    fn try_take(&mut self, limit: usize) -> bool {
        let free = self.in_flight < limit && self.deferred.is_empty();
        if free {
            self.in_flight += 1;
        }
        free
    }
}

/// Keyed concurrency gate
///
/// `T` is the deferred unit of work; the engine stores boxed fetch jobs.
/// With no ceiling configured every call admits immediately and nothing is
/// tracked.
pub struct HostAdmissionController<T> {
    limit: Option<usize>,
    hosts: Mutex<HashMap<String, HostSlots<T>>>,
}

impl<T> HostAdmissionController<T> {
    /// Creates a controller; `None` means unbounded
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn hosts(&self) -> MutexGuard<'_, HashMap<String, HostSlots<T>>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a slot for `host` if one is free
    ///
    /// A host with deferred work is treated as full so that waiting tasks are
    /// not overtaken.
    pub fn try_admit(&self, host: &str) -> bool {
        let Some(limit) = self.limit else {
            return true;
        };

        self.hosts()
            .entry(host.to_string())
            .or_insert_with(HostSlots::new)
            .try_take(limit)
    }

    /// Admits `task` or queues it behind the host's earlier deferred tasks
    ///
    /// Returns the task when it may run now; `None` means it was deferred and
    /// will be returned by a later [`release`](Self::release).
    pub fn admit_or_defer(&self, host: &str, task: T) -> Option<T> {
        let Some(limit) = self.limit else {
            return Some(task);
        };

        let mut hosts = self.hosts();
        let slots = hosts.entry(host.to_string()).or_insert_with(HostSlots::new);
        if slots.try_take(limit) {
            Some(task)
        } else {
            tracing::trace!(
                host,
                in_flight = slots.in_flight,
                deferred = slots.deferred.len() + 1,
                "Deferring task for host at its ceiling"
            );
            slots.deferred.push_back(task);
            None
        }
    }

    /// Gives back a slot for `host`
    ///
    /// If a task is waiting for this host the slot passes directly to it and
    /// the task is returned for scheduling; the in-flight count is unchanged.
    pub fn release(&self, host: &str) -> Option<T> {
        self.limit?;

        let mut hosts = self.hosts();
        let slots = hosts.get_mut(host)?;

        if let Some(next) = slots.deferred.pop_front() {
            return Some(next);
        }

        slots.in_flight = slots.in_flight.saturating_sub(1);
        if slots.in_flight == 0 {
            hosts.remove(host);
        }
        None
    }

    /// Current in-flight count for `host`
    pub fn in_flight(&self, host: &str) -> usize {
        self.hosts().get(host).map_or(0, |s| s.in_flight)
    }

    /// Number of tasks waiting for `host`
    pub fn deferred(&self, host: &str) -> usize {
        self.hosts().get(host).map_or(0, |s| s.deferred.len())
    }

    /// Drops every deferred task and forgets all counters
    ///
    /// Returns the number of tasks that were discarded.
    pub fn abandon(&self) -> usize {
        let drained = std::mem::take(&mut *self.hosts());
        drained.values().map(|s| s.deferred.len()).sum()
    }
}
