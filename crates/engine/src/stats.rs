// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime counters exposed for host metrics.
//!
//! Plain atomics; no metrics sink is imported. Hosts snapshot and ship
//! these wherever they like.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RuntimeStats {
    pub(crate) jobs_created: AtomicU64,
    pub(crate) jobs_completed: AtomicU64,
    pub(crate) jobs_failed: AtomicU64,
    pub(crate) jobs_cancelled: AtomicU64,
    pub(crate) tasks_executed: AtomicU64,
    pub(crate) retries_scheduled: AtomicU64,
    pub(crate) emits_routed: AtomicU64,
    pub(crate) enqueues_skipped: AtomicU64,
}

impl RuntimeStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            jobs_created: self.jobs_created.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_cancelled: self.jobs_cancelled.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
            emits_routed: self.emits_routed.load(Ordering::Relaxed),
            enqueues_skipped: self.enqueues_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the runtime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub jobs_created: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
    pub tasks_executed: u64,
    pub retries_scheduled: u64,
    pub emits_routed: u64,
    pub enqueues_skipped: u64,
}
