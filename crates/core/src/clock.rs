// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time sources for the engine.
//!
//! Everything time-shaped reads a `Clock` instead of the system time: job
//! created/completed stamps, trace entries, slot record ages, and the
//! `time_interval` policy's last-fired bookkeeping. Production wiring uses
//! [`SystemClock`]; tests drive time by hand with [`ManualClock`] so
//! interval and backoff behavior is checkable without sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of the current time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, for elapsed-time measurement.
    fn now(&self) -> Instant;

    /// Wall-clock epoch milliseconds: the unit stored in job contexts,
    /// trace entries, and routine state dicts.
    fn epoch_ms(&self) -> u64;
}

/// The real thing.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

struct ManualState {
    instant: Instant,
    epoch_ms: u64,
}

/// Hand-driven clock for tests: time only moves when told to.
///
/// Starts at epoch millisecond zero, which policies reading last-fired
/// timestamps treat as "never fired".
#[derive(Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState { instant: Instant::now(), epoch_ms: 0 })),
        }
    }

    /// Move both the monotonic and wall-clock reading forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.instant += by;
        state.epoch_ms += by.as_millis() as u64;
    }

    /// Pin the wall-clock reading to an absolute epoch millisecond.
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        self.state.lock().epoch_ms = epoch_ms;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
