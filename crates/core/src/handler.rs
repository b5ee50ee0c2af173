// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-handling strategies consulted when routine logic fails.
//!
//! Resolution order at failure time is routine-level → flow-level →
//! [`ErrorPolicy::Stop`]. The runtime drives the state machine; this module
//! only describes the strategies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Strategy applied when a routine's logic returns an error (or panics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Fail the job and drop its remaining tasks.
    Stop,
    /// Log on the job's trace and keep going; nothing is emitted downstream
    /// from the failed call.
    Continue,
    /// Replay the same data slice into the routine after a backoff delay,
    /// up to `max_attempts` retries; then fall through to the next-outer
    /// policy.
    Retry {
        max_attempts: u32,
        #[serde(with = "duration_serde")]
        base_delay: Duration,
        backoff: f64,
    },
    /// Like `Continue`, but also suppress this routine's downstream emits
    /// for the rest of the job.
    Skip,
}

impl ErrorPolicy {
    pub fn retry(max_attempts: u32, base_delay: Duration, backoff: f64) -> Self {
        Self::Retry { max_attempts, base_delay, backoff }
    }

    /// Backoff delay before retry number `retry` (1-based):
    /// `base_delay * backoff^(retry-1)`. `None` for non-retry strategies.
    pub fn retry_delay(&self, retry: u32) -> Option<Duration> {
        match self {
            Self::Retry { base_delay, backoff, .. } => {
                let factor = backoff.powi(retry.saturating_sub(1) as i32);
                Some(base_delay.mul_f64(factor.max(0.0)))
            }
            _ => None,
        }
    }

    /// Remaining retry budget after `retries_done` replays.
    pub fn retries_left(&self, retries_done: u32) -> u32 {
        match self {
            Self::Retry { max_attempts, .. } => max_attempts.saturating_sub(retries_done),
            _ => 0,
        }
    }
}

crate::simple_display! {
    ErrorPolicy {
        Stop => "stop",
        Continue => "continue",
        Retry { .. } => "retry",
        Skip => "skip",
    }
}

/// Serialize a [`Duration`] as fractional seconds.
pub mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
