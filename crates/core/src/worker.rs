// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-flow execution instance state.
//!
//! A `WorkerState` is long-lived: it is created the first time a flow is
//! executed and shared by every job that runs on that flow. Routine state
//! dicts are replaced atomically; read-modify-write callers accept
//! last-writer-wins. Precise per-invocation counts belong in
//! [`crate::job::JobContext`].

use crate::payload::StateDict;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a worker (one live flow execution instance).
    pub struct WorkerId("wkr-");
}

/// Lifecycle status of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Starting,
    Running,
    Paused,
    Stopped,
}

crate::simple_display! {
    WorkerStatus {
        Starting => "starting",
        Running => "running",
        Paused => "paused",
        Stopped => "stopped",
    }
}

#[derive(Debug)]
struct WorkerInner {
    status: WorkerStatus,
    routine_states: HashMap<SmolStr, StateDict>,
}

/// Shared state for one running flow instance.
#[derive(Debug)]
pub struct WorkerState {
    worker_id: WorkerId,
    flow_id: String,
    inner: Mutex<WorkerInner>,
}

impl WorkerState {
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            worker_id: WorkerId::new(),
            flow_id: flow_id.into(),
            inner: Mutex::new(WorkerInner {
                status: WorkerStatus::Starting,
                routine_states: HashMap::new(),
            }),
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn status(&self) -> WorkerStatus {
        self.inner.lock().status
    }

    pub fn set_status(&self, status: WorkerStatus) {
        self.inner.lock().status = status;
    }

    /// Clone of a routine's state dict, if any.
    pub fn get_routine_state(&self, routine_id: &str) -> Option<StateDict> {
        self.inner.lock().routine_states.get(routine_id).cloned()
    }

    /// Replace a routine's state dict atomically (last-writer-wins).
    pub fn update_routine_state(&self, routine_id: impl Into<SmolStr>, state: StateDict) {
        self.inner.lock().routine_states.insert(routine_id.into(), state);
    }

    /// Set a single key in a routine's state dict under the same lock.
    ///
    /// Still last-writer-wins against a concurrent full replace.
    pub fn set_routine_state_key(
        &self,
        routine_id: impl Into<SmolStr>,
        key: impl Into<String>,
        value: Value,
    ) {
        let mut inner = self.inner.lock();
        inner.routine_states.entry(routine_id.into()).or_default().insert(key.into(), value);
    }

    /// Read a single value from a routine's state dict.
    pub fn routine_state_value(&self, routine_id: &str, key: &str) -> Option<Value> {
        self.inner.lock().routine_states.get(routine_id)?.get(key).cloned()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
