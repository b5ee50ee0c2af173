// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation job state and trace log.

use crate::payload::Payload;
use crate::worker::WorkerId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

crate::define_id! {
    /// Unique identifier for a job (one `post()` against a flow).
    pub struct JobId("job-");
}

/// Lifecycle status of a job. Completed/Failed/Cancelled are terminal and
/// monotonic: once reached, no further transition is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Paused,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Paused => "paused",
    }
}

/// One entry of a job's ordered trace log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub at_ms: u64,
    pub routine: SmolStr,
    pub action: SmolStr,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

#[derive(Debug)]
struct JobInner {
    status: JobStatus,
    completed_at_ms: Option<u64>,
    data: Payload,
    trace: Vec<TraceEntry>,
    error: Option<String>,
    /// Routines whose downstream emits are suppressed for this job
    /// (skip error strategy).
    skipped: HashSet<SmolStr>,
}

/// Short-lived per-invocation state: status machine, free-form data map,
/// append-only trace log.
///
/// All mutation is serialized behind one lock; the live-task counter is a
/// scheduler-facing atomic (queued + executing tasks tagged with this job).
#[derive(Debug)]
pub struct JobContext {
    job_id: JobId,
    worker_id: WorkerId,
    flow_id: String,
    created_at_ms: u64,
    /// Caller-supplied, read-mostly.
    metadata: Payload,
    inner: Mutex<JobInner>,
    live_tasks: AtomicUsize,
}

impl JobContext {
    pub fn new(
        worker_id: WorkerId,
        flow_id: impl Into<String>,
        metadata: Payload,
        created_at_ms: u64,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            worker_id,
            flow_id: flow_id.into(),
            created_at_ms,
            metadata,
            inner: Mutex::new(JobInner {
                status: JobStatus::Pending,
                completed_at_ms: None,
                data: Payload::new(),
                trace: Vec::new(),
                error: None,
                skipped: HashSet::new(),
            }),
            live_tasks: AtomicUsize::new(0),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn metadata(&self) -> &Payload {
        &self.metadata
    }

    pub fn status(&self) -> JobStatus {
        self.inner.lock().status
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == JobStatus::Cancelled
    }

    pub fn completed_at_ms(&self) -> Option<u64> {
        self.inner.lock().completed_at_ms
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    pub fn set_data(&self, key: impl Into<String>, value: Value) {
        self.inner.lock().data.insert(key.into(), value);
    }

    pub fn get_data(&self, key: &str) -> Option<Value> {
        self.inner.lock().data.get(key).cloned()
    }

    pub fn data_snapshot(&self) -> Payload {
        self.inner.lock().data.clone()
    }

    /// Append to the ordered trace log.
    pub fn trace(
        &self,
        routine: impl Into<SmolStr>,
        action: impl Into<SmolStr>,
        details: Value,
        at_ms: u64,
    ) {
        self.inner.lock().trace.push(TraceEntry {
            at_ms,
            routine: routine.into(),
            action: action.into(),
            details,
        });
    }

    pub fn trace_log(&self) -> Vec<TraceEntry> {
        self.inner.lock().trace.clone()
    }

    /// Pending → Running transition when the first task begins.
    /// Returns false if the job already left Pending.
    pub fn mark_running(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.status == JobStatus::Pending {
            inner.status = JobStatus::Running;
            true
        } else {
            false
        }
    }

    /// Pause a pending/running job. No-op on any other status.
    pub fn pause(&self) -> bool {
        let mut inner = self.inner.lock();
        if matches!(inner.status, JobStatus::Pending | JobStatus::Running) {
            inner.status = JobStatus::Paused;
            true
        } else {
            false
        }
    }

    /// Resume a paused job.
    pub fn resume(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.status == JobStatus::Paused {
            inner.status = JobStatus::Running;
            true
        } else {
            false
        }
    }

    /// Transition to a terminal status. First terminal transition wins;
    /// later calls return false and change nothing.
    pub fn complete(&self, status: JobStatus, error: Option<String>, at_ms: u64) -> bool {
        debug_assert!(status.is_terminal(), "complete() requires a terminal status");
        let mut inner = self.inner.lock();
        if inner.status.is_terminal() {
            return false;
        }
        inner.status = status;
        inner.completed_at_ms = Some(at_ms);
        if error.is_some() {
            inner.error = error;
        }
        true
    }

    /// Mark a routine's downstream emits suppressed for this job.
    pub fn mark_skipped(&self, routine: impl Into<SmolStr>) {
        self.inner.lock().skipped.insert(routine.into());
    }

    pub fn is_skipped(&self, routine: &str) -> bool {
        self.inner.lock().skipped.contains(routine)
    }

    // --- scheduler bookkeeping ---

    /// Record a task tagged with this job entering the queue.
    pub fn task_enqueued(&self) {
        self.live_tasks.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a task leaving the system (finished or dropped).
    /// Returns the number of live tasks remaining.
    pub fn task_finished(&self) -> usize {
        let prev = self.live_tasks.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "task_finished without matching task_enqueued");
        prev.saturating_sub(1)
    }

    /// Queued + executing tasks tagged with this job.
    pub fn live_tasks(&self) -> usize {
        self.live_tasks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
