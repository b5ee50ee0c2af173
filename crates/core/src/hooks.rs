// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interception points called by the runtime at lifecycle moments.
//!
//! This is the only coupling between the core and any observer: a process
//! installs an [`ExecutionHooks`] impl and the runtime calls it
//! synchronously on the worker thread doing the related work. The bundled
//! default is a no-op.

use crate::job::{JobContext, JobStatus};
use crate::payload::Payload;
use crate::worker::{WorkerState, WorkerStatus};
use parking_lot::RwLock;
use std::sync::Arc;

/// Outcome reported by `on_routine_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineOutcome {
    Ok,
    Failed,
}

crate::simple_display! {
    RoutineOutcome {
        Ok => "ok",
        Failed => "failed",
    }
}

/// Decision returned by `on_slot_before_enqueue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueDecision {
    Allow,
    /// Skip the enqueue; the reason lands on the job's trace log.
    Skip { reason: String },
}

impl EnqueueDecision {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip { reason: reason.into() }
    }
}

/// The interception interface. Every method defaults to the advisory
/// no-op/allow behavior, so observers override only what they watch.
#[allow(unused_variables)]
pub trait ExecutionHooks: Send + Sync {
    /// First exec of a flow.
    fn on_worker_start(&self, flow_id: &str, worker: &WorkerState) {}

    /// Worker shutdown.
    fn on_worker_stop(&self, flow_id: &str, worker: &WorkerState, status: WorkerStatus) {}

    /// First task of a job begins.
    fn on_job_start(&self, job: &JobContext, worker: &WorkerState) {}

    /// Job reached a terminal status.
    fn on_job_end(
        &self,
        job: &JobContext,
        worker: &WorkerState,
        status: JobStatus,
        error: Option<&str>,
    ) {
    }

    /// Before logic runs. Returning false skips the logic (treated as ok).
    fn on_routine_start(
        &self,
        routine_id: &str,
        worker: &WorkerState,
        job: Option<&JobContext>,
    ) -> bool {
        true
    }

    /// After logic returns.
    fn on_routine_end(
        &self,
        routine_id: &str,
        worker: &WorkerState,
        job: Option<&JobContext>,
        outcome: RoutineOutcome,
        error: Option<&str>,
    ) {
    }

    /// Inside `emit`, before routing. Returning false suppresses the emit.
    fn on_event_emit(
        &self,
        event: &str,
        source_routine_id: &str,
        worker: &WorkerState,
        job: Option<&JobContext>,
        data: &Payload,
    ) -> bool {
        true
    }

    /// Before each enqueue into a slot. Skipping is how breakpoints pause
    /// data at a routine boundary.
    fn on_slot_before_enqueue(
        &self,
        slot: &str,
        target_routine_id: &str,
        job: Option<&JobContext>,
        data: &Payload,
        flow_id: &str,
    ) -> EnqueueDecision {
        EnqueueDecision::Allow
    }
}

/// The bundled default: every hook is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl ExecutionHooks for NoopHooks {}

static CURRENT: RwLock<Option<Arc<dyn ExecutionHooks>>> = RwLock::new(None);

/// Install a process-wide hook implementation.
pub fn set_execution_hooks(hooks: Arc<dyn ExecutionHooks>) {
    *CURRENT.write() = Some(hooks);
}

/// Restore the bundled no-op hooks.
pub fn reset_execution_hooks() {
    *CURRENT.write() = None;
}

/// The currently installed hooks (no-op when none registered).
pub fn current_hooks() -> Arc<dyn ExecutionHooks> {
    CURRENT.read().clone().unwrap_or_else(|| Arc::new(NoopHooks))
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
