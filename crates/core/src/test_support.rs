// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for this crate's tests and downstream crates' tests.

use crate::hooks::{EnqueueDecision, ExecutionHooks, RoutineOutcome};
use crate::job::{JobContext, JobStatus};
use crate::payload::{payload_from, Payload};
use crate::policy::ActivationPolicy;
use crate::routine::{LogicArgs, Routine};
use crate::worker::WorkerState;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Shorthand for building payloads from `json!` objects.
pub fn payload(value: Value) -> Payload {
    payload_from(value)
}

/// A routine that captures every payload it sees into `captured`.
/// One slot `in`, no events, `immediate` activation.
pub fn sink(captured: Arc<Mutex<Vec<Payload>>>) -> Routine {
    let mut routine = Routine::new("sink");
    #[allow(clippy::unwrap_used)]
    routine.add_slot("in").unwrap();
    routine.set_activation_policy(ActivationPolicy::Immediate);
    routine.set_logic(move |args: &mut LogicArgs<'_>| {
        for payloads in args.slice.values() {
            captured.lock().extend(payloads.iter().cloned());
        }
        Ok(())
    });
    routine
}

/// A routine that re-emits every payload from slot `in` on event `out`.
pub fn relay() -> Routine {
    let mut routine = Routine::new("relay");
    #[allow(clippy::unwrap_used)]
    routine.add_slot("in").unwrap();
    #[allow(clippy::unwrap_used)]
    routine.add_event("out", Vec::<&str>::new()).unwrap();
    routine.set_activation_policy(ActivationPolicy::Immediate);
    routine.set_logic(|args: &mut LogicArgs<'_>| {
        for payloads in args.slice.values() {
            for payload in payloads {
                args.emit("out", payload.clone())?;
            }
        }
        Ok(())
    });
    routine
}

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HookCall {
    WorkerStart(String),
    WorkerStop(String),
    JobStart(String),
    JobEnd(String, JobStatus),
    RoutineStart(String),
    RoutineEnd(String, RoutineOutcome),
    EventEmit(String, String),
    BeforeEnqueue(String, String),
}

/// Hook impl that records every call and supports targeted vetoes.
#[derive(Default)]
pub struct RecordingHooks {
    pub calls: Mutex<Vec<HookCall>>,
    /// Skip enqueues into `(target_routine, slot)`.
    pub block_enqueue: Mutex<Option<(String, String)>>,
    /// Suppress emits of this event name.
    pub block_emit: Mutex<Option<String>>,
    /// Skip logic for this routine id.
    pub block_routine: Mutex<Option<String>>,
}

impl RecordingHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&HookCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }
}

impl ExecutionHooks for RecordingHooks {
    fn on_worker_start(&self, flow_id: &str, _worker: &WorkerState) {
        self.calls.lock().push(HookCall::WorkerStart(flow_id.to_string()));
    }

    fn on_worker_stop(
        &self,
        flow_id: &str,
        _worker: &WorkerState,
        _status: crate::worker::WorkerStatus,
    ) {
        self.calls.lock().push(HookCall::WorkerStop(flow_id.to_string()));
    }

    fn on_job_start(&self, job: &JobContext, _worker: &WorkerState) {
        self.calls.lock().push(HookCall::JobStart(job.job_id().to_string()));
    }

    fn on_job_end(
        &self,
        job: &JobContext,
        _worker: &WorkerState,
        status: JobStatus,
        _error: Option<&str>,
    ) {
        self.calls.lock().push(HookCall::JobEnd(job.job_id().to_string(), status));
    }

    fn on_routine_start(
        &self,
        routine_id: &str,
        _worker: &WorkerState,
        _job: Option<&JobContext>,
    ) -> bool {
        self.calls.lock().push(HookCall::RoutineStart(routine_id.to_string()));
        self.block_routine.lock().as_deref() != Some(routine_id)
    }

    fn on_routine_end(
        &self,
        routine_id: &str,
        _worker: &WorkerState,
        _job: Option<&JobContext>,
        outcome: RoutineOutcome,
        _error: Option<&str>,
    ) {
        self.calls.lock().push(HookCall::RoutineEnd(routine_id.to_string(), outcome));
    }

    fn on_event_emit(
        &self,
        event: &str,
        source_routine_id: &str,
        _worker: &WorkerState,
        _job: Option<&JobContext>,
        _data: &Payload,
    ) -> bool {
        self.calls.lock().push(HookCall::EventEmit(source_routine_id.to_string(), event.to_string()));
        self.block_emit.lock().as_deref() != Some(event)
    }

    fn on_slot_before_enqueue(
        &self,
        slot: &str,
        target_routine_id: &str,
        _job: Option<&JobContext>,
        _data: &Payload,
        _flow_id: &str,
    ) -> EnqueueDecision {
        self.calls
            .lock()
            .push(HookCall::BeforeEnqueue(target_routine_id.to_string(), slot.to_string()));
        let blocked = self.block_enqueue.lock();
        match blocked.as_ref() {
            Some((routine, blocked_slot))
                if routine == target_routine_id && blocked_slot == slot =>
            {
                EnqueueDecision::skip("breakpoint")
            }
            _ => EnqueueDecision::Allow,
        }
    }
}
