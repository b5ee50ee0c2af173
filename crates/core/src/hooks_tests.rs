// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::WorkerId;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingHooks {
    routine_starts: AtomicUsize,
}

impl ExecutionHooks for CountingHooks {
    fn on_routine_start(
        &self,
        _routine_id: &str,
        _worker: &WorkerState,
        _job: Option<&JobContext>,
    ) -> bool {
        self.routine_starts.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[test]
fn noop_hooks_allow_everything() {
    let hooks = NoopHooks;
    let worker = WorkerState::new("flow-t");
    let job = JobContext::new(WorkerId::new(), "flow-t", Payload::new(), 0);
    assert!(hooks.on_routine_start("r1", &worker, Some(&job)));
    assert!(hooks.on_event_emit("out", "r1", &worker, Some(&job), &Payload::new()));
    assert_eq!(
        hooks.on_slot_before_enqueue("in", "r2", Some(&job), &Payload::new(), "flow-t"),
        EnqueueDecision::Allow
    );
}

#[test]
fn current_hooks_defaults_to_noop() {
    reset_execution_hooks();
    let hooks = current_hooks();
    let worker = WorkerState::new("flow-t");
    assert!(hooks.on_routine_start("r1", &worker, None));
}

#[test]
fn set_and_reset_execution_hooks() {
    let counting = Arc::new(CountingHooks { routine_starts: AtomicUsize::new(0) });
    set_execution_hooks(Arc::clone(&counting) as Arc<dyn ExecutionHooks>);

    let worker = WorkerState::new("flow-t");
    current_hooks().on_routine_start("r1", &worker, None);
    assert_eq!(counting.routine_starts.load(Ordering::SeqCst), 1);

    reset_execution_hooks();
    current_hooks().on_routine_start("r1", &worker, None);
    assert_eq!(counting.routine_starts.load(Ordering::SeqCst), 1);
}

#[test]
fn enqueue_decision_skip_carries_reason() {
    let decision = EnqueueDecision::skip("bp");
    assert_eq!(decision, EnqueueDecision::Skip { reason: "bp".into() });
}

#[test]
fn routine_outcome_display() {
    assert_eq!(RoutineOutcome::Ok.to_string(), "ok");
    assert_eq!(RoutineOutcome::Failed.to_string(), "failed");
}
