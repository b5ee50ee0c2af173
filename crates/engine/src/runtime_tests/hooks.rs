// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use weft_core::test_support::HookCall;
use weft_core::RoutineOutcome;

#[test]
fn worker_lifecycle_hooks_fire() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    runtime.exec("f").unwrap();
    // Idempotent exec fires the start hook once.
    runtime.exec("f").unwrap();
    runtime.shutdown(true);

    assert_eq!(hooks.count(|c| matches!(c, HookCall::WorkerStart(id) if id == "f")), 1);
    assert_eq!(hooks.count(|c| matches!(c, HookCall::WorkerStop(id) if id == "f")), 1);
}

#[test]
fn job_lifecycle_hooks_fire_once() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let id = job.job_id().to_string();
    assert_eq!(hooks.count(|c| matches!(c, HookCall::JobStart(j) if *j == id)), 1);
    assert_eq!(
        hooks.count(|c| matches!(c, HookCall::JobEnd(j, JobStatus::Completed) if *j == id)),
        1
    );
}

#[test]
fn routine_hooks_wrap_each_fire() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(hooks.count(|c| matches!(c, HookCall::RoutineStart(id) if id == "src")), 1);
    assert_eq!(hooks.count(|c| matches!(c, HookCall::RoutineStart(id) if id == "snk")), 1);
    assert_eq!(
        hooks.count(|c| matches!(c, HookCall::RoutineEnd(_, RoutineOutcome::Ok))),
        2
    );
    assert_eq!(hooks.count(|c| matches!(c, HookCall::EventEmit(id, ev) if id == "src" && ev == "out")), 1);
    assert_eq!(hooks.count(|c| matches!(c, HookCall::BeforeEnqueue(id, slot) if id == "snk" && slot == "in")), 1);
}

#[test]
fn on_routine_start_false_skips_logic_as_ok() {
    let hooks = recording();
    *hooks.block_routine.lock() = Some("snk".to_string());
    let runtime = runtime_hooked(hooks.clone());
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // The sink's logic never ran, yet the routine ended ok and the job
    // completed normally.
    assert!(captured.lock().is_empty());
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(
        hooks.count(|c| matches!(c, HookCall::RoutineEnd(id, RoutineOutcome::Ok) if id == "snk")),
        1
    );
}

#[test]
fn on_event_emit_false_suppresses_the_emit() {
    let hooks = recording();
    *hooks.block_emit.lock() = Some("out".to_string());
    let runtime = runtime_hooked(hooks.clone());
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert!(captured.lock().is_empty());
    assert_eq!(job.status(), JobStatus::Completed);
    // No delivery means no before-enqueue call for the sink.
    assert_eq!(hooks.count(|c| matches!(c, HookCall::BeforeEnqueue(id, _) if id == "snk")), 0);
}

#[test]
fn before_enqueue_skip_acts_as_breakpoint() {
    let hooks = recording();
    *hooks.block_enqueue.lock() = Some(("snk".to_string(), "in".to_string()));
    let runtime = runtime_hooked(hooks.clone());
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // The sink never fires; the job still drains to completion.
    assert!(captured.lock().is_empty());
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(hooks.count(|c| matches!(c, HookCall::RoutineStart(id) if id == "snk")), 0);
    assert_eq!(runtime.stats().enqueues_skipped, 1);

    let actions: Vec<String> = job.trace_log().iter().map(|e| e.action.to_string()).collect();
    assert!(actions.contains(&"enqueue_skipped".to_string()));
}

#[test]
fn before_enqueue_skip_on_post_completes_empty_job() {
    let hooks = recording();
    *hooks.block_enqueue.lock() = Some(("src".to_string(), "in".to_string()));
    let runtime = runtime_hooked(hooks.clone());
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert!(captured.lock().is_empty());
    assert_eq!(job.status(), JobStatus::Completed);
}

#[test]
fn noop_hooks_leave_behavior_unchanged() {
    // Same pipeline under the bundled no-op hooks: identical outcome.
    let runtime = runtime();
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(*captured.lock(), vec![pl(1)]);
}
