// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use weft_core::test_support::HookCall;
use weft_core::{ErrorPolicy, RoutineOutcome};

fn failed_ends(hooks: &RecordingHooks, routine: &str) -> usize {
    hooks.count(|call| {
        matches!(call, HookCall::RoutineEnd(id, RoutineOutcome::Failed) if id == routine)
    })
}

#[test]
fn default_stop_fails_the_job() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());

    let mut flow = Flow::new("f");
    flow.add_routine(failing_routine(), "bad").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "bad", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(job.status(), JobStatus::Failed);
    assert_eq!(job.error(), Some("boom".into()));
    assert_eq!(failed_ends(&hooks, "bad"), 1);
    assert_eq!(
        hooks.count(|c| matches!(c, HookCall::JobEnd(_, JobStatus::Failed))),
        1
    );
}

#[test]
fn continue_policy_keeps_the_rest_of_the_job() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    flow.add_routine(relay(), "src").unwrap();
    let mut bad = failing_routine();
    bad.set_error_policy(Some(ErrorPolicy::Continue));
    flow.add_routine(bad, "bad").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect("src", "out", "bad", "in").unwrap();
    flow.connect("src", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // The failure is logged on the trace; the job still completes and the
    // sibling edge still delivers.
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(*captured.lock(), vec![pl(1)]);
    let actions: Vec<String> = job.trace_log().iter().map(|e| e.action.to_string()).collect();
    assert!(actions.contains(&"continued_after_error".to_string()));
}

#[test]
fn retry_replays_then_gives_up() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());

    let mut flow = Flow::new("f");
    let mut bad = failing_routine();
    bad.set_error_policy(Some(ErrorPolicy::retry(2, Duration::from_millis(10), 1.0)));
    flow.add_routine(bad, "bad").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "bad", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // Initial attempt + two retries, then fall-through to stop.
    assert_eq!(failed_ends(&hooks, "bad"), 3);
    assert_eq!(job.status(), JobStatus::Failed);
    assert_eq!(job.error(), Some("boom".into()));
    assert_eq!(runtime.stats().retries_scheduled, 2);
}

#[test]
fn retry_bound_counts_initial_plus_max() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());

    let mut flow = Flow::new("f");
    let mut bad = failing_routine();
    bad.set_error_policy(Some(ErrorPolicy::retry(3, Duration::from_millis(5), 1.0)));
    flow.add_routine(bad, "bad").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("f", "bad", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // retry(max = 3): exactly 4 failed routine-ends.
    assert_eq!(failed_ends(&hooks, "bad"), 4);
}

#[test]
fn retry_succeeds_after_transient_failures() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(AtomicU32::new(0));

    let mut flow = Flow::new("f");
    let mut flaky = Routine::new("flaky");
    flaky.add_slot("in").unwrap();
    flaky.add_event("out", Vec::<&str>::new()).unwrap();
    flaky.set_activation_policy(ActivationPolicy::Immediate);
    flaky.set_error_policy(Some(ErrorPolicy::retry(3, Duration::from_millis(5), 1.0)));
    let counter = Arc::clone(&attempts);
    flaky.set_logic(move |args: &mut LogicArgs<'_>| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err("transient".into());
        }
        for payloads in args.slice.values() {
            for payload in payloads {
                args.emit("out", payload.clone())?;
            }
        }
        Ok(())
    });
    flow.add_routine(flaky, "flaky").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect("flaky", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "flaky", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(*captured.lock(), vec![pl(1)]);
}

#[test]
fn retry_exhaustion_falls_through_to_flow_policy() {
    let runtime = runtime();
    let mut flow = Flow::new("f");
    let mut bad = failing_routine();
    bad.set_error_policy(Some(ErrorPolicy::retry(1, Duration::from_millis(5), 1.0)));
    flow.add_routine(bad, "bad").unwrap();
    flow.set_error_policy(Some(ErrorPolicy::Continue));
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "bad", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // Routine retry exhausted, flow-level continue absorbs the failure.
    assert_eq!(job.status(), JobStatus::Completed);
    let actions: Vec<String> = job.trace_log().iter().map(|e| e.action.to_string()).collect();
    assert!(actions.contains(&"continued_after_error".to_string()));
}

#[test]
fn flow_level_policy_applies_when_routine_has_none() {
    let runtime = runtime();
    let mut flow = Flow::new("f");
    flow.add_routine(failing_routine(), "bad").unwrap();
    flow.set_error_policy(Some(ErrorPolicy::Continue));
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "bad", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Completed);
}

#[test]
fn skip_suppresses_later_emits_for_the_job() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicU32::new(0));

    let mut flow = Flow::new("f");
    flow.add_routine(relay(), "src").unwrap();

    // Fails on its first fire (skip), emits on every later fire.
    // all_slots_ready consumes one item per fire, so two posts mean two fires.
    let mut moody = Routine::new("moody");
    moody.add_slot("in").unwrap();
    moody.add_event("out", Vec::<&str>::new()).unwrap();
    moody.set_activation_policy(ActivationPolicy::AllSlotsReady);
    moody.set_error_policy(Some(ErrorPolicy::Skip));
    let counter = Arc::clone(&calls);
    moody.set_logic(move |args: &mut LogicArgs<'_>| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("first fire fails".into());
        }
        for payloads in args.slice.values() {
            for payload in payloads {
                args.emit("out", payload.clone())?;
            }
        }
        Ok(())
    });
    flow.add_routine(moody, "moody").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect("src", "out", "moody", "in").unwrap();
    flow.connect("moody", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    runtime.post("f", "src", "in", pl(2), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // First fire failed and marked the routine skipped for that job; but the
    // second post is a different job, so its emit goes through.
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*captured.lock(), vec![pl(2)]);
}

#[test]
fn skip_within_one_job_cuts_downstream() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicU32::new(0));

    let mut flow = Flow::new("f");

    // Emits two payloads from one post.
    let mut duo = Routine::new("duo");
    duo.add_slot("in").unwrap();
    duo.add_event("out", Vec::<&str>::new()).unwrap();
    duo.set_activation_policy(ActivationPolicy::Immediate);
    duo.set_logic(|args: &mut LogicArgs<'_>| {
        args.emit("out", pl(1))?;
        args.emit("out", pl(2))?;
        Ok(())
    });
    flow.add_routine(duo, "duo").unwrap();

    let mut moody = Routine::new("moody");
    moody.add_slot("in").unwrap();
    moody.add_event("out", Vec::<&str>::new()).unwrap();
    moody.set_activation_policy(ActivationPolicy::AllSlotsReady);
    moody.set_error_policy(Some(ErrorPolicy::Skip));
    let counter = Arc::clone(&calls);
    moody.set_logic(move |args: &mut LogicArgs<'_>| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("first fire fails".into());
        }
        for payloads in args.slice.values() {
            for payload in payloads {
                args.emit("out", payload.clone())?;
            }
        }
        Ok(())
    });
    flow.add_routine(moody, "moody").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect("duo", "out", "moody", "in").unwrap();
    flow.connect("moody", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "duo", "in", pl(0), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // Both fires happened under the same job; the second ran its logic but
    // its emit was suppressed by the skip mark.
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(captured.lock().is_empty());
}

#[test]
fn panic_is_contained_and_fails_the_job() {
    let runtime = runtime();
    let mut flow = Flow::new("f");

    let mut bomb = Routine::new("bomb");
    bomb.add_slot("in").unwrap();
    bomb.set_activation_policy(ActivationPolicy::Immediate);
    bomb.set_logic(|_args: &mut LogicArgs<'_>| -> Result<(), weft_core::LogicError> {
        panic!("kaboom");
    });
    flow.add_routine(bomb, "bomb").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "bomb", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(job.status(), JobStatus::Failed);
    let error = job.error().unwrap();
    assert!(error.contains("panic"), "unexpected error: {error}");
    assert!(error.contains("kaboom"), "unexpected error: {error}");

    // The pool survives and keeps serving other jobs.
    let (flow2, captured) = linear_flow("f2");
    runtime.flows().register(flow2).unwrap();
    runtime.post("f2", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(captured.lock().len(), 1);
}
