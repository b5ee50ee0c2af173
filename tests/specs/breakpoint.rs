// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Breakpoints: data held at a routine boundary via the before-enqueue
//! hook, using the process-wide hook registration path.

use super::*;
use weft_core::hooks::{reset_execution_hooks, set_execution_hooks};
use weft_core::test_support::RecordingHooks;
use weft_core::{ExecutionHooks, JobStatus};

#[test]
fn before_enqueue_veto_holds_the_frontier() {
    // Unique names so parallel tests sharing the process-wide hooks are
    // not affected: the veto matches only (bp_r2, bp_in).
    let hooks = RecordingHooks::new();
    *hooks.block_enqueue.lock() = Some(("bp_r2".to_string(), "bp_in".to_string()));
    set_execution_hooks(Arc::clone(&hooks) as Arc<dyn ExecutionHooks>);

    let runtime = runtime();
    let observed = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("bp_flow");
    flow.add_routine(passthrough(), "bp_r1").unwrap();

    let mut r2 = Routine::new("bp_probe");
    r2.add_slot("bp_in").unwrap();
    r2.set_activation_policy(ActivationPolicy::Immediate);
    let seen = Arc::clone(&observed);
    r2.set_logic(move |args: &mut LogicArgs<'_>| {
        seen.lock().push(args.slice.clone());
        Ok(())
    });
    flow.add_routine(r2, "bp_r2").unwrap();
    flow.connect("bp_r1", "out", "bp_r2", "bp_in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) =
        runtime.post("bp_flow", "bp_r1", "in", payload(json!({"n": 1})), None).unwrap();
    let finished = runtime.wait_until_all_jobs_finished(WAIT);

    reset_execution_hooks();

    assert!(finished);
    // The downstream routine never fired, yet the job completed because no
    // tasks remained.
    assert!(observed.lock().is_empty());
    assert_eq!(job.status(), JobStatus::Completed);
    assert!(job
        .trace_log()
        .iter()
        .any(|entry| entry.action == "enqueue_skipped" && entry.routine == "bp_r2"));
}

#[test]
fn breakpoint_policy_holds_until_predicate_clears() {
    use std::sync::atomic::{AtomicBool, Ordering};

    static HELD: AtomicBool = AtomicBool::new(true);
    weft_core::register_breakpoint_predicate(
        "specs-hold",
        Arc::new(|_input: &weft_core::PolicyInput<'_>| HELD.load(Ordering::SeqCst)),
    );

    let runtime = runtime();
    let (snk, captured) = capture();
    let mut flow = Flow::new("bp_policy");
    let mut gated = snk;
    gated.set_activation_policy(ActivationPolicy::breakpoint(
        ActivationPolicy::Immediate,
        "specs-hold",
    ));
    flow.add_routine(gated, "gated").unwrap();
    runtime.flows().register(flow).unwrap();

    // While the predicate holds, the task drains without firing; the data
    // stays in the slot.
    let (_, first) = runtime.post("bp_policy", "gated", "in", payload(json!({"n": 1})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(first.status(), JobStatus::Completed);
    assert!(captured.lock().is_empty());

    // Clear the predicate; the next delivery consumes the backlog too.
    HELD.store(false, Ordering::SeqCst);
    runtime.post("bp_policy", "gated", "in", payload(json!({"n": 2})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(
        *captured.lock(),
        vec![payload(json!({"n": 1})), payload(json!({"n": 2}))]
    );
}
