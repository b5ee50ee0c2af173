// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use weft_core::{ParamMap, ParamSpec};

#[test]
fn linear_pipeline_delivers_once() {
    let runtime = runtime();
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(3), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(*captured.lock(), vec![pl(3)]);
    assert_eq!(job.status(), JobStatus::Completed);
    assert!(job.completed_at_ms().is_some());
}

#[test]
fn trace_log_records_the_journey() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(3), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let actions: Vec<String> = job.trace_log().iter().map(|e| e.action.to_string()).collect();
    assert!(actions.contains(&"posted".to_string()));
    assert!(actions.contains(&"fired".to_string()));
    assert!(actions.contains(&"emitted".to_string()));
}

#[test]
fn fifo_per_edge_preserves_emit_order() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let mut flow = Flow::new("f");

    // Burst ten payloads from one logic call.
    let mut burst = Routine::new("burst");
    burst.add_slot("in").unwrap();
    burst.add_event("out", ["n"]).unwrap();
    burst.set_activation_policy(ActivationPolicy::Immediate);
    burst.set_logic(|args: &mut LogicArgs<'_>| {
        for n in 0..10 {
            args.emit("out", pl(n))?;
        }
        Ok(())
    });
    flow.add_routine(burst, "src").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect("src", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("f", "src", "in", pl(0), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let expected: Vec<Payload> = (0..10).map(pl).collect();
    assert_eq!(*captured.lock(), expected);
}

#[test]
fn fan_out_delivers_to_every_target_once() {
    let runtime = runtime_threads(2);
    let captured_a = Arc::new(Mutex::new(Vec::new()));
    let captured_b = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    flow.add_routine(relay(), "src").unwrap();
    flow.add_routine(sink(Arc::clone(&captured_a)), "a").unwrap();
    flow.add_routine(sink(Arc::clone(&captured_b)), "b").unwrap();
    flow.connect("src", "out", "a", "in").unwrap();
    flow.connect("src", "out", "b", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(*captured_a.lock(), vec![pl(1)]);
    assert_eq!(*captured_b.lock(), vec![pl(1)]);
}

#[test]
fn fan_in_all_slots_ready_joins_pairs() {
    let runtime = runtime();
    let observed = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    flow.add_routine(relay(), "left").unwrap();
    flow.add_routine(relay(), "right").unwrap();

    let mut join = Routine::new("join");
    join.add_slot("in_a").unwrap();
    join.add_slot("in_b").unwrap();
    join.set_activation_policy(ActivationPolicy::AllSlotsReady);
    let slices = Arc::clone(&observed);
    join.set_logic(move |args: &mut LogicArgs<'_>| {
        slices.lock().push(args.slice.clone());
        Ok(())
    });
    flow.add_routine(join, "join").unwrap();
    flow.connect("left", "out", "join", "in_a").unwrap();
    flow.connect("right", "out", "join", "in_b").unwrap();
    runtime.flows().register(flow).unwrap();

    // Only the left input: the join must not fire.
    let (_, first) = runtime.post("f", "left", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(first.status(), JobStatus::Completed);
    assert!(observed.lock().is_empty());

    // The right input arrives: exactly one joined fire.
    runtime.post("f", "right", "in", pl(2), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let slices = observed.lock();
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0]["in_a"], vec![pl(1)]);
    assert_eq!(slices[0]["in_b"], vec![pl(2)]);
}

#[test]
fn param_map_projects_payloads_on_the_edge() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    flow.add_routine(relay(), "src").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect_with(
        "src",
        "out",
        "snk",
        "in",
        Some(
            ParamMap::new()
                .map("value", ParamSpec::source("n"))
                .map("tag", ParamSpec::literal("X")),
        ),
    )
    .unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("f", "src", "in", pl(7), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(*captured.lock(), vec![payload(json!({"value": 7, "tag": "X"}))]);
}

#[test]
fn param_map_missing_source_fails_the_job() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    flow.add_routine(relay(), "src").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect_with(
        "src",
        "out",
        "snk",
        "in",
        Some(ParamMap::new().map("value", ParamSpec::source("absent"))),
    )
    .unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(7), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(job.status(), JobStatus::Failed);
    assert!(job.error().unwrap().contains("missing source key"));
    assert!(captured.lock().is_empty());
}

#[test]
fn queue_full_surfaces_to_the_emitter() {
    let runtime = runtime();
    let mut flow = Flow::new("f");
    flow.add_routine(relay(), "src").unwrap();

    // A tiny slot behind a policy that never fires below 10 items.
    let mut hoard = Routine::new("hoard");
    hoard.add_slot_with("in", 2, 1.0).unwrap();
    hoard.set_activation_policy(ActivationPolicy::batch_size(10));
    hoard.set_logic(|_args: &mut LogicArgs<'_>| Ok(()));
    flow.add_routine(hoard, "hoard").unwrap();
    flow.connect("src", "out", "hoard", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Completed);

    let (_, job) = runtime.post("f", "src", "in", pl(2), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Completed);

    // Third delivery overflows the capacity-2 slot; the emitter's job fails
    // with queue_full under the default stop strategy.
    let (_, job) = runtime.post("f", "src", "in", pl(3), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Failed);
    assert!(job.error().unwrap().contains("full"));
}

#[test]
fn concurrent_jobs_share_the_pool_fairly() {
    let runtime = runtime_threads(4);
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    for n in 0..20 {
        runtime.post("f", "src", "in", pl(n), None).unwrap();
    }
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(captured.lock().len(), 20);
    let stats = runtime.stats();
    assert_eq!(stats.jobs_created, 20);
    assert_eq!(stats.jobs_completed, 20);
}
