// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out, fan-in, and parameter remapping.

use super::*;
use weft_core::{JobStatus, ParamMap, ParamSpec};

#[test]
fn fan_out_reaches_each_target_exactly_once() {
    let runtime = runtime();
    let (a, captured_a) = capture();
    let (b, captured_b) = capture();

    let mut flow = Flow::new("fanout");
    flow.add_routine(passthrough(), "src").unwrap();
    flow.add_routine(a, "a").unwrap();
    flow.add_routine(b, "b").unwrap();
    flow.connect("src", "out", "a", "in").unwrap();
    flow.connect("src", "out", "b", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("fanout", "src", "in", payload(json!({"x": 1})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(*captured_a.lock(), vec![payload(json!({"x": 1}))]);
    assert_eq!(*captured_b.lock(), vec![payload(json!({"x": 1}))]);
}

#[test]
fn fan_in_waits_for_every_slot() {
    let runtime = runtime();
    let observed = Arc::new(Mutex::new(Vec::new()));

    let mut join = Routine::new("join");
    join.add_slot("in_a").unwrap();
    join.add_slot("in_b").unwrap();
    join.set_activation_policy(ActivationPolicy::AllSlotsReady);
    let slices = Arc::clone(&observed);
    join.set_logic(move |args: &mut LogicArgs<'_>| {
        slices.lock().push(args.slice.clone());
        Ok(())
    });

    let mut flow = Flow::new("fanin");
    flow.add_routine(join, "j").unwrap();
    runtime.flows().register(flow).unwrap();

    // First input alone: no fire, but the job itself drains.
    let (_, first) = runtime.post("fanin", "j", "in_a", payload(json!({"a": 1})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(first.status(), JobStatus::Completed);
    assert!(observed.lock().is_empty());

    // Second input: exactly one joined fire with both payloads.
    runtime.post("fanin", "j", "in_b", payload(json!({"b": 2})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let slices = observed.lock();
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0]["in_a"], vec![payload(json!({"a": 1}))]);
    assert_eq!(slices[0]["in_b"], vec![payload(json!({"b": 2}))]);
}

#[test]
fn param_map_remaps_and_injects_literals() {
    let runtime = runtime();
    let (snk, captured) = capture();

    let mut flow = Flow::new("mapped");
    flow.add_routine(passthrough(), "src").unwrap();
    flow.add_routine(snk, "snk").unwrap();
    flow.connect_with(
        "src",
        "out",
        "snk",
        "in",
        Some(
            ParamMap::new()
                .map("value", ParamSpec::source("v"))
                .map("tag", ParamSpec::literal("X")),
        ),
    )
    .unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("mapped", "src", "in", payload(json!({"v": 7})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(*captured.lock(), vec![payload(json!({"value": 7, "tag": "X"}))]);
}

#[test]
fn fan_in_from_many_events_preserves_slot_arrival() {
    let runtime = Runtime::new(RuntimeConfig::new().thread_pool_size(1));
    let (snk, captured) = capture();

    let mut flow = Flow::new("manysrc");
    flow.add_routine(passthrough(), "one").unwrap();
    flow.add_routine(passthrough(), "two").unwrap();
    flow.add_routine(snk, "snk").unwrap();
    flow.connect("one", "out", "snk", "in").unwrap();
    flow.connect("two", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("manysrc", "one", "in", payload(json!({"n": 1})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    runtime.post("manysrc", "two", "in", payload(json!({"n": 2})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(*captured.lock(), vec![payload(json!({"n": 1})), payload(json!({"n": 2}))]);
}
