// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn time_interval_throttles_but_never_strands_data() {
    let runtime = runtime();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    let mut ticker = sink(Arc::clone(&captured));
    ticker.set_activation_policy(ActivationPolicy::time_interval(Duration::from_millis(80)));
    flow.add_routine(ticker, "ticker").unwrap();
    runtime.flows().register(flow).unwrap();

    // First post fires immediately (no history).
    let (_, first) = runtime.post("f", "ticker", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(first.status(), JobStatus::Completed);
    assert_eq!(captured.lock().len(), 1);

    // Second post lands inside the quiet window: the activation re-checks
    // itself until the interval elapses, then consumes the data instead of
    // stranding it.
    let (_, second) = runtime.post("f", "ticker", "in", pl(2), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(second.status(), JobStatus::Completed);
    assert_eq!(captured.lock().len(), 2);
}

#[test]
fn batch_size_accumulates_across_posts() {
    let runtime = runtime();
    let observed = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    let mut batcher = Routine::new("batcher");
    batcher.add_slot("in").unwrap();
    batcher.set_activation_policy(ActivationPolicy::batch_size(3));
    let slices = Arc::clone(&observed);
    batcher.set_logic(move |args: &mut LogicArgs<'_>| {
        slices.lock().push(args.slice.clone());
        Ok(())
    });
    flow.add_routine(batcher, "batcher").unwrap();
    runtime.flows().register(flow).unwrap();

    // Two posts: below the threshold, both jobs drain without a fire.
    runtime.post("f", "batcher", "in", pl(1), None).unwrap();
    runtime.post("f", "batcher", "in", pl(2), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert!(observed.lock().is_empty());

    // Third post crosses it: one fire with all three payloads.
    runtime.post("f", "batcher", "in", pl(3), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let slices = observed.lock();
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0]["in"], vec![pl(1), pl(2), pl(3)]);
}

#[test]
fn last_fired_timestamp_lands_in_worker_state() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (worker, _) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let last = worker.routine_state_value("src", weft_core::policy::LAST_FIRED_KEY);
    assert!(last.is_some_and(|v| v.as_u64().is_some()));
}
