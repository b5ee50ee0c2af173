// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linear pipelines end to end.

use super::*;
use weft_core::JobStatus;

#[test]
fn linear_pipeline_doubles_twice() {
    let runtime = runtime();
    let (snk, captured) = capture();

    let mut flow = Flow::new("linear");
    flow.add_routine(doubler(), "src").unwrap();
    flow.add_routine(doubler(), "dbl").unwrap();
    flow.add_routine(snk, "snk").unwrap();
    flow.connect("src", "out", "dbl", "in").unwrap();
    flow.connect("dbl", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("linear", "src", "in", payload(json!({"v": 3})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(*captured.lock(), vec![payload(json!({"v": 12}))]);
    assert_eq!(job.status(), JobStatus::Completed);
    assert!(runtime.shutdown(true));
}

#[test]
fn many_jobs_through_one_pipeline() {
    let runtime = runtime();
    let (snk, captured) = capture();

    let mut flow = Flow::new("linear");
    flow.add_routine(doubler(), "src").unwrap();
    flow.add_routine(snk, "snk").unwrap();
    flow.connect("src", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    for v in 0..25 {
        runtime.post("linear", "src", "in", payload(json!({"v": v})), None).unwrap();
    }
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let mut seen: Vec<i64> =
        captured.lock().iter().filter_map(|p| p.get("v").and_then(|v| v.as_i64())).collect();
    seen.sort_unstable();
    let expected: Vec<i64> = (0..25).map(|v| v * 2).collect();
    assert_eq!(seen, expected);

    let stats = runtime.stats();
    assert_eq!(stats.jobs_created, 25);
    assert_eq!(stats.jobs_completed, 25);
    assert_eq!(stats.jobs_failed, 0);
}

#[test]
fn wait_returns_only_when_every_job_is_terminal() {
    let runtime = runtime();
    let (snk, _captured) = capture();

    let mut flow = Flow::new("linear");
    flow.add_routine(doubler(), "src").unwrap();
    flow.add_routine(snk, "snk").unwrap();
    flow.connect("src", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.exec("linear").unwrap();
    runtime.pause_worker("linear").unwrap();
    let (_, job) = runtime.post("linear", "src", "in", payload(json!({"v": 1})), None).unwrap();

    assert!(!runtime.wait_until_all_jobs_finished(Duration::from_millis(80)));
    runtime.resume_worker("linear").unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert!(job.is_terminal());
}
