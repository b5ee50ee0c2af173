// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error strategies under real dispatch.

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use weft_core::{ErrorPolicy, JobStatus};

#[test]
fn retry_twice_then_give_up() {
    let runtime = runtime();
    let attempts = Arc::new(AtomicU32::new(0));

    let mut flow = Flow::new("retrying");
    let mut shaky = Routine::new("shaky");
    shaky.add_slot("in").unwrap();
    shaky.set_activation_policy(ActivationPolicy::Immediate);
    shaky.set_error_policy(Some(ErrorPolicy::retry(2, Duration::from_millis(10), 1.0)));
    let counter = Arc::clone(&attempts);
    shaky.set_logic(move |_args: &mut LogicArgs<'_>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err("always down".into())
    });
    flow.add_routine(shaky, "r").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("retrying", "r", "in", payload(json!({"n": 1})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // Three failed attempts (initial + 2 retries), then the flow default
    // (stop) fails the job with the error recorded.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(job.status(), JobStatus::Failed);
    assert_eq!(job.error(), Some("always down".into()));
}

#[test]
fn retry_delay_backs_off() {
    let runtime = runtime();
    let fired_at = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("backoff");
    let mut shaky = Routine::new("shaky");
    shaky.add_slot("in").unwrap();
    shaky.set_activation_policy(ActivationPolicy::Immediate);
    shaky.set_error_policy(Some(ErrorPolicy::retry(2, Duration::from_millis(40), 2.0)));
    let stamps = Arc::clone(&fired_at);
    shaky.set_logic(move |_args: &mut LogicArgs<'_>| {
        stamps.lock().push(std::time::Instant::now());
        Err("always down".into())
    });
    flow.add_routine(shaky, "r").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.post("backoff", "r", "in", payload(json!({"n": 1})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    let stamps = fired_at.lock();
    assert_eq!(stamps.len(), 3);
    // base_delay then base_delay * backoff.
    assert!(stamps[1] - stamps[0] >= Duration::from_millis(40));
    assert!(stamps[2] - stamps[1] >= Duration::from_millis(80));
}

#[test]
fn continue_strategy_reports_completed_with_trace() {
    let runtime = runtime();

    let mut flow = Flow::new("tolerant");
    let mut grumpy = Routine::new("grumpy");
    grumpy.add_slot("in").unwrap();
    grumpy.set_activation_policy(ActivationPolicy::Immediate);
    grumpy.set_error_policy(Some(ErrorPolicy::Continue));
    grumpy.set_logic(|_args: &mut LogicArgs<'_>| Err("harmless".into()));
    flow.add_routine(grumpy, "g").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("tolerant", "g", "in", payload(json!({"n": 1})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(job.status(), JobStatus::Completed);
    let log = job.trace_log();
    assert!(log.iter().any(|entry| entry.action == "error"));
    assert!(log.iter().any(|entry| entry.action == "continued_after_error"));
}

#[test]
fn cancelled_job_reports_cancelled_status() {
    let runtime = runtime();
    let (snk, captured) = capture();

    let mut flow = Flow::new("doomed");
    flow.add_routine(passthrough(), "src").unwrap();
    flow.add_routine(snk, "snk").unwrap();
    flow.connect("src", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    runtime.exec("doomed").unwrap();
    runtime.pause_worker("doomed").unwrap();
    let (_, job) = runtime.post("doomed", "src", "in", payload(json!({"n": 1})), None).unwrap();
    runtime.cancel_job(job.job_id()).unwrap();
    runtime.resume_worker("doomed").unwrap();

    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Cancelled);
    assert!(captured.lock().is_empty());
}
