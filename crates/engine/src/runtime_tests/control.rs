// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::RuntimeError;
use std::time::Duration;
use weft_core::test_support::HookCall;
use weft_core::{CoreError, RoutineOutcome};

#[test]
fn cancel_unknown_job_fails() {
    let runtime = runtime();
    let err = runtime.cancel_job(weft_core::JobId::from_string("job-ghost")).unwrap_err();
    assert_eq!(err, RuntimeError::Core(CoreError::JobNotFound("job-ghost".into())));
}

#[test]
fn cancel_discards_queued_tasks() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    // Hold dispatch so the job's tasks stay queued.
    runtime.exec("f").unwrap();
    runtime.pause_worker("f").unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    runtime.cancel_job(job.job_id()).unwrap();
    assert_eq!(job.status(), JobStatus::Cancelled);

    runtime.resume_worker("f").unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // Nothing ran for the cancelled job, and no routine reported ok.
    assert!(captured.lock().is_empty());
    assert_eq!(hooks.count(|c| matches!(c, HookCall::RoutineEnd(_, RoutineOutcome::Ok))), 0);
    assert_eq!(hooks.count(|c| matches!(c, HookCall::JobEnd(_, JobStatus::Cancelled))), 1);
    assert_eq!(runtime.stats().jobs_cancelled, 1);
}

#[test]
fn cancel_is_idempotent_and_sticky() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();
    runtime.exec("f").unwrap();
    runtime.pause_worker("f").unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    runtime.cancel_job(job.job_id()).unwrap();
    runtime.cancel_job(job.job_id()).unwrap();
    assert_eq!(runtime.stats().jobs_cancelled, 1);

    runtime.resume_worker("f").unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Cancelled);
}

#[test]
fn paused_worker_holds_jobs_until_resume() {
    let runtime = runtime();
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    runtime.exec("f").unwrap();
    runtime.pause_worker("f").unwrap();
    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();

    assert!(!runtime.wait_until_all_jobs_finished(Duration::from_millis(100)));
    assert!(captured.lock().is_empty());
    assert!(!job.is_terminal());

    runtime.resume_worker("f").unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(captured.lock().len(), 1);
}

#[test]
fn paused_job_is_held_until_resumed() {
    let runtime = runtime();
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();
    runtime.exec("f").unwrap();

    // Park dispatch so the pause lands before the first task runs.
    runtime.pause_worker("f").unwrap();
    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    runtime.pause_job(job.job_id()).unwrap();
    runtime.resume_worker("f").unwrap();

    // The worker is live again, but the job's tasks keep re-queueing.
    assert!(!runtime.wait_until_all_jobs_finished(Duration::from_millis(150)));
    assert!(captured.lock().is_empty());
    assert_eq!(job.status(), JobStatus::Paused);

    runtime.resume_job(job.job_id()).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(*captured.lock(), vec![pl(1)]);
}

#[test]
fn pause_unknown_job_fails() {
    let runtime = runtime();
    let ghost = weft_core::JobId::from_string("job-ghost");
    assert!(runtime.pause_job(ghost).is_err());
    assert!(runtime.resume_job(ghost).is_err());
}

#[test]
fn pause_worker_unknown_flow_fails() {
    let runtime = runtime();
    let err = runtime.pause_worker("ghost").unwrap_err();
    assert_eq!(err, RuntimeError::WorkerNotFound("ghost".into()));
}

#[test]
fn shutdown_wait_drains_and_refuses_new_work() {
    let runtime = runtime();
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert!(runtime.shutdown(true));

    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(captured.lock().len(), 1);
    assert!(runtime.workers().is_empty());

    let err = runtime.post("f", "src", "in", pl(2), None).unwrap_err();
    assert_eq!(err, RuntimeError::ShuttingDown);
    assert!(matches!(runtime.exec("f").unwrap_err(), RuntimeError::ShuttingDown));

    // Idempotent.
    assert!(runtime.shutdown(true));
}

#[test]
fn shutdown_nowait_cancels_in_flight_jobs() {
    let runtime = runtime();
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    runtime.exec("f").unwrap();
    runtime.pause_worker("f").unwrap();
    let (_, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();

    // Queued work is dropped: not a clean stop.
    assert!(!runtime.shutdown(false));
    assert_eq!(job.status(), JobStatus::Cancelled);
    assert!(captured.lock().is_empty());
    assert!(runtime.workers().is_empty());
    assert!(!runtime.flows().is_running("f"));
}

#[test]
fn wait_with_no_jobs_returns_immediately() {
    let runtime = runtime();
    assert!(runtime.wait_until_all_jobs_finished(Duration::from_millis(10)));
}

#[test]
fn queue_depth_reports_pending_work() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();
    runtime.exec("f").unwrap();
    runtime.pause_worker("f").unwrap();

    runtime.post("f", "src", "in", pl(1), None).unwrap();
    // The held task cycles between the ready and delayed lanes while the
    // worker is paused; poll briefly to observe it.
    let mut observed = false;
    for _ in 0..200 {
        if runtime.queue_depth() >= 1 {
            observed = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(observed);

    runtime.resume_worker("f").unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(runtime.queue_depth(), 0);
}

#[test]
fn backpressure_rejects_posts_at_the_bound() {
    let runtime = Runtime::with_deps(
        RuntimeConfig::new().thread_pool_size(1).max_queue_size(1),
        RuntimeDeps::default(),
        SystemClock,
    );
    let gate = Gate::new();

    let mut flow = Flow::new("f");
    let mut blocker = Routine::new("blocker");
    blocker.add_slot("in").unwrap();
    blocker.set_activation_policy(ActivationPolicy::Immediate);
    let logic_gate = Arc::clone(&gate);
    blocker.set_logic(move |_args: &mut LogicArgs<'_>| {
        logic_gate.enter_and_wait();
        Ok(())
    });
    flow.add_routine(blocker, "blocker").unwrap();
    runtime.flows().register(flow).unwrap();

    // First job occupies the only worker thread.
    runtime.post("f", "blocker", "in", pl(1), None).unwrap();
    gate.wait_entered();

    // Second job fills the queue to its bound of one.
    runtime.post("f", "blocker", "in", pl(2), None).unwrap();
    let err = runtime.post("f", "blocker", "in", pl(3), None).unwrap_err();
    assert_eq!(err, RuntimeError::Backpressure(1));

    gate.open();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
}

#[test]
fn cancel_suppresses_emits_of_in_flight_logic() {
    let hooks = recording();
    let runtime = runtime_hooked(hooks.clone());
    let gate = Gate::new();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let mut flow = Flow::new("f");
    let mut slow = Routine::new("slow");
    slow.add_slot("in").unwrap();
    slow.add_event("out", Vec::<&str>::new()).unwrap();
    slow.set_activation_policy(ActivationPolicy::Immediate);
    let logic_gate = Arc::clone(&gate);
    slow.set_logic(move |args: &mut LogicArgs<'_>| {
        logic_gate.enter_and_wait();
        args.emit("out", pl(9))?;
        Ok(())
    });
    flow.add_routine(slow, "slow").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect("slow", "out", "snk", "in").unwrap();
    runtime.flows().register(flow).unwrap();

    let (_, job) = runtime.post("f", "slow", "in", pl(1), None).unwrap();
    gate.wait_entered();
    runtime.cancel_job(job.job_id()).unwrap();
    gate.open();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    // The in-flight call finished, but its emit was suppressed and its end
    // did not report ok.
    assert!(captured.lock().is_empty());
    assert_eq!(hooks.count(|c| matches!(c, HookCall::RoutineEnd(_, RoutineOutcome::Ok))), 0);
    assert_eq!(job.status(), JobStatus::Cancelled);
}
