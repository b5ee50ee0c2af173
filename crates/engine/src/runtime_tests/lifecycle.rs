// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use weft_core::CoreError;
use weft_core::WorkerStatus;

#[test]
fn exec_unknown_flow_fails() {
    let runtime = runtime();
    let err = runtime.exec("missing").unwrap_err();
    assert_eq!(err, crate::RuntimeError::Core(CoreError::FlowNotFound("missing".into())));
}

#[test]
fn exec_is_idempotent() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let first = runtime.exec("f").unwrap();
    let second = runtime.exec("f").unwrap();
    assert_eq!(first.worker_id(), second.worker_id());
    assert_eq!(first.status(), WorkerStatus::Running);
    assert_eq!(runtime.workers().len(), 1);
}

#[test]
fn exec_seals_flow_and_marks_running() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();
    runtime.exec("f").unwrap();

    assert!(runtime.flows().is_running("f"));
    // Structural mutation is rejected while running.
    let err = runtime.flows().update("f", |_| ()).unwrap_err();
    assert_eq!(err, CoreError::FlowRunning("f".into()));
    let err = runtime.flows().unregister("f").unwrap_err();
    assert_eq!(err, CoreError::FlowRunning("f".into()));
}

#[test]
fn shutdown_releases_flow_for_mutation() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();
    runtime.exec("f").unwrap();
    assert!(runtime.shutdown(true));

    assert!(!runtime.flows().is_running("f"));
    runtime.flows().update("f", |flow| assert!(!flow.is_sealed())).unwrap();
    runtime.flows().unregister("f").unwrap();
}

#[test]
fn exec_validates_the_flow() {
    let runtime = runtime();
    // Break an idle registered flow, then try to exec it.
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();
    runtime
        .flows()
        .update("f", |flow| {
            let mut routine = Routine::new("test");
            routine.add_slot("in").unwrap();
            // No activation policy.
            flow.add_routine(routine, "lazy").unwrap();
        })
        .unwrap();

    let err = runtime.exec("f").unwrap_err();
    assert_eq!(err, crate::RuntimeError::Core(CoreError::NoActivationPolicy("lazy".into())));
}

#[test]
fn post_auto_execs_the_flow() {
    let runtime = runtime();
    let (flow, captured) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let (worker, job) = runtime.post("f", "src", "in", pl(1), None).unwrap();
    assert_eq!(worker.status(), WorkerStatus::Running);
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
    assert_eq!(runtime.get_job(job.job_id()).unwrap().status(), JobStatus::Completed);
    assert_eq!(captured.lock().len(), 1);
}

#[test]
fn post_unknown_routine_or_slot_fails() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let err = runtime.post("f", "ghost", "in", pl(1), None).unwrap_err();
    assert_eq!(err, crate::RuntimeError::Core(CoreError::RoutineNotFound("ghost".into())));

    let err = runtime.post("f", "src", "ghost", pl(1), None).unwrap_err();
    assert!(matches!(err, crate::RuntimeError::Core(CoreError::SlotNotFound { .. })));

    let err = runtime.post("ghost", "src", "in", pl(1), None).unwrap_err();
    assert_eq!(err, crate::RuntimeError::Core(CoreError::FlowNotFound("ghost".into())));
}

#[test]
fn get_job_returns_nil_for_unknown() {
    let runtime = runtime();
    assert!(runtime.get_job(weft_core::JobId::from_string("job-nope")).is_none());
}

#[test]
fn metadata_reaches_job_context() {
    let runtime = runtime();
    let (flow, _) = linear_flow("f");
    runtime.flows().register(flow).unwrap();

    let metadata = payload(json!({"origin": "test"}));
    let (_, job) = runtime.post("f", "src", "in", pl(1), Some(metadata)).unwrap();
    assert_eq!(job.metadata().get("origin"), Some(&json!("test")));
    assert!(runtime.wait_until_all_jobs_finished(WAIT));
}
