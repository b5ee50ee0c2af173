// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::payload::payload_from;
use crate::worker::WorkerId;
use parking_lot::Mutex;
use serde_json::json;

/// Test router that records every routed emit.
struct RecordingRouter {
    emits: Mutex<Vec<(String, Payload)>>,
}

impl RecordingRouter {
    fn new() -> Arc<Self> {
        Arc::new(Self { emits: Mutex::new(Vec::new()) })
    }
}

impl EventRouter for RecordingRouter {
    fn route_emit(
        &self,
        _scope: &ExecutionScope,
        event: &str,
        payload: Payload,
    ) -> Result<(), CoreError> {
        self.emits.lock().push((event.to_string(), payload));
        Ok(())
    }
}

fn scope(router: Arc<RecordingRouter>) -> ExecutionScope {
    ExecutionScope {
        job: Arc::new(JobContext::new(WorkerId::new(), "flow-t", Payload::new(), 0)),
        worker: Arc::new(WorkerState::new("flow-t")),
        routine_id: "r1".into(),
        router,
    }
}

#[test]
fn emit_outside_scope_fails() {
    assert_eq!(emit("out", Payload::new()).unwrap_err(), CoreError::NoExecutionContext);
    assert!(current_job().is_none());
    assert!(current_scope().is_none());
}

#[test]
fn emit_inside_scope_routes() {
    let router = RecordingRouter::new();
    let scope = scope(Arc::clone(&router));
    let job_id = scope.job.job_id();
    {
        let _guard = enter_scope(scope);
        emit("out", payload_from(json!({"v": 1}))).unwrap();
        assert_eq!(current_job().unwrap().job_id(), job_id);
    }
    let emits = router.emits.lock();
    assert_eq!(emits.len(), 1);
    assert_eq!(emits[0].0, "out");
}

#[test]
fn scope_is_cleared_after_guard_drop() {
    let router = RecordingRouter::new();
    {
        let _guard = enter_scope(scope(router));
        assert!(current_scope().is_some());
    }
    assert!(current_scope().is_none());
}

#[test]
fn nested_scopes_restore_previous() {
    let router = RecordingRouter::new();
    let outer = scope(Arc::clone(&router));
    let outer_job = outer.job.job_id();
    let _outer_guard = enter_scope(outer);
    {
        let inner = scope(Arc::clone(&router));
        let inner_job = inner.job.job_id();
        let _inner_guard = enter_scope(inner);
        assert_eq!(current_job().unwrap().job_id(), inner_job);
    }
    assert_eq!(current_job().unwrap().job_id(), outer_job);
}

#[test]
fn scope_is_thread_local() {
    let router = RecordingRouter::new();
    let _guard = enter_scope(scope(router));
    std::thread::spawn(|| {
        assert!(current_scope().is_none());
    })
    .join()
    .unwrap();
}
