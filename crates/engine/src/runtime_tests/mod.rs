// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

mod control;
mod errors;
mod hooks;
mod lifecycle;
mod posting;
mod throttle;

use crate::registry::FlowRegistry;
use crate::runtime::{Runtime, RuntimeConfig, RuntimeDeps};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use weft_core::test_support::{payload, relay, sink, RecordingHooks};
use weft_core::{
    ActivationPolicy, ExecutionHooks, Flow, JobStatus, LogicArgs, Payload, Routine, SystemClock,
};

pub(crate) const WAIT: Duration = Duration::from_secs(5);

pub(crate) fn pl(n: i64) -> Payload {
    payload(json!({ "n": n }))
}

/// Single-threaded runtime: deterministic dispatch order.
pub(crate) fn runtime() -> Runtime {
    runtime_threads(1)
}

pub(crate) fn runtime_threads(threads: usize) -> Runtime {
    Runtime::with_deps(
        RuntimeConfig::new().thread_pool_size(threads),
        RuntimeDeps::default(),
        SystemClock,
    )
}

pub(crate) fn runtime_hooked(hooks: Arc<dyn ExecutionHooks>) -> Runtime {
    Runtime::with_deps(
        RuntimeConfig::new().thread_pool_size(1),
        RuntimeDeps { flows: Arc::new(FlowRegistry::new()), hooks: Some(hooks) },
        SystemClock,
    )
}

/// `src` (relay) → `snk` (capture). Returns the flow and the capture buffer.
pub(crate) fn linear_flow(flow_id: &str) -> (Flow, Arc<Mutex<Vec<Payload>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let mut flow = Flow::new(flow_id);
    flow.add_routine(relay(), "src").unwrap();
    flow.add_routine(sink(Arc::clone(&captured)), "snk").unwrap();
    flow.connect("src", "out", "snk", "in").unwrap();
    (flow, captured)
}

/// A routine whose logic always fails with `boom`.
pub(crate) fn failing_routine() -> Routine {
    let mut routine = Routine::new("failing");
    routine.add_slot("in").unwrap();
    routine.add_event("out", Vec::<&str>::new()).unwrap();
    routine.set_activation_policy(ActivationPolicy::Immediate);
    routine.set_logic(|_args: &mut LogicArgs<'_>| Err("boom".into()));
    routine
}

pub(crate) fn recording() -> Arc<RecordingHooks> {
    RecordingHooks::new()
}

/// Two-phase gate for coordinating with in-flight logic from a test.
pub(crate) struct Gate {
    state: Mutex<(bool, bool)>,
    signal: parking_lot::Condvar,
}

impl Gate {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { state: Mutex::new((false, false)), signal: parking_lot::Condvar::new() })
    }

    /// Called from inside logic: announce entry, block until opened.
    pub(crate) fn enter_and_wait(&self) {
        let mut state = self.state.lock();
        state.0 = true;
        self.signal.notify_all();
        while !state.1 {
            self.signal.wait(&mut state);
        }
    }

    /// Called from the test: block until logic has entered.
    pub(crate) fn wait_entered(&self) {
        let mut state = self.state.lock();
        while !state.0 {
            self.signal.wait(&mut state);
        }
    }

    /// Called from the test: release the blocked logic.
    pub(crate) fn open(&self) {
        let mut state = self.state.lock();
        state.1 = true;
        self.signal.notify_all();
    }
}
