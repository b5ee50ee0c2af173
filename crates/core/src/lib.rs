// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! weft-core: data model for the weft workflow engine.
//!
//! Flows wire routines' events to other routines' slots; the runtime in
//! `weft-engine` schedules them. This crate holds the pure model: no I/O,
//! no threads beyond per-structure locks.

pub mod macros;

pub mod clock;
pub mod connection;
pub mod context;
pub mod error;
pub mod event;
pub mod flow;
pub mod handler;
pub mod hooks;
pub mod id;
pub mod job;
pub mod payload;
pub mod policy;
pub mod routine;
pub mod slot;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::{Connection, ParamMap, ParamSpec};
pub use context::{current_job, current_scope, emit, enter_scope, EventRouter, ExecutionScope};
pub use error::CoreError;
pub use event::EventSpec;
pub use flow::Flow;
pub use handler::ErrorPolicy;
pub use hooks::{
    current_hooks, reset_execution_hooks, set_execution_hooks, EnqueueDecision, ExecutionHooks,
    NoopHooks, RoutineOutcome,
};
pub use job::{JobContext, JobId, JobStatus, TraceEntry};
pub use payload::{payload_from, DataSlice, Payload, StateDict};
pub use policy::{
    register_breakpoint_predicate, register_custom_policy, Activation, ActivationPolicy,
    PolicyInput,
};
pub use routine::{Logic, LogicArgs, LogicError, Routine};
pub use slot::{QueueState, Slot, SlotRecord};
pub use worker::{WorkerId, WorkerState, WorkerStatus};
