// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error signals surfaced by the core data model.

use smol_str::SmolStr;
use thiserror::Error;

/// Signals exposed to callers of the core data model and runtime.
///
/// Variant names line up with the wire-level signal names hosts see
/// (`queue_full`, `flow_not_found`, …).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Slot at capacity on enqueue.
    #[error("slot '{slot}' on routine '{routine}' is full (capacity {capacity})")]
    QueueFull { routine: SmolStr, slot: SmolStr, capacity: usize },

    #[error("flow '{0}' not found")]
    FlowNotFound(String),

    #[error("flow '{0}' already exists")]
    FlowAlreadyExists(String),

    #[error("routine '{0}' not found")]
    RoutineNotFound(String),

    #[error("slot '{slot}' not found on routine '{routine}'")]
    SlotNotFound { routine: SmolStr, slot: SmolStr },

    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// `emit` called outside of a logic invocation.
    #[error("no execution context: emit called outside of a logic invocation")]
    NoExecutionContext,

    #[error("routine '{0}' has no activation policy")]
    NoActivationPolicy(String),

    #[error("param map references missing source key '{key}'")]
    ParamMapMissingSource { key: String },

    #[error("job '{0}' not found")]
    JobNotFound(String),

    /// Mutation attempted while the flow's worker is running.
    #[error("flow '{0}' is running; stop its worker before mutating")]
    FlowRunning(String),

    #[error("custom activation policy '{0}' is not registered")]
    UnknownPolicy(SmolStr),

    #[error("breakpoint predicate '{0}' is not registered")]
    UnknownPredicate(SmolStr),

    /// Duplicate slot/event/routine name at registration.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: SmolStr },

    /// Config mutation after the routine's flow started running.
    #[error("config of routine '{0}' is frozen")]
    ConfigFrozen(SmolStr),
}
