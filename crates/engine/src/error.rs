// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime-level errors.

use thiserror::Error;
use weft_core::CoreError;

/// Errors surfaced by runtime operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Operation refused because the runtime is draining or stopped.
    #[error("runtime is shutting down")]
    ShuttingDown,

    /// Task queue at its configured bound; the post was refused.
    #[error("task queue at capacity ({0})")]
    Backpressure(usize),

    #[error("no worker for flow '{0}'")]
    WorkerNotFound(String),
}
