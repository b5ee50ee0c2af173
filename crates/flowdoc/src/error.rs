// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors for flow document encode/decode.

use thiserror::Error;
use weft_core::CoreError;

#[derive(Debug, Error)]
pub enum DocumentError {
    /// Version tag unknown to this build (and no migration covers it).
    #[error("incompatible flow document version {0}")]
    IncompatibleVersion(u32),

    #[error("routine factory '{0}' is not registered")]
    UnknownRoutineKind(String),

    #[error("invalid activation policy '{name}': {reason}")]
    InvalidPolicy { name: String, reason: String },

    /// An endpoint reference that is not `routine.port`.
    #[error("invalid endpoint reference '{0}' (expected 'routine.port')")]
    InvalidRef(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("document parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("migration from version {0} made no progress")]
    MigrationStalled(u32),
}
