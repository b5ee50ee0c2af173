// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named output ports on a routine.
//!
//! An event is effectively a label: routing happens in the runtime by
//! looking up connections for `(routine_id, event_name)`. The declared
//! parameter keys are documentation for flow authors.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Descriptor for a named output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: SmolStr,
    /// Declared parameter keys (documentation only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<SmolStr>,
}

impl EventSpec {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self { name: name.into(), params: Vec::new() }
    }

    pub fn with_params<I, S>(name: impl Into<SmolStr>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self { name: name.into(), params: params.into_iter().map(Into::into).collect() }
    }
}
