// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires from a source event to a target slot, with optional payload remap.

use crate::error::CoreError;
use crate::payload::Payload;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

/// One entry in a [`ParamMap`]: either a reference to a key of the source
/// payload, or a literal value.
///
/// Wire form: a JSON string is a source-key reference; a literal is the
/// object `{"$literal": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Source(SmolStr),
    Literal {
        #[serde(rename = "$literal")]
        literal: Value,
    },
}

impl ParamSpec {
    pub fn source(key: impl Into<SmolStr>) -> Self {
        Self::Source(key.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal { literal: value.into() }
    }
}

/// Mapping from target payload keys to source keys or literals.
///
/// When a connection carries a map, unlisted source keys are dropped; a
/// connection without a map passes the payload through verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamMap(pub IndexMap<SmolStr, ParamSpec>);

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, target_key: impl Into<SmolStr>, spec: ParamSpec) -> Self {
        self.0.insert(target_key.into(), spec);
        self
    }

    /// Build the target payload from the source payload.
    ///
    /// Fails with `param_map_missing_source` when a referenced key is
    /// absent from the source.
    pub fn apply(&self, source: &Payload) -> Result<Payload, CoreError> {
        let mut target = Payload::new();
        for (target_key, spec) in &self.0 {
            match spec {
                ParamSpec::Source(key) => match source.get(key.as_str()) {
                    Some(value) => {
                        target.insert(target_key.to_string(), value.clone());
                    }
                    None => {
                        return Err(CoreError::ParamMapMissingSource { key: key.to_string() })
                    }
                },
                ParamSpec::Literal { literal } => {
                    target.insert(target_key.to_string(), literal.clone());
                }
            }
        }
        Ok(target)
    }
}

/// An immutable wire from `(source_routine, source_event)` to
/// `(target_routine, target_slot)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source_routine: SmolStr,
    pub source_event: SmolStr,
    pub target_routine: SmolStr,
    pub target_slot: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_map: Option<ParamMap>,
}

impl Connection {
    pub fn new(
        source_routine: impl Into<SmolStr>,
        source_event: impl Into<SmolStr>,
        target_routine: impl Into<SmolStr>,
        target_slot: impl Into<SmolStr>,
    ) -> Self {
        Self {
            source_routine: source_routine.into(),
            source_event: source_event.into(),
            target_routine: target_routine.into(),
            target_slot: target_slot.into(),
            param_map: None,
        }
    }

    pub fn with_param_map(mut self, map: ParamMap) -> Self {
        self.param_map = Some(map);
        self
    }

    /// Apply this connection's remap to a payload (pass-through when the
    /// connection has no map).
    pub fn project(&self, source: &Payload) -> Result<Payload, CoreError> {
        match &self.param_map {
            None => Ok(source.clone()),
            Some(map) => map.apply(source),
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
