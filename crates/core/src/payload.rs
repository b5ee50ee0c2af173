// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-shaped value types carried across flow edges.
//!
//! Payloads and configs are frozen to JSON-compatible values: whatever a
//! routine computes internally, only these shapes may cross an edge or be
//! stored in a state dict.

use indexmap::IndexMap;
use serde_json::Value;
use smol_str::SmolStr;

/// A keyed payload travelling along a connection, or a routine's config map.
pub type Payload = serde_json::Map<String, Value>;

/// A routine's persisted state dict inside a [`crate::worker::WorkerState`].
pub type StateDict = serde_json::Map<String, Value>;

/// The data handed to a routine's logic: consumed payloads keyed by slot
/// name, in slot insertion order.
pub type DataSlice = IndexMap<SmolStr, Vec<Payload>>;

/// Build a [`Payload`] from any JSON object value.
///
/// Non-object values are wrapped under a `"value"` key so scalar emits
/// stay representable.
pub fn payload_from(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Payload::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
