// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The versioned flow document schema and its encode/decode paths.
//!
//! Round-trip law: decoding an encoded flow yields a structurally
//! identical flow (same ids, connection order, configs, policy bindings).
//! Worker and job state never serialize with a flow.

use crate::error::DocumentError;
use crate::factory::FactoryRegistry;
use crate::migrate::{document_version, MigrationRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::time::Duration;
use weft_core::{ActivationPolicy, ErrorPolicy, Flow, ParamMap, Payload};

/// Current document schema version.
pub const DOC_VERSION: u32 = 1;

/// Serialized activation policy: a name plus policy-specific args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

/// One routine entry: class (factory name), config, policy, and an
/// optional error strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineDoc {
    pub class: String,
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub config: Payload,
    pub activation_policy: PolicyDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handler: Option<ErrorPolicy>,
}

/// One wire: `from: "routine.event"`, `to: "routine.slot"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDoc {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_map: Option<ParamMap>,
}

/// A complete serialized flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    pub version: u32,
    pub flow_id: String,
    pub routines: IndexMap<String, RoutineDoc>,
    pub connections: Vec<ConnectionDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handler: Option<ErrorPolicy>,
}

impl FlowDocument {
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Encode a flow into a document.
pub fn encode_flow(flow: &Flow) -> FlowDocument {
    let mut routines = IndexMap::with_capacity(flow.routines().len());
    for (routine_id, routine) in flow.routines() {
        routines.insert(
            routine_id.to_string(),
            RoutineDoc {
                class: routine.kind().to_string(),
                config: routine.config().clone(),
                activation_policy: routine
                    .activation_policy()
                    .map(policy_to_doc)
                    .unwrap_or_else(|| PolicyDoc { name: "immediate".into(), args: Value::Null }),
                error_handler: routine.error_policy().cloned(),
            },
        );
    }
    let connections = flow
        .connections()
        .iter()
        .map(|connection| ConnectionDoc {
            from: format!("{}.{}", connection.source_routine, connection.source_event),
            to: format!("{}.{}", connection.target_routine, connection.target_slot),
            param_map: connection.param_map.clone(),
        })
        .collect();
    FlowDocument {
        version: DOC_VERSION,
        flow_id: flow.flow_id().to_string(),
        routines,
        connections,
        error_handler: flow.error_policy().cloned(),
    }
}

/// Serialize a flow straight to JSON.
pub fn serialize_flow(flow: &Flow) -> Result<String, DocumentError> {
    encode_flow(flow).to_json()
}

/// Decode a document into a flow, rebuilding routines via `factories`.
pub fn decode_document(
    document: FlowDocument,
    factories: &FactoryRegistry,
) -> Result<Flow, DocumentError> {
    if document.version != DOC_VERSION {
        return Err(DocumentError::IncompatibleVersion(document.version));
    }
    let mut flow = Flow::new(document.flow_id);
    for (routine_id, routine_doc) in document.routines {
        let mut routine = factories.build(&routine_doc.class)?;
        routine.set_config_map(routine_doc.config).map_err(DocumentError::from)?;
        routine.set_activation_policy(policy_from_doc(&routine_doc.activation_policy)?);
        routine.set_error_policy(routine_doc.error_handler);
        flow.add_routine(routine, SmolStr::new(routine_id)).map_err(DocumentError::from)?;
    }
    for connection in document.connections {
        let (source, event) = split_ref(&connection.from)?;
        let (target, slot) = split_ref(&connection.to)?;
        flow.connect_with(source, event, target, slot, connection.param_map)
            .map_err(DocumentError::from)?;
    }
    flow.set_error_policy(document.error_handler);
    Ok(flow)
}

/// Deserialize a flow from JSON, migrating older versions first.
///
/// Current-version documents parse directly (routine order preserved);
/// older versions go through the migration chain.
pub fn deserialize_flow(
    json: &str,
    factories: &FactoryRegistry,
    migrations: &MigrationRegistry,
) -> Result<Flow, DocumentError> {
    let raw: Value = serde_json::from_str(json)?;
    let document: FlowDocument = if document_version(&raw) == DOC_VERSION {
        serde_json::from_str(json)?
    } else {
        serde_json::from_value(migrations.migrate(raw)?)?
    };
    decode_document(document, factories)
}

fn split_ref(reference: &str) -> Result<(&str, &str), DocumentError> {
    reference
        .split_once('.')
        .filter(|(routine, port)| !routine.is_empty() && !port.is_empty())
        .ok_or_else(|| DocumentError::InvalidRef(reference.to_string()))
}

/// `ActivationPolicy` → `{name, args}`.
///
/// Custom policies serialize under their registered name; decode treats
/// any unknown name as a custom reference.
pub fn policy_to_doc(policy: &ActivationPolicy) -> PolicyDoc {
    match policy {
        ActivationPolicy::Immediate => PolicyDoc { name: "immediate".into(), args: Value::Null },
        ActivationPolicy::AllSlotsReady => {
            PolicyDoc { name: "all_slots_ready".into(), args: Value::Null }
        }
        ActivationPolicy::BatchSize(size) => PolicyDoc {
            name: "batch_size".into(),
            args: serde_json::json!({ "size": size }),
        },
        ActivationPolicy::TimeInterval(interval) => PolicyDoc {
            name: "time_interval".into(),
            args: serde_json::json!({ "secs": interval.as_secs_f64() }),
        },
        ActivationPolicy::Breakpoint { base, predicate } => PolicyDoc {
            name: "breakpoint".into(),
            args: serde_json::json!({
                "base": serde_json::to_value(policy_to_doc(base)).unwrap_or(Value::Null),
                "predicate": predicate.as_str(),
            }),
        },
        ActivationPolicy::Custom { name } => {
            PolicyDoc { name: name.to_string(), args: Value::Null }
        }
    }
}

/// `{name, args}` → `ActivationPolicy`.
pub fn policy_from_doc(doc: &PolicyDoc) -> Result<ActivationPolicy, DocumentError> {
    let invalid = |reason: &str| DocumentError::InvalidPolicy {
        name: doc.name.clone(),
        reason: reason.to_string(),
    };
    match doc.name.as_str() {
        "immediate" => Ok(ActivationPolicy::Immediate),
        "all_slots_ready" => Ok(ActivationPolicy::AllSlotsReady),
        "batch_size" => {
            let size = doc
                .args
                .get("size")
                .and_then(Value::as_u64)
                .ok_or_else(|| invalid("missing integer arg 'size'"))?;
            Ok(ActivationPolicy::batch_size(size as usize))
        }
        "time_interval" => {
            let secs = doc
                .args
                .get("secs")
                .and_then(Value::as_f64)
                .filter(|s| s.is_finite() && *s >= 0.0)
                .ok_or_else(|| invalid("missing number arg 'secs'"))?;
            Ok(ActivationPolicy::time_interval(Duration::from_secs_f64(secs)))
        }
        "breakpoint" => {
            let base_doc: PolicyDoc = serde_json::from_value(
                doc.args.get("base").cloned().ok_or_else(|| invalid("missing arg 'base'"))?,
            )?;
            let predicate = doc
                .args
                .get("predicate")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("missing string arg 'predicate'"))?;
            Ok(ActivationPolicy::breakpoint(policy_from_doc(&base_doc)?, predicate))
        }
        // Anything else is a custom policy referenced by registered name.
        custom => Ok(ActivationPolicy::custom(custom)),
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
