// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::DocumentError;
use serde_json::json;

#[test]
fn current_version_passes_through() {
    let registry = MigrationRegistry::with_defaults();
    let value = json!({"version": 1, "flow_id": "f"});
    assert_eq!(registry.migrate(value.clone()).unwrap(), value);
}

#[test]
fn untagged_legacy_is_version_zero() {
    assert_eq!(document_version(&json!({"flow_id": "f"})), 0);
    assert_eq!(document_version(&json!({"version": 1})), 1);
}

#[test]
fn legacy_document_gets_tagged() {
    let registry = MigrationRegistry::with_defaults();
    let migrated = registry.migrate(json!({"flow_id": "f"})).unwrap();
    assert_eq!(document_version(&migrated), 1);
    assert_eq!(migrated.get("flow_id"), Some(&json!("f")));
}

#[test]
fn future_version_is_incompatible() {
    let registry = MigrationRegistry::with_defaults();
    let err = registry.migrate(json!({"version": 99})).unwrap_err();
    assert!(matches!(err, DocumentError::IncompatibleVersion(99)));
}

#[test]
fn missing_step_is_incompatible() {
    let registry = MigrationRegistry::empty();
    let err = registry.migrate(json!({"flow_id": "f"})).unwrap_err();
    assert!(matches!(err, DocumentError::IncompatibleVersion(0)));
}

#[test]
fn stalled_migration_is_detected() {
    let mut registry = MigrationRegistry::empty();
    // A broken step that never bumps the version.
    registry.register(0, Ok);
    let err = registry.migrate(json!({"flow_id": "f"})).unwrap_err();
    assert!(matches!(err, DocumentError::MigrationStalled(0)));
}

#[test]
fn chained_steps_walk_to_current() {
    // Pretend 0 → 1 happens in one hop but via a custom chain that also
    // renames a field along the way.
    let mut registry = MigrationRegistry::empty();
    registry.register(0, |mut value| {
        if let Some(object) = value.as_object_mut() {
            if let Some(id) = object.remove("name") {
                object.insert("flow_id".to_string(), id);
            }
            object.insert("version".to_string(), serde_json::Value::from(1));
        }
        Ok(value)
    });
    let migrated = registry.migrate(json!({"name": "legacy"})).unwrap();
    assert_eq!(migrated.get("flow_id"), Some(&json!("legacy")));
    assert_eq!(document_version(&migrated), 1);
}
