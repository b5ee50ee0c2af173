// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chained version migrations for flow documents.
//!
//! Each step lifts a document from one version to the next; loading walks
//! the chain until the current version is reached. Version 0 (untagged
//! legacy) is accepted read-only via the bundled 0→1 step.

use crate::document::DOC_VERSION;
use crate::error::DocumentError;
use serde_json::Value;
use std::collections::HashMap;

type Migration = Box<dyn Fn(Value) -> Result<Value, DocumentError> + Send + Sync>;

/// Registry of `from_version → migration` steps.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: HashMap<u32, Migration>,
}

impl MigrationRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the bundled legacy step (0 → 1: tag the version).
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(0, |mut value| {
            if let Some(object) = value.as_object_mut() {
                object.insert("version".to_string(), Value::from(1));
            }
            Ok(value)
        });
        registry
    }

    pub fn register(
        &mut self,
        from_version: u32,
        step: impl Fn(Value) -> Result<Value, DocumentError> + Send + Sync + 'static,
    ) {
        self.steps.insert(from_version, Box::new(step));
    }

    /// Walk the chain until the document reaches [`DOC_VERSION`].
    pub fn migrate(&self, mut value: Value) -> Result<Value, DocumentError> {
        loop {
            let version = document_version(&value);
            if version == DOC_VERSION {
                return Ok(value);
            }
            if version > DOC_VERSION {
                return Err(DocumentError::IncompatibleVersion(version));
            }
            let step =
                self.steps.get(&version).ok_or(DocumentError::IncompatibleVersion(version))?;
            value = step(value)?;
            if document_version(&value) <= version {
                return Err(DocumentError::MigrationStalled(version));
            }
        }
    }
}

/// Version tag of a raw document; untagged documents are version 0.
pub fn document_version(value: &Value) -> u32 {
    value.get("version").and_then(Value::as_u64).unwrap_or(0) as u32
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
