// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routine factories: registered constructors keyed by class name.
//!
//! A factory rebuilds a routine with its slots, events, and logic; the
//! document then layers config, activation policy, and error strategy on
//! top. Routines are therefore constructable with no parameters beyond
//! their class.

use crate::error::DocumentError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use weft_core::Routine;

type Factory = Arc<dyn Fn() -> Routine + Send + Sync>;

/// Lookup table from class name to routine constructor.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<String, Factory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide convenience instance.
    pub fn global() -> &'static FactoryRegistry {
        static GLOBAL: OnceLock<FactoryRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FactoryRegistry::new)
    }

    /// Register (or replace) a constructor under a class name.
    pub fn register(
        &self,
        class: impl Into<String>,
        factory: impl Fn() -> Routine + Send + Sync + 'static,
    ) {
        self.factories.write().insert(class.into(), Arc::new(factory));
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.read().contains_key(class)
    }

    /// Build a fresh routine for a class.
    pub fn build(&self, class: &str) -> Result<Routine, DocumentError> {
        let factory = self
            .factories
            .read()
            .get(class)
            .cloned()
            .ok_or_else(|| DocumentError::UnknownRoutineKind(class.to_string()))?;
        Ok(factory())
    }

    pub fn classes(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
