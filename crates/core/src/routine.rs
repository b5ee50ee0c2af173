// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-authored units of work: slots in, events out, logic in between.

use crate::error::CoreError;
use crate::event::EventSpec;
use crate::handler::ErrorPolicy;
use crate::payload::{DataSlice, Payload};
use crate::policy::ActivationPolicy;
use crate::slot::Slot;
use crate::worker::WorkerState;
use serde_json::Value;
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

/// Error returned by routine logic. Carries a message only; the runtime
/// decides what to do with it via the error-handling strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicError {
    message: String,
}

impl LogicError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LogicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LogicError {}

impl From<&str> for LogicError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for LogicError {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CoreError> for LogicError {
    fn from(e: CoreError) -> Self {
        Self::new(e.to_string())
    }
}

/// Arguments handed to a logic invocation.
pub struct LogicArgs<'a> {
    pub routine_id: &'a str,
    /// Consumed payloads per slot, in slot insertion order.
    pub slice: &'a DataSlice,
    /// Note from the activation policy, if any.
    pub message: Option<&'a str>,
    pub worker: &'a WorkerState,
}

impl LogicArgs<'_> {
    /// Emit through the ambient execution scope.
    ///
    /// Fails with `no_execution_context` outside a scheduled invocation and
    /// `queue_full` when a downstream slot is at capacity.
    pub fn emit(&self, event: &str, payload: Payload) -> Result<(), CoreError> {
        crate::context::emit(event, payload)
    }

    /// The job this invocation runs under.
    pub fn job(&self) -> Option<Arc<crate::job::JobContext>> {
        crate::context::current_job()
    }
}

/// The body of a routine.
pub trait Logic: Send + Sync {
    fn call(&self, args: &mut LogicArgs<'_>) -> Result<(), LogicError>;
}

impl<F> Logic for F
where
    F: Fn(&mut LogicArgs<'_>) -> Result<(), LogicError> + Send + Sync,
{
    fn call(&self, args: &mut LogicArgs<'_>) -> Result<(), LogicError> {
        self(args)
    }
}

/// A routine: named slots, named events, frozen-after-start config, a logic
/// body, and a bound activation policy.
///
/// Routines are constructable with no required parameters beyond their
/// `kind` (the registered factory name) so they can be rebuilt from a
/// serialized flow; per-instance tunables live in `config`.
pub struct Routine {
    /// Routine id within the flow; assigned by `Flow::add_routine`.
    id: SmolStr,
    /// Registered factory name used by serialization.
    kind: SmolStr,
    slots: indexmap::IndexMap<SmolStr, Slot>,
    events: indexmap::IndexMap<SmolStr, EventSpec>,
    config: Payload,
    config_frozen: bool,
    logic: Option<Arc<dyn Logic>>,
    policy: Option<ActivationPolicy>,
    error_policy: Option<ErrorPolicy>,
}

impl Routine {
    pub fn new(kind: impl Into<SmolStr>) -> Self {
        Self {
            id: SmolStr::default(),
            kind: kind.into(),
            slots: indexmap::IndexMap::new(),
            events: indexmap::IndexMap::new(),
            config: Payload::new(),
            config_frozen: false,
            logic: None,
            policy: None,
            error_policy: None,
        }
    }

    pub fn id(&self) -> &SmolStr {
        &self.id
    }

    pub fn kind(&self) -> &SmolStr {
        &self.kind
    }

    /// Add a slot with default capacity/watermark.
    pub fn add_slot(&mut self, name: impl Into<SmolStr>) -> Result<&mut Self, CoreError> {
        self.insert_slot(Slot::new(name.into()))
    }

    /// Add a slot with explicit capacity/watermark.
    pub fn add_slot_with(
        &mut self,
        name: impl Into<SmolStr>,
        max_queue_length: usize,
        watermark: f64,
    ) -> Result<&mut Self, CoreError> {
        self.insert_slot(Slot::with_limits(name.into(), max_queue_length, watermark))
    }

    fn insert_slot(&mut self, mut slot: Slot) -> Result<&mut Self, CoreError> {
        if self.slots.contains_key(slot.name()) {
            return Err(CoreError::DuplicateName { kind: "slot", name: slot.name().clone() });
        }
        slot.set_owner(self.id.clone());
        self.slots.insert(slot.name().clone(), slot);
        Ok(self)
    }

    /// Declare an output event with its documented parameter keys.
    pub fn add_event<I, S>(
        &mut self,
        name: impl Into<SmolStr>,
        params: I,
    ) -> Result<&mut Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let spec = EventSpec::with_params(name, params);
        if self.events.contains_key(&spec.name) {
            return Err(CoreError::DuplicateName { kind: "event", name: spec.name });
        }
        self.events.insert(spec.name.clone(), spec);
        Ok(self)
    }

    /// Set one config key. Rejected once the containing flow has started.
    pub fn set_config(&mut self, key: impl Into<String>, value: Value) -> Result<(), CoreError> {
        if self.config_frozen {
            return Err(CoreError::ConfigFrozen(self.id.clone()));
        }
        self.config.insert(key.into(), value);
        Ok(())
    }

    /// Replace the whole config map (used when rebuilding from a document).
    pub fn set_config_map(&mut self, config: Payload) -> Result<(), CoreError> {
        if self.config_frozen {
            return Err(CoreError::ConfigFrozen(self.id.clone()));
        }
        self.config = config;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn get_config_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.config.get(key).unwrap_or(default)
    }

    pub fn config(&self) -> &Payload {
        &self.config
    }

    pub fn set_logic(&mut self, logic: impl Logic + 'static) -> &mut Self {
        self.logic = Some(Arc::new(logic));
        self
    }

    pub fn set_activation_policy(&mut self, policy: ActivationPolicy) -> &mut Self {
        self.policy = Some(policy);
        self
    }

    pub fn set_error_policy(&mut self, policy: Option<ErrorPolicy>) -> &mut Self {
        self.error_policy = policy;
        self
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    pub fn slots(&self) -> &indexmap::IndexMap<SmolStr, Slot> {
        &self.slots
    }

    pub fn events(&self) -> &indexmap::IndexMap<SmolStr, EventSpec> {
        &self.events
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub fn activation_policy(&self) -> Option<&ActivationPolicy> {
        self.policy.as_ref()
    }

    pub fn error_policy(&self) -> Option<&ErrorPolicy> {
        self.error_policy.as_ref()
    }

    pub fn logic(&self) -> Option<Arc<dyn Logic>> {
        self.logic.clone()
    }

    pub(crate) fn assign_id(&mut self, id: SmolStr) {
        for slot in self.slots.values_mut() {
            slot.set_owner(id.clone());
        }
        self.id = id;
    }

    pub(crate) fn freeze_config(&mut self) {
        self.config_frozen = true;
    }

    pub(crate) fn thaw_config(&mut self) {
        self.config_frozen = false;
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("error_policy", &self.error_policy)
            .field("has_logic", &self.logic.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "routine_tests.rs"]
mod tests;
