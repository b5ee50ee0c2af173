// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A labeled graph of routines and connections.
//!
//! Flows are built by value, validated, then registered. While a worker on
//! the flow is running the flow is sealed: structure and configs are
//! read-only until the worker stops.

use crate::connection::{Connection, ParamMap};
use crate::error::CoreError;
use crate::handler::ErrorPolicy;
use crate::routine::Routine;
use indexmap::IndexMap;
use smol_str::SmolStr;

/// A directed graph of routines wired event → slot.
#[derive(Debug)]
pub struct Flow {
    flow_id: String,
    routines: IndexMap<SmolStr, Routine>,
    connections: Vec<Connection>,
    /// Flow-level fallback error strategy (routine-level wins).
    error_policy: Option<ErrorPolicy>,
    sealed: bool,
}

impl Flow {
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            routines: IndexMap::new(),
            connections: Vec::new(),
            error_policy: None,
            sealed: false,
        }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn reject_if_sealed(&self) -> Result<(), CoreError> {
        if self.sealed {
            return Err(CoreError::FlowRunning(self.flow_id.clone()));
        }
        Ok(())
    }

    /// Add a routine under the given id.
    pub fn add_routine(
        &mut self,
        mut routine: Routine,
        routine_id: impl Into<SmolStr>,
    ) -> Result<(), CoreError> {
        self.reject_if_sealed()?;
        let id = routine_id.into();
        if self.routines.contains_key(&id) {
            return Err(CoreError::DuplicateName { kind: "routine", name: id });
        }
        routine.assign_id(id.clone());
        self.routines.insert(id, routine);
        Ok(())
    }

    /// Remove a routine and every connection touching it.
    pub fn remove_routine(&mut self, routine_id: &str) -> Result<Routine, CoreError> {
        self.reject_if_sealed()?;
        let routine = self
            .routines
            .shift_remove(routine_id)
            .ok_or_else(|| CoreError::RoutineNotFound(routine_id.to_string()))?;
        self.connections
            .retain(|c| c.source_routine != routine_id && c.target_routine != routine_id);
        Ok(routine)
    }

    /// Wire `source.event` to `target.slot` with no remap.
    pub fn connect(
        &mut self,
        source: &str,
        event: &str,
        target: &str,
        slot: &str,
    ) -> Result<(), CoreError> {
        self.connect_with(source, event, target, slot, None)
    }

    /// Wire `source.event` to `target.slot`, optionally remapping the payload.
    pub fn connect_with(
        &mut self,
        source: &str,
        event: &str,
        target: &str,
        slot: &str,
        param_map: Option<ParamMap>,
    ) -> Result<(), CoreError> {
        self.reject_if_sealed()?;
        let source_routine = self
            .routines
            .get(source)
            .ok_or_else(|| CoreError::RoutineNotFound(source.to_string()))?;
        if !source_routine.has_event(event) {
            return Err(CoreError::InvalidConnection(format!(
                "routine '{source}' has no event '{event}'"
            )));
        }
        let target_routine = self
            .routines
            .get(target)
            .ok_or_else(|| CoreError::RoutineNotFound(target.to_string()))?;
        if target_routine.slot(slot).is_none() {
            return Err(CoreError::InvalidConnection(format!(
                "routine '{target}' has no slot '{slot}'"
            )));
        }

        let mut connection = Connection::new(source, event, target, slot);
        connection.param_map = param_map;
        if self.connections.contains(&connection) {
            return Err(CoreError::InvalidConnection(format!(
                "duplicate connection {source}.{event} -> {target}.{slot}"
            )));
        }
        self.connections.push(connection);
        Ok(())
    }

    /// Remove the connection at `index`.
    pub fn disconnect(&mut self, index: usize) -> Result<Connection, CoreError> {
        self.reject_if_sealed()?;
        if index >= self.connections.len() {
            return Err(CoreError::InvalidConnection(format!("no connection at index {index}")));
        }
        Ok(self.connections.remove(index))
    }

    /// Remove the first connection matching the four endpoints.
    /// Returns false when nothing matched.
    pub fn disconnect_match(
        &mut self,
        source: &str,
        event: &str,
        target: &str,
        slot: &str,
    ) -> Result<bool, CoreError> {
        self.reject_if_sealed()?;
        let found = self.connections.iter().position(|c| {
            c.source_routine == source
                && c.source_event == event
                && c.target_routine == target
                && c.target_slot == slot
        });
        match found {
            Some(index) => {
                self.connections.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get_routine(&self, routine_id: &str) -> Option<&Routine> {
        self.routines.get(routine_id)
    }

    /// Mutable access for config edits on an idle flow.
    pub fn get_routine_mut(&mut self, routine_id: &str) -> Option<&mut Routine> {
        self.routines.get_mut(routine_id)
    }

    pub fn routines(&self) -> &IndexMap<SmolStr, Routine> {
        &self.routines
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections leaving `(routine_id, event)`, in registration order.
    pub fn connections_from<'a>(
        &'a self,
        routine_id: &'a str,
        event: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.source_routine == routine_id && c.source_event == event)
    }

    pub fn set_error_policy(&mut self, policy: Option<ErrorPolicy>) {
        self.error_policy = policy;
    }

    pub fn error_policy(&self) -> Option<&ErrorPolicy> {
        self.error_policy.as_ref()
    }

    /// Check the whole graph; the first problem decides the error.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self.validate_report().into_iter().next() {
            None => Ok(()),
            Some(problem) => Err(problem),
        }
    }

    /// Every problem a careful host would want to render, not just the first.
    pub fn validate_report(&self) -> Vec<CoreError> {
        let mut problems = Vec::new();
        for (id, routine) in &self.routines {
            if routine.activation_policy().is_none() {
                problems.push(CoreError::NoActivationPolicy(id.to_string()));
            }
        }
        let mut seen = Vec::with_capacity(self.connections.len());
        for connection in &self.connections {
            match self.routines.get(&connection.source_routine) {
                None => problems
                    .push(CoreError::RoutineNotFound(connection.source_routine.to_string())),
                Some(routine) if !routine.has_event(&connection.source_event) => {
                    problems.push(CoreError::InvalidConnection(format!(
                        "routine '{}' has no event '{}'",
                        connection.source_routine, connection.source_event
                    )));
                }
                Some(_) => {}
            }
            match self.routines.get(&connection.target_routine) {
                None => problems
                    .push(CoreError::RoutineNotFound(connection.target_routine.to_string())),
                Some(routine) if routine.slot(&connection.target_slot).is_none() => {
                    problems.push(CoreError::InvalidConnection(format!(
                        "routine '{}' has no slot '{}'",
                        connection.target_routine, connection.target_slot
                    )));
                }
                Some(_) => {}
            }
            if seen.contains(&connection) {
                problems.push(CoreError::InvalidConnection(format!(
                    "duplicate connection {}.{} -> {}.{}",
                    connection.source_routine,
                    connection.source_event,
                    connection.target_routine,
                    connection.target_slot
                )));
            }
            seen.push(connection);
        }
        problems
    }

    /// Freeze the flow for execution: structure and configs become
    /// read-only until [`Flow::unseal`].
    pub fn seal(&mut self) {
        self.sealed = true;
        for routine in self.routines.values_mut() {
            routine.freeze_config();
        }
    }

    pub fn unseal(&mut self) {
        self.sealed = false;
        for routine in self.routines.values_mut() {
            routine.thaw_config();
        }
    }

    /// Structural identity: ids, routine kinds/configs/policies, slot and
    /// event declarations, connection order. Logic bodies are compared by
    /// registered kind only (a deserialized flow carries rebuilt closures).
    pub fn structural_eq(&self, other: &Flow) -> bool {
        if self.flow_id != other.flow_id
            || self.connections != other.connections
            || self.error_policy != other.error_policy
            || self.routines.len() != other.routines.len()
        {
            return false;
        }
        self.routines.iter().zip(other.routines.iter()).all(|((id_a, a), (id_b, b))| {
            id_a == id_b
                && a.kind() == b.kind()
                && a.config() == b.config()
                && a.activation_policy() == b.activation_policy()
                && a.error_policy() == b.error_policy()
                && a.events() == b.events()
                && a.slots().len() == b.slots().len()
                && a.slots().iter().zip(b.slots().iter()).all(|((name_a, sa), (name_b, sb))| {
                    name_a == name_b
                        && sa.max_queue_length() == sb.max_queue_length()
                        && sa.watermark() == sb.watermark()
                })
        })
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
