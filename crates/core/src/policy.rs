// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activation policies: when a routine fires and what data it sees.
//!
//! A policy is evaluated against the routine's slots and the worker state
//! and, when it decides to fire, consumes the matching records in the same
//! step. Callers must serialize evaluation per routine (the runtime holds a
//! per-routine latch) so concurrent tasks consume disjoint slices.

use crate::error::CoreError;
use crate::payload::DataSlice;
use crate::slot::Slot;
use crate::worker::WorkerState;
use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// WorkerState routine-state key holding the epoch-ms of the last fire.
/// Written by the scheduler after every fire; read by `TimeInterval`.
pub const LAST_FIRED_KEY: &str = "last_fired_at_ms";

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    pub fired: bool,
    /// Consumed payloads per slot, in slot insertion order. Empty unless fired.
    pub slice: DataSlice,
    /// Free-form note handed to the logic (e.g. which threshold fired).
    pub message: Option<String>,
    /// When held for time reasons: re-check after this delay so throttled
    /// data is not stranded.
    pub recheck_after: Option<Duration>,
}

impl Activation {
    pub fn hold() -> Self {
        Self::default()
    }

    pub fn hold_until(recheck_after: Duration) -> Self {
        Self { recheck_after: Some(recheck_after), ..Self::default() }
    }

    pub fn fire(slice: DataSlice, message: Option<String>) -> Self {
        Self { fired: true, slice, message, recheck_after: None }
    }
}

/// Read-only view handed to policy evaluation.
pub struct PolicyInput<'a> {
    pub routine_id: &'a str,
    pub slots: &'a IndexMap<SmolStr, Slot>,
    pub worker: &'a WorkerState,
    pub now_ms: u64,
}

/// A registered custom policy body.
pub type CustomPolicyFn = Arc<dyn Fn(&PolicyInput<'_>) -> Activation + Send + Sync>;

/// A registered breakpoint predicate. Returning true holds the routine.
pub type BreakpointPredicate = Arc<dyn Fn(&PolicyInput<'_>) -> bool + Send + Sync>;

/// The closed set of activation policies, plus name-registered escape
/// hatches (`Custom`, breakpoint predicates) so flows serialize by name.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationPolicy {
    /// Fire whenever any slot has new data; consume everything new.
    Immediate,
    /// Fire when every slot has at least one new item; consume exactly one
    /// from each, ties broken by slot insertion order.
    AllSlotsReady,
    /// Fire when a slot accumulates at least `n` new items; consume all new
    /// items from the first qualifying slot.
    BatchSize(usize),
    /// Fire at most once per interval, and only when there is new data;
    /// consume everything new.
    TimeInterval(Duration),
    /// Delegate to `base` unless the registered predicate holds the line.
    Breakpoint { base: Box<ActivationPolicy>, predicate: SmolStr },
    /// A user-registered policy, resolved by name.
    Custom { name: SmolStr },
}

impl ActivationPolicy {
    pub fn batch_size(n: usize) -> Self {
        Self::BatchSize(n.max(1))
    }

    pub fn time_interval(interval: Duration) -> Self {
        Self::TimeInterval(interval)
    }

    pub fn breakpoint(base: ActivationPolicy, predicate: impl Into<SmolStr>) -> Self {
        Self::Breakpoint { base: Box::new(base), predicate: predicate.into() }
    }

    pub fn custom(name: impl Into<SmolStr>) -> Self {
        Self::Custom { name: name.into() }
    }

    /// Evaluate against the given slots/worker and consume on fire.
    pub fn evaluate(&self, input: &PolicyInput<'_>) -> Result<Activation, CoreError> {
        match self {
            Self::Immediate => Ok(Self::consume_all_new(input.slots, None)),

            Self::AllSlotsReady => {
                let ready = !input.slots.is_empty()
                    && input.slots.values().all(|s| s.unconsumed_count() > 0);
                if !ready {
                    return Ok(Activation::hold());
                }
                let mut slice = DataSlice::new();
                for (name, slot) in input.slots {
                    if let Some(payload) = slot.consume_one_new() {
                        slice.insert(name.clone(), vec![payload]);
                    }
                }
                Ok(Activation::fire(slice, None))
            }

            Self::BatchSize(n) => {
                let hit = input
                    .slots
                    .iter()
                    .find(|(_, slot)| slot.unconsumed_count() >= *n)
                    .map(|(name, _)| name.clone());
                match hit {
                    None => Ok(Activation::hold()),
                    Some(name) => {
                        let mut slice = DataSlice::new();
                        if let Some(slot) = input.slots.get(&name) {
                            slice.insert(name.clone(), slot.consume_new_all());
                        }
                        Ok(Activation::fire(slice, Some(format!("batch ready on '{name}'"))))
                    }
                }
            }

            Self::TimeInterval(interval) => {
                let has_new = input.slots.values().any(|s| s.unconsumed_count() > 0);
                if !has_new {
                    return Ok(Activation::hold());
                }
                let last = input
                    .worker
                    .routine_state_value(input.routine_id, LAST_FIRED_KEY)
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0);
                let interval_ms = interval.as_millis() as u64;
                let elapsed = input.now_ms.saturating_sub(last);
                if elapsed >= interval_ms {
                    Ok(Self::consume_all_new(input.slots, Some("interval elapsed".to_string())))
                } else {
                    Ok(Activation::hold_until(Duration::from_millis(interval_ms - elapsed)))
                }
            }

            Self::Breakpoint { base, predicate } => {
                let pred = breakpoint_predicate(predicate)
                    .ok_or_else(|| CoreError::UnknownPredicate(predicate.clone()))?;
                if pred(input) {
                    let mut held = Activation::hold();
                    held.message = Some(format!("breakpoint '{predicate}'"));
                    return Ok(held);
                }
                base.evaluate(input)
            }

            Self::Custom { name } => {
                let f = custom_policy(name).ok_or_else(|| CoreError::UnknownPolicy(name.clone()))?;
                Ok(f(input))
            }
        }
    }

    fn consume_all_new(slots: &IndexMap<SmolStr, Slot>, message: Option<String>) -> Activation {
        let mut slice = DataSlice::new();
        for (name, slot) in slots {
            let payloads = slot.consume_new_all();
            if !payloads.is_empty() {
                slice.insert(name.clone(), payloads);
            }
        }
        if slice.is_empty() {
            Activation::hold()
        } else {
            Activation::fire(slice, message)
        }
    }
}

crate::simple_display! {
    ActivationPolicy {
        Immediate => "immediate",
        AllSlotsReady => "all_slots_ready",
        BatchSize(..) => "batch_size",
        TimeInterval(..) => "time_interval",
        Breakpoint { .. } => "breakpoint",
        Custom { .. } => "custom",
    }
}

// --- process-wide name registries ---

fn custom_registry() -> &'static RwLock<HashMap<SmolStr, CustomPolicyFn>> {
    static REGISTRY: OnceLock<RwLock<HashMap<SmolStr, CustomPolicyFn>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn predicate_registry() -> &'static RwLock<HashMap<SmolStr, BreakpointPredicate>> {
    static REGISTRY: OnceLock<RwLock<HashMap<SmolStr, BreakpointPredicate>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register (or replace) a custom policy under a stable name.
pub fn register_custom_policy(name: impl Into<SmolStr>, f: CustomPolicyFn) {
    custom_registry().write().insert(name.into(), f);
}

/// Look up a custom policy by name.
pub fn custom_policy(name: &str) -> Option<CustomPolicyFn> {
    custom_registry().read().get(name).cloned()
}

/// Register (or replace) a breakpoint predicate under a stable name.
pub fn register_breakpoint_predicate(name: impl Into<SmolStr>, f: BreakpointPredicate) {
    predicate_registry().write().insert(name.into(), f);
}

/// Look up a breakpoint predicate by name.
pub fn breakpoint_predicate(name: &str) -> Option<BreakpointPredicate> {
    predicate_registry().read().get(name).cloned()
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
