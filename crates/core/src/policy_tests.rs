// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::payload::{payload_from, Payload};
use serde_json::json;

fn pl(n: u64) -> Payload {
    payload_from(json!({ "n": n }))
}

struct Fixture {
    slots: IndexMap<SmolStr, Slot>,
    worker: WorkerState,
}

impl Fixture {
    fn new(slot_names: &[&str]) -> Self {
        let mut slots = IndexMap::new();
        for name in slot_names {
            slots.insert(SmolStr::new(name), Slot::new(*name));
        }
        Self { slots, worker: WorkerState::new("flow-t") }
    }

    fn push(&self, slot: &str, n: u64) {
        self.slots[slot].enqueue(pl(n), "src", n).unwrap();
    }

    fn input(&self, now_ms: u64) -> PolicyInput<'_> {
        PolicyInput { routine_id: "r", slots: &self.slots, worker: &self.worker, now_ms }
    }
}

#[test]
fn immediate_holds_without_data() {
    let fx = Fixture::new(&["a", "b"]);
    let activation = ActivationPolicy::Immediate.evaluate(&fx.input(0)).unwrap();
    assert!(!activation.fired);
    assert!(activation.slice.is_empty());
}

#[test]
fn immediate_consumes_all_new_from_all_slots() {
    let fx = Fixture::new(&["a", "b"]);
    fx.push("a", 1);
    fx.push("a", 2);
    fx.push("b", 3);
    let activation = ActivationPolicy::Immediate.evaluate(&fx.input(0)).unwrap();
    assert!(activation.fired);
    assert_eq!(activation.slice["a"], vec![pl(1), pl(2)]);
    assert_eq!(activation.slice["b"], vec![pl(3)]);
    assert_eq!(fx.slots["a"].unconsumed_count(), 0);
    assert_eq!(fx.slots["b"].unconsumed_count(), 0);
}

#[test]
fn all_slots_ready_holds_until_every_slot_has_data() {
    let fx = Fixture::new(&["a", "b"]);
    fx.push("a", 1);
    let activation = ActivationPolicy::AllSlotsReady.evaluate(&fx.input(0)).unwrap();
    assert!(!activation.fired);
    // Nothing consumed while holding.
    assert_eq!(fx.slots["a"].unconsumed_count(), 1);
}

#[test]
fn all_slots_ready_consumes_one_from_each_in_order() {
    let fx = Fixture::new(&["a", "b"]);
    fx.push("a", 1);
    fx.push("a", 2);
    fx.push("b", 3);
    let activation = ActivationPolicy::AllSlotsReady.evaluate(&fx.input(0)).unwrap();
    assert!(activation.fired);
    let keys: Vec<_> = activation.slice.keys().cloned().collect();
    assert_eq!(keys, vec![SmolStr::new("a"), SmolStr::new("b")]);
    assert_eq!(activation.slice["a"], vec![pl(1)]);
    assert_eq!(activation.slice["b"], vec![pl(3)]);
    // The second item in "a" stays for the next fire.
    assert_eq!(fx.slots["a"].unconsumed_count(), 1);
}

#[test]
fn all_slots_ready_with_no_slots_never_fires() {
    let fx = Fixture::new(&[]);
    let activation = ActivationPolicy::AllSlotsReady.evaluate(&fx.input(0)).unwrap();
    assert!(!activation.fired);
}

#[test]
fn batch_size_holds_below_threshold() {
    let fx = Fixture::new(&["a"]);
    fx.push("a", 1);
    let activation = ActivationPolicy::batch_size(3).evaluate(&fx.input(0)).unwrap();
    assert!(!activation.fired);
    assert_eq!(fx.slots["a"].unconsumed_count(), 1);
}

#[test]
fn batch_size_fires_on_first_qualifying_slot() {
    let fx = Fixture::new(&["a", "b"]);
    fx.push("a", 1);
    fx.push("b", 2);
    fx.push("b", 3);
    let activation = ActivationPolicy::batch_size(2).evaluate(&fx.input(0)).unwrap();
    assert!(activation.fired);
    assert_eq!(activation.slice.len(), 1);
    assert_eq!(activation.slice["b"], vec![pl(2), pl(3)]);
    // "a" untouched; its own task will drive it later.
    assert_eq!(fx.slots["a"].unconsumed_count(), 1);
}

#[test]
fn time_interval_fires_when_elapsed() {
    let fx = Fixture::new(&["a"]);
    fx.push("a", 1);
    fx.worker.set_routine_state_key("r", LAST_FIRED_KEY, json!(1_000));
    let policy = ActivationPolicy::time_interval(Duration::from_secs(5));

    let activation = policy.evaluate(&fx.input(6_000)).unwrap();
    assert!(activation.fired);
    assert_eq!(activation.message.as_deref(), Some("interval elapsed"));
}

#[test]
fn time_interval_throttles_and_requests_recheck() {
    let fx = Fixture::new(&["a"]);
    fx.push("a", 1);
    fx.worker.set_routine_state_key("r", LAST_FIRED_KEY, json!(1_000));
    let policy = ActivationPolicy::time_interval(Duration::from_secs(5));

    let activation = policy.evaluate(&fx.input(3_000)).unwrap();
    assert!(!activation.fired);
    assert_eq!(activation.recheck_after, Some(Duration::from_millis(3_000)));
    assert_eq!(fx.slots["a"].unconsumed_count(), 1);
}

#[test]
fn time_interval_holds_without_data() {
    let fx = Fixture::new(&["a"]);
    let policy = ActivationPolicy::time_interval(Duration::from_secs(5));
    let activation = policy.evaluate(&fx.input(10_000)).unwrap();
    assert!(!activation.fired);
    assert_eq!(activation.recheck_after, None);
}

#[test]
fn time_interval_first_fire_needs_no_history() {
    let fx = Fixture::new(&["a"]);
    fx.push("a", 1);
    let policy = ActivationPolicy::time_interval(Duration::from_secs(5));
    let activation = policy.evaluate(&fx.input(10_000)).unwrap();
    assert!(activation.fired);
}

#[test]
fn breakpoint_holds_while_predicate_is_true() {
    register_breakpoint_predicate("always", Arc::new(|_input: &PolicyInput<'_>| true));
    let fx = Fixture::new(&["a"]);
    fx.push("a", 1);
    let policy = ActivationPolicy::breakpoint(ActivationPolicy::Immediate, "always");

    let activation = policy.evaluate(&fx.input(0)).unwrap();
    assert!(!activation.fired);
    assert_eq!(fx.slots["a"].unconsumed_count(), 1);
}

#[test]
fn breakpoint_delegates_when_predicate_is_false() {
    register_breakpoint_predicate("never", Arc::new(|_input: &PolicyInput<'_>| false));
    let fx = Fixture::new(&["a"]);
    fx.push("a", 1);
    let policy = ActivationPolicy::breakpoint(ActivationPolicy::Immediate, "never");

    let activation = policy.evaluate(&fx.input(0)).unwrap();
    assert!(activation.fired);
}

#[test]
fn unregistered_breakpoint_predicate_errors() {
    let fx = Fixture::new(&["a"]);
    let policy = ActivationPolicy::breakpoint(ActivationPolicy::Immediate, "missing-pred");
    let err = policy.evaluate(&fx.input(0)).unwrap_err();
    assert_eq!(err, CoreError::UnknownPredicate("missing-pred".into()));
}

#[test]
fn custom_policy_resolved_by_name() {
    register_custom_policy(
        "drain-a",
        Arc::new(|input: &PolicyInput<'_>| {
            let mut slice = DataSlice::new();
            if let Some(slot) = input.slots.get("a") {
                let items = slot.consume_new_all();
                if !items.is_empty() {
                    slice.insert("a".into(), items);
                    return Activation::fire(slice, Some("custom".into()));
                }
            }
            Activation::hold()
        }),
    );
    let fx = Fixture::new(&["a"]);
    fx.push("a", 1);
    let policy = ActivationPolicy::custom("drain-a");
    let activation = policy.evaluate(&fx.input(0)).unwrap();
    assert!(activation.fired);
    assert_eq!(activation.message.as_deref(), Some("custom"));
}

#[test]
fn unregistered_custom_policy_errors() {
    let fx = Fixture::new(&["a"]);
    let err = ActivationPolicy::custom("missing-pol").evaluate(&fx.input(0)).unwrap_err();
    assert_eq!(err, CoreError::UnknownPolicy("missing-pol".into()));
}

#[test]
fn batch_size_zero_is_clamped_to_one() {
    assert_eq!(ActivationPolicy::batch_size(0), ActivationPolicy::BatchSize(1));
}

#[test]
fn policy_display_names() {
    assert_eq!(ActivationPolicy::Immediate.to_string(), "immediate");
    assert_eq!(ActivationPolicy::AllSlotsReady.to_string(), "all_slots_ready");
    assert_eq!(ActivationPolicy::batch_size(2).to_string(), "batch_size");
}
