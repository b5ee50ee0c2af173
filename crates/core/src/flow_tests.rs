// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::connection::ParamSpec;
use crate::policy::ActivationPolicy;

fn routine_with(slots: &[&str], events: &[&str]) -> Routine {
    let mut routine = Routine::new("test");
    for slot in slots {
        routine.add_slot(*slot).unwrap();
    }
    for event in events {
        routine.add_event(*event, Vec::<&str>::new()).unwrap();
    }
    routine.set_activation_policy(ActivationPolicy::Immediate);
    routine
}

fn two_routine_flow() -> Flow {
    let mut flow = Flow::new("f");
    flow.add_routine(routine_with(&["in"], &["out"]), "src").unwrap();
    flow.add_routine(routine_with(&["in"], &["out"]), "dst").unwrap();
    flow
}

#[test]
fn add_and_get_routine() {
    let flow = two_routine_flow();
    assert!(flow.get_routine("src").is_some());
    assert!(flow.get_routine("nope").is_none());
    assert_eq!(flow.get_routine("src").unwrap().id(), "src");
}

#[test]
fn duplicate_routine_id_rejected() {
    let mut flow = two_routine_flow();
    let err = flow.add_routine(routine_with(&[], &[]), "src").unwrap_err();
    assert_eq!(err, CoreError::DuplicateName { kind: "routine", name: "src".into() });
}

#[test]
fn connect_validates_endpoints() {
    let mut flow = two_routine_flow();
    flow.connect("src", "out", "dst", "in").unwrap();

    let err = flow.connect("missing", "out", "dst", "in").unwrap_err();
    assert_eq!(err, CoreError::RoutineNotFound("missing".into()));

    let err = flow.connect("src", "nope", "dst", "in").unwrap_err();
    assert!(matches!(err, CoreError::InvalidConnection(_)));

    let err = flow.connect("src", "out", "dst", "nope").unwrap_err();
    assert!(matches!(err, CoreError::InvalidConnection(_)));
}

#[test]
fn duplicate_connection_rejected_but_remap_variant_allowed() {
    let mut flow = two_routine_flow();
    flow.connect("src", "out", "dst", "in").unwrap();
    let err = flow.connect("src", "out", "dst", "in").unwrap_err();
    assert!(matches!(err, CoreError::InvalidConnection(_)));

    // Same endpoints with a different param map is a distinct connection.
    flow.connect_with(
        "src",
        "out",
        "dst",
        "in",
        Some(ParamMap::new().map("x", ParamSpec::source("y"))),
    )
    .unwrap();
    assert_eq!(flow.connections().len(), 2);
}

#[test]
fn fan_out_and_fan_in_are_supported() {
    let mut flow = Flow::new("f");
    flow.add_routine(routine_with(&[], &["out"]), "src").unwrap();
    flow.add_routine(routine_with(&["in"], &[]), "a").unwrap();
    flow.add_routine(routine_with(&["in"], &["out"]), "b").unwrap();
    flow.connect("src", "out", "a", "in").unwrap();
    flow.connect("src", "out", "b", "in").unwrap();
    flow.connect("b", "out", "a", "in").unwrap();

    let from_src: Vec<_> = flow.connections_from("src", "out").collect();
    assert_eq!(from_src.len(), 2);
    assert_eq!(from_src[0].target_routine, "a");
    assert_eq!(from_src[1].target_routine, "b");
}

#[test]
fn remove_routine_drops_its_connections() {
    let mut flow = two_routine_flow();
    flow.connect("src", "out", "dst", "in").unwrap();
    flow.remove_routine("dst").unwrap();
    assert!(flow.connections().is_empty());
    assert_eq!(
        flow.remove_routine("dst").unwrap_err(),
        CoreError::RoutineNotFound("dst".into())
    );
}

#[test]
fn disconnect_by_index_and_match() {
    let mut flow = two_routine_flow();
    flow.connect("src", "out", "dst", "in").unwrap();
    assert!(flow.disconnect_match("src", "out", "dst", "in").unwrap());
    assert!(!flow.disconnect_match("src", "out", "dst", "in").unwrap());

    flow.connect("src", "out", "dst", "in").unwrap();
    let removed = flow.disconnect(0).unwrap();
    assert_eq!(removed.target_routine, "dst");
    assert!(flow.disconnect(0).is_err());
}

#[test]
fn validate_requires_activation_policy() {
    let mut flow = Flow::new("f");
    let mut routine = Routine::new("test");
    routine.add_slot("in").unwrap();
    flow.add_routine(routine, "lazy").unwrap();

    assert_eq!(flow.validate().unwrap_err(), CoreError::NoActivationPolicy("lazy".into()));
    assert_eq!(flow.validate_report().len(), 1);
}

#[test]
fn validate_ok_on_wellformed_flow() {
    let mut flow = two_routine_flow();
    flow.connect("src", "out", "dst", "in").unwrap();
    assert!(flow.validate().is_ok());
    assert!(flow.validate_report().is_empty());
}

#[test]
fn sealed_flow_rejects_mutation() {
    let mut flow = two_routine_flow();
    flow.seal();
    assert!(flow.is_sealed());

    let err = flow.add_routine(routine_with(&[], &[]), "late").unwrap_err();
    assert_eq!(err, CoreError::FlowRunning("f".into()));
    assert!(flow.remove_routine("src").is_err());
    assert!(flow.connect("src", "out", "dst", "in").is_err());

    // Configs freeze with the flow.
    let err =
        flow.get_routine_mut("src").unwrap().set_config("k", serde_json::json!(1)).unwrap_err();
    assert!(matches!(err, CoreError::ConfigFrozen(_)));

    flow.unseal();
    assert!(flow.connect("src", "out", "dst", "in").is_ok());
    assert!(flow.get_routine_mut("src").unwrap().set_config("k", serde_json::json!(1)).is_ok());
}

#[test]
fn structural_eq_matches_identical_builds() {
    let build = || {
        let mut flow = two_routine_flow();
        flow.connect("src", "out", "dst", "in").unwrap();
        flow.set_error_policy(Some(crate::handler::ErrorPolicy::Continue));
        flow
    };
    assert!(build().structural_eq(&build()));

    let mut other = build();
    other.get_routine_mut("src").unwrap().set_config("k", serde_json::json!(1)).unwrap();
    assert!(!build().structural_eq(&other));

    let mut other = two_routine_flow();
    other.connect("src", "out", "dst", "in").unwrap();
    assert!(!build().structural_eq(&other));
}
