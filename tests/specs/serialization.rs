// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serialize a flow, reload it through factories, run the reloaded copy.

use super::*;
use weft_core::{CoreError, JobStatus, ParamMap, ParamSpec};
use weft_flowdoc::{
    deserialize_flow, serialize_flow, DocumentError, FactoryRegistry, MigrationRegistry,
};

fn factories(captured: Arc<Mutex<Vec<Payload>>>) -> FactoryRegistry {
    let registry = FactoryRegistry::new();
    registry.register("dbl", doubler);
    registry.register("sink", move || weft_core::test_support::sink(Arc::clone(&captured)));
    registry
}

fn build_flow() -> Flow {
    let mut flow = Flow::new("serialized");
    flow.add_routine(doubler(), "src").unwrap();
    let (snk, _) = capture();
    flow.add_routine(snk, "snk").unwrap();
    flow.connect_with(
        "src",
        "out",
        "snk",
        "in",
        Some(ParamMap::new().map("v", ParamSpec::source("v")).map("tag", ParamSpec::literal("s1"))),
    )
    .unwrap();
    flow
}

#[test]
fn round_trip_is_structurally_identical() {
    let flow = build_flow();
    let json = serialize_flow(&flow).unwrap();
    let rebuilt = deserialize_flow(
        &json,
        &factories(Arc::new(Mutex::new(Vec::new()))),
        &MigrationRegistry::with_defaults(),
    )
    .unwrap();
    assert!(flow.structural_eq(&rebuilt));

    // Re-encoding the reloaded flow is byte-stable.
    let again = serialize_flow(&rebuilt).unwrap();
    similar_asserts::assert_eq!(json, again);
}

#[test]
fn reloaded_flow_actually_runs() {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let json = serialize_flow(&build_flow()).unwrap();
    let rebuilt = deserialize_flow(
        &json,
        &factories(Arc::clone(&captured)),
        &MigrationRegistry::with_defaults(),
    )
    .unwrap();

    let runtime = runtime();
    runtime.flows().register(rebuilt).unwrap();
    let (_, job) =
        runtime.post("serialized", "src", "in", payload(json!({"v": 4})), None).unwrap();
    assert!(runtime.wait_until_all_jobs_finished(WAIT));

    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(*captured.lock(), vec![payload(json!({"v": 8, "tag": "s1"}))]);
}

#[test]
fn duplicate_registration_is_rejected_once() {
    let runtime = runtime();
    runtime.flows().register(build_flow()).unwrap();
    let err = runtime.flows().register(build_flow()).unwrap_err();
    assert_eq!(err, CoreError::FlowAlreadyExists("serialized".into()));
}

#[test]
fn unknown_document_version_is_refused() {
    let json = r#"{"version": 7, "flow_id": "x", "routines": {}, "connections": []}"#;
    let err = deserialize_flow(
        json,
        &FactoryRegistry::new(),
        &MigrationRegistry::with_defaults(),
    )
    .unwrap_err();
    assert!(matches!(err, DocumentError::IncompatibleVersion(7)));
}
