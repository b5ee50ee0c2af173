// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::payload::payload_from;
use serde_json::json;

#[test]
fn no_param_map_passes_payload_verbatim() {
    let conn = Connection::new("src", "out", "dst", "in");
    let source = payload_from(json!({"v": 7, "extra": true}));
    assert_eq!(conn.project(&source).unwrap(), source);
}

#[test]
fn param_map_remaps_and_drops_unlisted_keys() {
    let conn = Connection::new("src", "out", "dst", "in").with_param_map(
        ParamMap::new()
            .map("value", ParamSpec::source("v"))
            .map("tag", ParamSpec::literal("X")),
    );
    let source = payload_from(json!({"v": 7, "dropped": 1}));
    let target = conn.project(&source).unwrap();
    assert_eq!(target, payload_from(json!({"value": 7, "tag": "X"})));
}

#[test]
fn param_map_missing_source_key_fails() {
    let map = ParamMap::new().map("value", ParamSpec::source("absent"));
    let err = map.apply(&payload_from(json!({"v": 7}))).unwrap_err();
    assert_eq!(err, CoreError::ParamMapMissingSource { key: "absent".into() });
}

#[test]
fn literal_may_be_any_json_value() {
    let map = ParamMap::new().map("cfg", ParamSpec::literal(json!({"nested": [1, 2]})));
    let target = map.apply(&Payload::new()).unwrap();
    assert_eq!(target.get("cfg"), Some(&json!({"nested": [1, 2]})));
}

#[test]
fn param_spec_wire_form() {
    // Source refs serialize as bare strings, literals as tagged objects.
    let source = ParamSpec::source("v");
    assert_eq!(serde_json::to_value(&source).unwrap(), json!("v"));
    let literal = ParamSpec::literal(42);
    assert_eq!(serde_json::to_value(&literal).unwrap(), json!({"$literal": 42}));

    let round: ParamSpec = serde_json::from_value(json!("v")).unwrap();
    assert_eq!(round, source);
    let round: ParamSpec = serde_json::from_value(json!({"$literal": 42})).unwrap();
    assert_eq!(round, literal);
}

#[test]
fn connection_equality_includes_param_map() {
    let plain = Connection::new("a", "out", "b", "in");
    let mapped = Connection::new("a", "out", "b", "in")
        .with_param_map(ParamMap::new().map("x", ParamSpec::source("y")));
    assert_ne!(plain, mapped);
    assert_eq!(plain, Connection::new("a", "out", "b", "in"));
}

#[test]
fn connection_serde_round_trip() {
    let conn = Connection::new("a", "out", "b", "in")
        .with_param_map(ParamMap::new().map("x", ParamSpec::literal(1)));
    let json = serde_json::to_value(&conn).unwrap();
    let back: Connection = serde_json::from_value(json).unwrap();
    assert_eq!(back, conn);
}
