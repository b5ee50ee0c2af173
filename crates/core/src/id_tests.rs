// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::JobId;
use crate::worker::WorkerId;

#[test]
fn minted_ids_carry_their_kind_prefix() {
    let job = JobId::new();
    assert!(job.as_str().starts_with("job-"));
    assert_eq!(job.as_str().len(), ID_LEN);

    let worker = WorkerId::new();
    assert!(worker.as_str().starts_with("wkr-"));
    assert_eq!(worker.as_str().len(), ID_LEN);
}

#[test]
fn minted_ids_do_not_collide() {
    assert_ne!(JobId::new(), JobId::new());
}

#[test]
fn from_string_keeps_host_supplied_ids() {
    let id = WorkerId::from_string("wkr-host-7");
    assert_eq!(id.as_str(), "wkr-host-7");
    assert_eq!(WorkerId::from("wkr-host-7"), id);
    assert_eq!(WorkerId::from("wkr-host-7".to_string()), id);
}

#[test]
fn id_compares_against_plain_strings() {
    let id = JobId::from_string("job-abc");
    assert!(id == *"job-abc");
    assert!(id == "job-abc");
    assert_eq!(id.to_string(), "job-abc");
}

#[test]
fn id_keyed_maps_accept_str_lookups() {
    use std::collections::HashMap;
    let mut jobs: HashMap<JobId, u32> = HashMap::new();
    jobs.insert(JobId::from_string("job-xyz"), 7);
    // Borrow<str> + matching Hash let callers skip building a JobId.
    assert_eq!(jobs.get("job-xyz"), Some(&7));
    assert_eq!(jobs.get("job-other"), None);
}

#[test]
fn serde_form_is_a_bare_string() {
    let id = JobId::from_string("job-serde");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"job-serde\"");
    let back: JobId = serde_json::from_str("\"job-serde\"").unwrap();
    assert_eq!(back, id);
}

#[test]
fn serde_rejects_oversized_ids() {
    let long = format!("\"{}\"", "x".repeat(ID_LEN + 1));
    assert!(serde_json::from_str::<JobId>(&long).is_err());
}
