// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn retry_delay_grows_with_backoff() {
    let policy = ErrorPolicy::retry(3, Duration::from_millis(100), 2.0);
    assert_eq!(policy.retry_delay(1), Some(Duration::from_millis(100)));
    assert_eq!(policy.retry_delay(2), Some(Duration::from_millis(200)));
    assert_eq!(policy.retry_delay(3), Some(Duration::from_millis(400)));
}

#[test]
fn retry_delay_flat_with_unit_backoff() {
    let policy = ErrorPolicy::retry(2, Duration::from_millis(10), 1.0);
    assert_eq!(policy.retry_delay(1), Some(Duration::from_millis(10)));
    assert_eq!(policy.retry_delay(2), Some(Duration::from_millis(10)));
}

#[test]
fn non_retry_strategies_have_no_delay() {
    assert_eq!(ErrorPolicy::Stop.retry_delay(1), None);
    assert_eq!(ErrorPolicy::Continue.retry_delay(1), None);
    assert_eq!(ErrorPolicy::Skip.retry_delay(1), None);
}

#[test]
fn retries_left_counts_down() {
    let policy = ErrorPolicy::retry(2, Duration::from_millis(1), 1.0);
    assert_eq!(policy.retries_left(0), 2);
    assert_eq!(policy.retries_left(1), 1);
    assert_eq!(policy.retries_left(2), 0);
    assert_eq!(policy.retries_left(5), 0);
    assert_eq!(ErrorPolicy::Continue.retries_left(0), 0);
}

#[yare::parameterized(
    stop = { ErrorPolicy::Stop, json!({"strategy": "stop"}) },
    continue_ = { ErrorPolicy::Continue, json!({"strategy": "continue"}) },
    skip = { ErrorPolicy::Skip, json!({"strategy": "skip"}) },
)]
fn unit_strategies_serde(policy: ErrorPolicy, expected: serde_json::Value) {
    assert_eq!(serde_json::to_value(&policy).unwrap(), expected);
    let back: ErrorPolicy = serde_json::from_value(expected).unwrap();
    assert_eq!(back, policy);
}

#[test]
fn retry_serde_uses_fractional_seconds() {
    let policy = ErrorPolicy::retry(3, Duration::from_millis(250), 1.5);
    let value = serde_json::to_value(&policy).unwrap();
    assert_eq!(
        value,
        json!({"strategy": "retry", "max_attempts": 3, "base_delay": 0.25, "backoff": 1.5})
    );
    let back: ErrorPolicy = serde_json::from_value(value).unwrap();
    assert_eq!(back, policy);
}

#[test]
fn negative_delay_is_rejected() {
    let result: Result<ErrorPolicy, _> = serde_json::from_value(json!({
        "strategy": "retry", "max_attempts": 1, "base_delay": -1.0, "backoff": 1.0
    }));
    assert!(result.is_err());
}

#[test]
fn display_names() {
    assert_eq!(ErrorPolicy::Stop.to_string(), "stop");
    assert_eq!(ErrorPolicy::retry(1, Duration::ZERO, 1.0).to_string(), "retry");
}
