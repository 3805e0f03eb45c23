// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use super::*;
use yare::parameterized;

#[parameterized(
    decode = { Error::Decode("bad field".into()), "bad field" },
    missing_id = { Error::MissingId, "no usable record id" },
    transport = { Error::Transport("connection reset".into()), "connection reset" },
    cancelled = { Error::Cancelled, "cancelled" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn error_not_found_display() {
    let err = Error::NotFound {
        kind: EntityKind::Order,
        id: "ord-1".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("orders"));
    assert!(msg.contains("ord-1"));
}

#[test]
fn error_timeout_display() {
    let err = Error::Timeout(Duration::from_secs(10));
    assert!(err.to_string().contains("10s"));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
