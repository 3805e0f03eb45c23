// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for the engine tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use serde_json::{json, Value};

use till_core::FeedValue;

/// A complete remote order row.
pub fn order_row(id: &str, total: f64) -> Value {
    json!({
        "id": id,
        "order_number": format!("N-{}", id),
        "status": "open",
        "payment_status": "pending",
        "subtotal": total,
        "tax_total": 0.0,
        "total": total,
        "currency": "USD",
        "created_at": "2026-03-01T10:00:00Z",
        "updated_at": "2026-03-01T10:00:00Z",
        "line_items": []
    })
}

/// An order row carrying line items, as fetched after the grace period.
pub fn order_row_with_items(id: &str, total: f64) -> Value {
    let mut row = order_row(id, total);
    row["line_items"] = json!([
        {"id": format!("{}-li-1", id), "product_name": "espresso", "quantity": 2, "unit_price": total / 2.0}
    ]);
    row
}

pub fn location_row(id: &str) -> Value {
    json!({
        "id": id,
        "tenant_id": "t-1",
        "name": format!("Store {}", id),
        "address_line1": "1 Main St",
        "city": "Springfield",
        "active": true
    })
}

pub fn customer_row(id: &str) -> Value {
    json!({
        "id": id,
        "tenant_id": "t-1",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "loyalty_points": 10,
        "total_spent": 99.5,
        "visit_count": 3
    })
}

/// The thin payload a change event carries: just enough to find the id.
pub fn id_payload(id: &str) -> FeedValue {
    FeedValue::object([("id", FeedValue::from(id))])
}

/// Let background tasks run until `cond` holds, advancing paused time.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
