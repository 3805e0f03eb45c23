// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for change-event application.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use till_core::{
    decode_record, ChangeEvent, EntityKind, Error, FeedValue, MemoryReplica, OrderRecord,
    OrderStatus, ReplicaStore,
};

use super::config::SyncConfig;
use super::gateway::RemoteGateway;
use super::gateway_tests::MockGateway;
use super::handler::ChangeEventHandler;
use super::lock::MutationLock;
use super::test_helpers::{id_payload, order_row, order_row_with_items};

struct Fixture {
    gateway: Arc<MockGateway>,
    replica: Arc<MemoryReplica>,
    handler: ChangeEventHandler<OrderRecord>,
    config: SyncConfig,
}

fn make_fixture() -> Fixture {
    let gateway = Arc::new(MockGateway::new());
    let replica = Arc::new(MemoryReplica::new());
    let lock = Arc::new(MutationLock::new());
    let config = SyncConfig::default();
    let handler = ChangeEventHandler::new(
        Arc::clone(&gateway) as Arc<dyn RemoteGateway>,
        Arc::clone(&replica) as _,
        lock,
        config.clone(),
    );
    Fixture {
        gateway,
        replica,
        handler,
        config,
    }
}

fn orders(replica: &Arc<MemoryReplica>) -> Arc<dyn ReplicaStore<OrderRecord>> {
    Arc::clone(replica) as _
}

fn seed_order(replica: &Arc<MemoryReplica>, row: serde_json::Value) {
    let record: OrderRecord = decode_record(row).unwrap();
    orders(replica).insert(record);
}

#[tokio::test(start_paused = true)]
async fn insert_waits_the_grace_period_then_stores_the_complete_record() {
    let fx = make_fixture();
    // The full row, line items included, is only available via fetch.
    fx.gateway
        .put_record(EntityKind::Order, "ord-1", order_row_with_items("ord-1", 12.0));

    let started = tokio::time::Instant::now();
    fx.handler
        .handle(ChangeEvent::insert("orders", id_payload("ord-1")))
        .await
        .unwrap();

    assert!(started.elapsed() >= fx.config.insert_grace);
    let stored = orders(&fx.replica).find_by_id("ord-1").unwrap();
    assert_eq!(stored.line_items.len(), 1);
    assert_eq!(stored.total, 12.0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_insert_event_upserts() {
    let fx = make_fixture();
    fx.gateway
        .put_record(EntityKind::Order, "ord-1", order_row("ord-1", 10.0));
    fx.gateway
        .put_record(EntityKind::Order, "ord-1", order_row("ord-1", 20.0));

    // A reconnect can replay the same insert event.
    fx.handler
        .handle(ChangeEvent::insert("orders", id_payload("ord-1")))
        .await
        .unwrap();
    fx.handler
        .handle(ChangeEvent::insert("orders", id_payload("ord-1")))
        .await
        .unwrap();

    let store = orders(&fx.replica);
    assert_eq!(store.len(), 1);
    assert_eq!(store.find_by_id("ord-1").unwrap().total, 20.0);
}

#[tokio::test(start_paused = true)]
async fn insert_goes_to_the_head_of_the_ordering() {
    let fx = make_fixture();
    seed_order(&fx.replica, order_row("ord-1", 10.0));
    fx.gateway
        .put_record(EntityKind::Order, "ord-2", order_row("ord-2", 20.0));

    fx.handler
        .handle(ChangeEvent::insert("orders", id_payload("ord-2")))
        .await
        .unwrap();

    let rows = orders(&fx.replica).snapshot();
    assert_eq!(rows[0].id, "ord-2");
    assert_eq!(rows[1].id, "ord-1");
}

#[tokio::test]
async fn update_replaces_the_whole_record() {
    let fx = make_fixture();
    seed_order(&fx.replica, order_row("ord-1", 10.0));

    let mut fetched = order_row("ord-1", 25.0);
    fetched["status"] = serde_json::json!("completed");
    fetched["shipping_name"] = serde_json::json!("Bob");
    fx.gateway.put_record(EntityKind::Order, "ord-1", fetched);

    fx.handler
        .handle(ChangeEvent::update("orders", id_payload("ord-1")))
        .await
        .unwrap();

    let store = orders(&fx.replica);
    assert_eq!(store.len(), 1);
    let stored = store.find_by_id("ord-1").unwrap();
    // Full replace: every field comes from the fetched row.
    assert_eq!(stored.total, 25.0);
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.shipping_name.as_deref(), Some("Bob"));
}

#[tokio::test]
async fn update_for_a_record_not_held_locally_is_a_noop() {
    let fx = make_fixture();
    fx.gateway
        .put_record(EntityKind::Order, "ord-9", order_row("ord-9", 5.0));

    fx.handler
        .handle(ChangeEvent::update("orders", id_payload("ord-9")))
        .await
        .unwrap();

    assert!(orders(&fx.replica).is_empty());
}

#[tokio::test]
async fn delete_removes_without_fetching() {
    let fx = make_fixture();
    seed_order(&fx.replica, order_row("ord-1", 10.0));

    fx.handler
        .handle(ChangeEvent::delete("orders", id_payload("ord-1")))
        .await
        .unwrap();

    assert!(orders(&fx.replica).find_by_id("ord-1").is_none());
    // The old row carried the id; no remote round trip happened.
    assert!(fx.gateway.fetch_one_log().is_empty());
}

#[tokio::test]
async fn delete_accepts_a_numeric_id() {
    let fx = make_fixture();
    seed_order(&fx.replica, order_row("42", 10.0));

    let old_record = FeedValue::object([("id", FeedValue::Int(42))]);
    fx.handler
        .handle(ChangeEvent::delete("orders", old_record))
        .await
        .unwrap();

    assert!(orders(&fx.replica).is_empty());
}

#[tokio::test]
async fn events_for_another_table_are_skipped() {
    let fx = make_fixture();

    fx.handler
        .handle(ChangeEvent::insert("customers", id_payload("cus-1")))
        .await
        .unwrap();

    assert!(orders(&fx.replica).is_empty());
    assert!(fx.gateway.fetch_one_log().is_empty());
}

#[tokio::test]
async fn payload_without_a_usable_id_is_rejected() {
    let fx = make_fixture();

    let garbled = fx
        .handler
        .handle(ChangeEvent::update("orders", FeedValue::from("garbage")))
        .await;
    assert!(matches!(garbled, Err(Error::MissingId)));

    let empty = ChangeEvent {
        kind: till_core::ChangeKind::Insert,
        table: "orders".to_string(),
        record: None,
        old_record: None,
    };
    assert!(matches!(fx.handler.handle(empty).await, Err(Error::MissingId)));
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_drops_the_event() {
    let fx = make_fixture();

    let result = fx
        .handler
        .handle(ChangeEvent::insert("orders", id_payload("ord-5")))
        .await;

    assert!(matches!(result, Err(Error::NotFound { .. })));
    assert!(orders(&fx.replica).is_empty());
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_is_bounded_by_the_timeout() {
    let fx = make_fixture();
    fx.gateway.hold_fetches();

    let result = fx
        .handler
        .handle(ChangeEvent::update("orders", id_payload("ord-1")))
        .await;

    assert!(matches!(result, Err(Error::Timeout(_))));
}
