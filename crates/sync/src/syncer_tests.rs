// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for per-entity snapshot reconciliation.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tokio::task::yield_now;
use tokio_util::sync::CancellationToken;

use till_core::{
    EntityKind, Error, MemoryReplica, OrderRecord, OrderStatus, ReplicaStore, TenantId,
};

use super::config::SyncConfig;
use super::gateway::RemoteGateway;
use super::gateway_tests::MockGateway;
use super::lock::MutationLock;
use super::syncer::EntitySyncer;
use super::test_helpers::{order_row, order_row_with_items};

struct Fixture {
    gateway: Arc<MockGateway>,
    replica: Arc<MemoryReplica>,
    syncer: Arc<EntitySyncer<OrderRecord>>,
}

fn make_fixture() -> Fixture {
    let gateway = Arc::new(MockGateway::new());
    let replica = Arc::new(MemoryReplica::new());
    let lock = Arc::new(MutationLock::new());
    let syncer = Arc::new(EntitySyncer::new(
        Arc::clone(&gateway) as Arc<dyn RemoteGateway>,
        Arc::clone(&replica) as _,
        Arc::clone(&replica) as _,
        lock,
        SyncConfig::default(),
    ));
    Fixture {
        gateway,
        replica,
        syncer,
    }
}

fn orders(replica: &Arc<MemoryReplica>) -> Arc<dyn ReplicaStore<OrderRecord>> {
    Arc::clone(replica) as _
}

#[tokio::test]
async fn fresh_sweep_mirrors_the_snapshot() {
    let fx = make_fixture();
    fx.gateway.put_rows(
        EntityKind::Order,
        vec![
            order_row("ord-1", 10.0),
            order_row("ord-2", 20.0),
            order_row_with_items("ord-3", 30.0),
        ],
    );

    let applied = fx
        .syncer
        .sync(&TenantId::from("t-1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(applied, 3);

    let store = orders(&fx.replica);
    assert_eq!(store.len(), 3);
    let ord3 = store.find_by_id("ord-3").unwrap();
    assert_eq!(ord3.total, 30.0);
    assert_eq!(ord3.status, OrderStatus::Open);
    assert_eq!(ord3.line_items.len(), 1);
}

#[tokio::test]
async fn second_pass_upserts_in_place() {
    let fx = make_fixture();
    let tenant = TenantId::from("t-1");

    fx.gateway
        .put_rows(EntityKind::Order, vec![order_row("ord-1", 10.0)]);
    fx.syncer.sync(&tenant, &CancellationToken::new()).await.unwrap();

    fx.gateway
        .put_rows(EntityKind::Order, vec![order_row("ord-1", 42.0)]);
    fx.syncer.sync(&tenant, &CancellationToken::new()).await.unwrap();

    let store = orders(&fx.replica);
    assert_eq!(store.len(), 1);
    assert_eq!(store.find_by_id("ord-1").unwrap().total, 42.0);
}

#[tokio::test]
async fn second_sweep_never_prunes() {
    let fx = make_fixture();
    let tenant = TenantId::from("t-1");

    fx.gateway.put_rows(
        EntityKind::Order,
        vec![order_row("ord-1", 10.0), order_row("ord-2", 20.0)],
    );
    fx.syncer.sync(&tenant, &CancellationToken::new()).await.unwrap();

    // The snapshot window narrows; absence does not mean deletion.
    fx.gateway
        .put_rows(EntityKind::Order, vec![order_row("ord-1", 11.0)]);
    fx.syncer.sync(&tenant, &CancellationToken::new()).await.unwrap();

    let store = orders(&fx.replica);
    assert_eq!(store.len(), 2);
    assert!(store.find_by_id("ord-2").is_some());
}

#[tokio::test]
async fn undecodable_rows_are_skipped() {
    let fx = make_fixture();
    fx.gateway.put_rows(
        EntityKind::Order,
        vec![order_row("ord-1", 10.0), serde_json::json!({"id": "ord-2"})],
    );

    let applied = fx
        .syncer
        .sync(&TenantId::from("t-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(applied, 1);
    assert_eq!(orders(&fx.replica).len(), 1);
}

#[tokio::test]
async fn pass_commits_exactly_once() {
    let fx = make_fixture();
    fx.gateway.put_rows(
        EntityKind::Order,
        vec![order_row("ord-1", 10.0), order_row("ord-2", 20.0)],
    );

    fx.syncer
        .sync(&TenantId::from("t-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fx.replica.commit_count(), 1);
}

#[tokio::test]
async fn fetch_failure_leaves_replica_untouched() {
    let fx = make_fixture();
    fx.gateway.fail_fetch_all(EntityKind::Order);

    let err = fx
        .syncer
        .sync(&TenantId::from("t-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert!(orders(&fx.replica).is_empty());
    assert_eq!(fx.replica.commit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn fetch_timeout_aborts_pass() {
    let fx = make_fixture();
    // A fetch that never returns must not wedge the pass.
    fx.gateway.hold_fetches();

    let err = fx
        .syncer
        .sync(&TenantId::from("t-1"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(_)));
    assert!(orders(&fx.replica).is_empty());
}

#[tokio::test]
async fn cancellation_is_observed_mid_fetch() {
    let fx = make_fixture();
    fx.gateway
        .put_rows(EntityKind::Order, vec![order_row("ord-1", 10.0)]);
    fx.gateway.hold_fetches();

    let token = CancellationToken::new();
    let sweep = {
        let syncer = Arc::clone(&fx.syncer);
        let token = token.clone();
        tokio::spawn(async move { syncer.sync(&TenantId::from("t-1"), &token).await })
    };
    while fx.gateway.held() < 1 {
        yield_now().await;
    }

    token.cancel();
    let result = sweep.await.unwrap();

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(orders(&fx.replica).is_empty());
    assert_eq!(fx.replica.commit_count(), 0);
}

#[tokio::test]
async fn already_cancelled_pass_is_a_noop() {
    let fx = make_fixture();
    fx.gateway
        .put_rows(EntityKind::Order, vec![order_row("ord-1", 10.0)]);

    let token = CancellationToken::new();
    token.cancel();

    let result = fx.syncer.sync(&TenantId::from("t-1"), &token).await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(orders(&fx.replica).is_empty());
}
