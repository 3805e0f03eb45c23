// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine facade.
//!
//! Wires one replica, one lock, three entity syncers and three live-feed
//! subscribers behind a single handle the embedding app can own.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use till_core::{
    CustomerRecord, EntityKind, LocationRecord, MemoryReplica, OrderRecord, Record, ReplicaIndex,
    ReplicaStore, Result, TenantId,
};

use crate::config::SyncConfig;
use crate::feed::FeedTransport;
use crate::gateway::RemoteGateway;
use crate::handler::ChangeEventHandler;
use crate::lock::MutationLock;
use crate::orchestrator::SyncOrchestrator;
use crate::subscriber::{FeedStatus, LiveFeedSubscriber};
use crate::syncer::EntitySyncer;

/// One replica, one lock, both sync channels.
///
/// The embedding app calls `sync_all` on a schedule or on demand,
/// `start_feeds` once a tenant is known, and reads the replica directly.
/// Sync failures never escape this surface: the UI observes only replica
/// contents and the last-synced timestamp.
pub struct SyncService {
    replica: Arc<MemoryReplica>,
    lock: Arc<MutationLock>,
    orchestrator: SyncOrchestrator,
    locations: LiveFeedSubscriber<LocationRecord>,
    orders: LiveFeedSubscriber<OrderRecord>,
    customers: LiveFeedSubscriber<CustomerRecord>,
}

impl SyncService {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        transport: Arc<dyn FeedTransport>,
        config: SyncConfig,
    ) -> Self {
        let replica = Arc::new(MemoryReplica::new());
        let lock = Arc::new(MutationLock::new());

        let orchestrator = SyncOrchestrator::new(
            make_syncer::<LocationRecord>(&gateway, &replica, &lock, &config),
            make_syncer::<OrderRecord>(&gateway, &replica, &lock, &config),
            make_syncer::<CustomerRecord>(&gateway, &replica, &lock, &config),
        );

        let locations =
            make_subscriber::<LocationRecord>(&gateway, &transport, &replica, &lock, &config);
        let orders = make_subscriber::<OrderRecord>(&gateway, &transport, &replica, &lock, &config);
        let customers =
            make_subscriber::<CustomerRecord>(&gateway, &transport, &replica, &lock, &config);

        SyncService {
            replica,
            lock,
            orchestrator,
            locations,
            orders,
            customers,
        }
    }

    /// Full reconciliation sweep; supersedes one already in flight.
    pub async fn sync_all(&self, tenant: &TenantId) {
        self.orchestrator.sync_all(tenant).await;
    }

    /// Refresh one entity type on demand.
    pub async fn resync(&self, kind: EntityKind, tenant: &TenantId) -> Result<usize> {
        self.orchestrator.resync(kind, tenant).await
    }

    /// Subscribe all three live feeds.
    ///
    /// A failed subscribe is logged and absorbed; that feed stays
    /// unsubscribed until the next attempt, and the replica self-heals on
    /// the next sweep.
    pub async fn start_feeds(&self, tenant: &TenantId) {
        if let Err(e) = self.locations.subscribe(tenant).await {
            warn!("locations feed subscribe failed: {}", e);
        }
        if let Err(e) = self.orders.subscribe(tenant).await {
            warn!("orders feed subscribe failed: {}", e);
        }
        if let Err(e) = self.customers.subscribe(tenant).await {
            warn!("customers feed subscribe failed: {}", e);
        }
    }

    /// Cancel all live feeds; teardown completes in the background.
    pub async fn stop_feeds(&self) {
        self.locations.cleanup().await;
        self.orders.cleanup().await;
        self.customers.cleanup().await;
    }

    /// The replica backing the UI read path.
    pub fn replica(&self) -> &Arc<MemoryReplica> {
        &self.replica
    }

    /// The shared writer lock, for callers composing their own writers.
    pub fn lock(&self) -> &Arc<MutationLock> {
        &self.lock
    }

    /// Whether a sweep is currently in flight.
    pub fn is_syncing(&self) -> bool {
        self.orchestrator.is_syncing()
    }

    /// Completion time of the most recently finished sweep.
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.orchestrator.last_synced_at()
    }

    /// Lifecycle state of one entity's live feed.
    pub fn feed_status(&self, kind: EntityKind) -> FeedStatus {
        match kind {
            EntityKind::Location => self.locations.status(),
            EntityKind::Order => self.orders.status(),
            EntityKind::Customer => self.customers.status(),
        }
    }

    /// Await outstanding background feed tasks (shutdown and tests).
    pub async fn drain_feed_tasks(&self) {
        self.locations.drain_cleanup().await;
        self.orders.drain_cleanup().await;
        self.customers.drain_cleanup().await;
    }
}

fn make_syncer<R>(
    gateway: &Arc<dyn RemoteGateway>,
    replica: &Arc<MemoryReplica>,
    lock: &Arc<MutationLock>,
    config: &SyncConfig,
) -> EntitySyncer<R>
where
    R: Record,
    MemoryReplica: ReplicaStore<R>,
{
    EntitySyncer::new(
        Arc::clone(gateway),
        Arc::clone(replica) as Arc<dyn ReplicaStore<R>>,
        Arc::clone(replica) as Arc<dyn ReplicaIndex>,
        Arc::clone(lock),
        config.clone(),
    )
}

fn make_subscriber<R>(
    gateway: &Arc<dyn RemoteGateway>,
    transport: &Arc<dyn FeedTransport>,
    replica: &Arc<MemoryReplica>,
    lock: &Arc<MutationLock>,
    config: &SyncConfig,
) -> LiveFeedSubscriber<R>
where
    R: Record,
    MemoryReplica: ReplicaStore<R>,
{
    let handler = Arc::new(ChangeEventHandler::new(
        Arc::clone(gateway),
        Arc::clone(replica) as Arc<dyn ReplicaStore<R>>,
        Arc::clone(lock),
        config.clone(),
    ));
    LiveFeedSubscriber::new(Arc::clone(transport), handler, config.clone())
}
