// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Throttled full-replica reconciliation.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use till_core::{
    CustomerRecord, EntityKind, Error, LocationRecord, OrderRecord, Record, Result, TenantId,
};

use crate::syncer::EntitySyncer;

/// Coordinates full reconciliation sweeps across all entity types.
///
/// A new sweep supersedes the one in flight: the old sweep's token is
/// cancelled and it winds down at its next checkpoint while the new sweep
/// proceeds. Callers observe completion through state (`is_syncing`,
/// `last_synced_at`), not a return value.
pub struct SyncOrchestrator {
    locations: EntitySyncer<LocationRecord>,
    orders: EntitySyncer<OrderRecord>,
    customers: EntitySyncer<CustomerRecord>,
    current: Mutex<Option<CancellationToken>>,
    epoch: AtomicU64,
    syncing: AtomicBool,
    last_synced_ms: AtomicI64,
}

impl SyncOrchestrator {
    pub fn new(
        locations: EntitySyncer<LocationRecord>,
        orders: EntitySyncer<OrderRecord>,
        customers: EntitySyncer<CustomerRecord>,
    ) -> Self {
        SyncOrchestrator {
            locations,
            orders,
            customers,
            current: Mutex::new(None),
            epoch: AtomicU64::new(0),
            syncing: AtomicBool::new(false),
            last_synced_ms: AtomicI64::new(0),
        }
    }

    /// Run a full reconciliation sweep, superseding any sweep in flight.
    ///
    /// The three entity syncs run concurrently and independently: one
    /// failing or being cancelled does not abort the others.
    pub async fn sync_all(&self, tenant: &TenantId) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        {
            let mut current = self.current.lock().await;
            if let Some(previous) = current.replace(token.clone()) {
                previous.cancel();
            }
        }

        self.syncing.store(true, Ordering::Release);
        // Finalization must run on success, partial failure, and cancellation.
        let _finish = SweepFinish {
            orchestrator: self,
            epoch,
        };

        debug!("starting sweep {} for tenant {}", epoch, tenant);
        tokio::join!(
            run_entity(&self.locations, tenant, &token),
            run_entity(&self.orders, tenant, &token),
            run_entity(&self.customers, tenant, &token),
        );
    }

    /// Refresh a single entity type outside the sweep lifecycle.
    ///
    /// Serves the ad hoc "resync this list" calls: does not touch the sweep
    /// flag and is not cancelled by a concurrent `sync_all`.
    pub async fn resync(&self, kind: EntityKind, tenant: &TenantId) -> Result<usize> {
        let token = CancellationToken::new();
        match kind {
            EntityKind::Location => self.locations.sync(tenant, &token).await,
            EntityKind::Order => self.orders.sync(tenant, &token).await,
            EntityKind::Customer => self.customers.sync(tenant, &token).await,
        }
    }

    /// Whether a sweep is currently in flight.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Completion time of the most recently finished sweep.
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        match self.last_synced_ms.load(Ordering::Acquire) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }
}

async fn run_entity<R: Record>(
    syncer: &EntitySyncer<R>,
    tenant: &TenantId,
    cancel: &CancellationToken,
) {
    match syncer.sync(tenant, cancel).await {
        Ok(applied) => debug!("synced {} {} records", applied, R::KIND),
        Err(Error::Cancelled) => debug!("{} sync superseded", R::KIND),
        Err(e) => warn!("{} sync failed: {}", R::KIND, e),
    }
}

struct SweepFinish<'a> {
    orchestrator: &'a SyncOrchestrator,
    epoch: u64,
}

impl Drop for SweepFinish<'_> {
    fn drop(&mut self) {
        let orchestrator = self.orchestrator;
        // Only the current sweep may clear the flag; a superseded sweep
        // winding down must not mark its successor idle.
        if orchestrator.epoch.load(Ordering::SeqCst) == self.epoch {
            orchestrator.syncing.store(false, Ordering::Release);
        }
        orchestrator
            .last_synced_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
        debug!("sweep {} finished", self.epoch);
    }
}
