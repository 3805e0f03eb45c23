// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-entity snapshot reconciliation.

use std::sync::Arc;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use till_core::{decode_record, Error, Record, ReplicaIndex, ReplicaStore, Result, TenantId};

use crate::config::SyncConfig;
use crate::gateway::RemoteGateway;
use crate::lock::MutationLock;

/// Pulls one entity type's remote snapshot and upserts it into the replica.
///
/// The snapshot is a bounded window, so records absent from it are
/// deliberately left in place; only delete events remove records.
pub struct EntitySyncer<R: Record> {
    gateway: Arc<dyn RemoteGateway>,
    replica: Arc<dyn ReplicaStore<R>>,
    index: Arc<dyn ReplicaIndex>,
    lock: Arc<MutationLock>,
    config: SyncConfig,
}

impl<R: Record> EntitySyncer<R> {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        replica: Arc<dyn ReplicaStore<R>>,
        index: Arc<dyn ReplicaIndex>,
        lock: Arc<MutationLock>,
        config: SyncConfig,
    ) -> Self {
        EntitySyncer {
            gateway,
            replica,
            index,
            lock,
            config,
        }
    }

    /// Run one reconciliation pass for this entity type.
    ///
    /// Returns the number of records upserted. Fetch errors surface to the
    /// orchestrator, which absorbs and logs them; the replica keeps
    /// whatever state was last committed. Retry, if any, is the next
    /// scheduled sweep's job.
    pub async fn sync(&self, tenant: &TenantId, cancel: &CancellationToken) -> Result<usize> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let raw = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            fetched = timeout(
                self.config.fetch_timeout,
                self.gateway.fetch_all(R::KIND, tenant),
            ) => fetched.map_err(|_| Error::Timeout(self.config.fetch_timeout))??,
        };

        let mut records = Vec::with_capacity(raw.len());
        for row in raw {
            match decode_record::<R>(row) {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping undecodable {} row: {}", R::KIND, e),
            }
        }

        // Checkpoint: a superseding sweep may have started during the fetch.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let applied = records.len();
        let _guard = self.lock.acquire().await;
        for record in records {
            for (kind, id) in record.parent_refs() {
                // Dangling references are tolerated; a later sync resolves them.
                if !self.index.contains(kind, id) {
                    debug!(
                        "{} {} references {}/{} not yet local",
                        R::KIND,
                        record.id(),
                        kind,
                        id
                    );
                }
            }
            if self.replica.find_by_id(record.id()).is_some() {
                self.replica.replace(record);
            } else {
                self.replica.insert(record);
            }
        }
        self.replica.commit();
        Ok(applied)
    }
}
