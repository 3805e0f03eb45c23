// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live change-event application.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::debug;

use till_core::{
    decode_record, sanitize, ChangeEvent, ChangeKind, Error, FeedValue, Record, ReplicaStore,
    Result,
};

use crate::config::SyncConfig;
use crate::gateway::RemoteGateway;
use crate::lock::MutationLock;

/// Decodes one feed event and applies it to the replica under the lock.
///
/// Events are applied strictly in delivery order: the subscriber's loop
/// finishes one event, fetch included, before awaiting the next, so a later
/// update for an id always lands after an earlier one and a stale fetch can
/// never overwrite a fresher result.
pub struct ChangeEventHandler<R: Record> {
    gateway: Arc<dyn RemoteGateway>,
    replica: Arc<dyn ReplicaStore<R>>,
    lock: Arc<MutationLock>,
    config: SyncConfig,
}

impl<R: Record> ChangeEventHandler<R> {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        replica: Arc<dyn ReplicaStore<R>>,
        lock: Arc<MutationLock>,
        config: SyncConfig,
    ) -> Self {
        ChangeEventHandler {
            gateway,
            replica,
            lock,
            config,
        }
    }

    /// Apply one event.
    ///
    /// An error means the event was dropped; the listening loop logs it and
    /// keeps going. Events for another table are skipped.
    pub async fn handle(&self, event: ChangeEvent) -> Result<()> {
        if event.table != R::KIND.table() {
            debug!("ignoring {} event for table {}", event.kind, event.table);
            return Ok(());
        }
        match event.kind {
            ChangeKind::Insert => self.on_insert(event).await,
            ChangeKind::Update => self.on_update(event).await,
            ChangeKind::Delete => self.on_delete(event).await,
        }
    }

    async fn on_insert(&self, event: ChangeEvent) -> Result<()> {
        let id = record_id(event.record.as_ref())?;
        // Related rows (order line items) land in a separate transaction
        // shortly after the parent; give them time before fetching.
        sleep(self.config.insert_grace).await;
        let record = self.fetch_full(&id).await?;

        let _guard = self.lock.acquire().await;
        if self.replica.find_by_id(record.id()).is_some() {
            // A replayed insert (reconnect) must not duplicate the id.
            self.replica.replace(record);
        } else {
            self.replica.insert_front(record);
        }
        Ok(())
    }

    async fn on_update(&self, event: ChangeEvent) -> Result<()> {
        let id = record_id(event.record.as_ref())?;
        let record = self.fetch_full(&id).await?;

        let _guard = self.lock.acquire().await;
        if !self.replica.replace(record) {
            debug!("update for {} {} not held locally", R::KIND, id);
        }
        Ok(())
    }

    async fn on_delete(&self, event: ChangeEvent) -> Result<()> {
        // The old row carries the id; no remote fetch is needed.
        let id = record_id(event.old_record.as_ref())?;

        let _guard = self.lock.acquire().await;
        if !self.replica.remove_by_id(&id) {
            debug!("delete for {} {} not held locally", R::KIND, id);
        }
        Ok(())
    }

    async fn fetch_full(&self, id: &str) -> Result<R> {
        let raw = timeout(self.config.fetch_timeout, self.gateway.fetch_one(R::KIND, id))
            .await
            .map_err(|_| Error::Timeout(self.config.fetch_timeout))??;
        decode_record(raw)
    }
}

/// Extract the record id from a sanitized event payload.
fn record_id(payload: Option<&FeedValue>) -> Result<String> {
    let payload = payload.ok_or(Error::MissingId)?;
    match sanitize(payload.clone()).get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(Error::MissingId),
    }
}
