// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote query seam.
//!
//! The engine never talks to the authoritative service directly; it goes
//! through this trait so deployments can plug in their query layer and
//! tests can plug in canned responses.

use futures_util::future::BoxFuture;
use serde_json::Value;

use till_core::{EntityKind, Result, TenantId};

/// Fetch operations against the authoritative service, scoped by tenant.
pub trait RemoteGateway: Send + Sync {
    /// Fetch the bounded snapshot window of one entity type.
    ///
    /// The window is not necessarily every record the remote has ever seen
    /// (active orders only, a capped customer count); sweeps therefore
    /// treat absence as "outside the window", never as deletion.
    fn fetch_all<'a>(
        &'a self,
        kind: EntityKind,
        tenant: &'a TenantId,
    ) -> BoxFuture<'a, Result<Vec<Value>>>;

    /// Fetch one complete record by id.
    fn fetch_one<'a>(&'a self, kind: EntityKind, id: &'a str) -> BoxFuture<'a, Result<Value>>;
}
