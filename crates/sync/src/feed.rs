// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live-feed transport seam.
//!
//! Abstracts the change-notification channel the same way the gateway
//! abstracts queries: real transports adapt whatever streaming mechanism
//! the deployment uses, tests drive the engine with scripted events.

use futures_util::future::BoxFuture;

use till_core::{ChangeEvent, Result, TenantId};

/// Identity of one subscription attempt.
///
/// `topic` is unique per attempt (tenant, table, and a monotonic stamp) so
/// a reconnect can never collide with a stale server-side subscription left
/// over from a previous session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub topic: String,
    pub table: String,
    pub tenant: TenantId,
}

/// Transport half: opens change-event channels.
pub trait FeedTransport: Send + Sync {
    /// Open a channel for the given table, scoped to the tenant.
    fn subscribe<'a>(
        &'a self,
        channel: &'a ChannelSpec,
    ) -> BoxFuture<'a, Result<Box<dyn FeedSubscription>>>;
}

/// One open channel yielding change events in delivery order.
pub trait FeedSubscription: Send {
    /// Await the next event. `None` means the stream ended.
    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<ChangeEvent>>>;

    /// Detach and release the channel.
    ///
    /// Callers may fire-and-forget the returned future; no caller-facing
    /// state depends on its completion.
    fn unsubscribe(self: Box<Self>) -> BoxFuture<'static, ()>;
}
