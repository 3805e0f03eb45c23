// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live-feed subscription lifecycle.
//!
//! One subscriber owns one persistent subscription per entity type:
//! connect, listen, apply, and tear down. Reconnection is the embedding
//! app's call (`subscribe` again after a stream ends); each attempt uses a
//! fresh channel identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use till_core::{Error, Record, Result, TenantId};

use crate::config::SyncConfig;
use crate::feed::{ChannelSpec, FeedSubscription, FeedTransport};
use crate::handler::ChangeEventHandler;

/// Lifecycle states of one live-feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FeedStatus {
    Unsubscribed = 0,
    Subscribing = 1,
    Connected = 2,
    Listening = 3,
}

impl FeedStatus {
    fn from_u8(raw: u8) -> FeedStatus {
        match raw {
            1 => FeedStatus::Subscribing,
            2 => FeedStatus::Connected,
            3 => FeedStatus::Listening,
            _ => FeedStatus::Unsubscribed,
        }
    }

    /// Returns a human-readable state name for status reporting.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Unsubscribed => "unsubscribed",
            FeedStatus::Subscribing => "subscribing",
            FeedStatus::Connected => "connected",
            FeedStatus::Listening => "listening",
        }
    }
}

/// Feed state shared with the listening task.
///
/// Packs a generation counter next to the status so a superseded listener
/// winding down cannot clobber the state of the attempt that replaced it.
/// Atomic, so status reads never contend with the listener.
struct SharedFeedState {
    // (generation << 8) | status
    bits: AtomicU64,
}

impl SharedFeedState {
    fn new() -> Self {
        SharedFeedState {
            bits: AtomicU64::new(0),
        }
    }

    fn status(&self) -> FeedStatus {
        FeedStatus::from_u8((self.bits.load(Ordering::Acquire) & 0xFF) as u8)
    }

    /// Start a new attempt: bump the generation, mark it subscribing.
    fn begin(&self) -> u64 {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let generation = (current >> 8) + 1;
            let next = (generation << 8) | FeedStatus::Subscribing as u64;
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return generation,
                Err(observed) => current = observed,
            }
        }
    }

    /// Record a status for one attempt; stale attempts are ignored.
    fn set(&self, generation: u64, status: FeedStatus) {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            if current >> 8 != generation {
                return;
            }
            let next = (generation << 8) | status as u64;
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Owns one persistent change-feed subscription for one entity type.
pub struct LiveFeedSubscriber<R: Record> {
    transport: Arc<dyn FeedTransport>,
    handler: Arc<ChangeEventHandler<R>>,
    config: SyncConfig,
    state: Arc<SharedFeedState>,
    inner: Mutex<SubscriberInner>,
    cleanup: Mutex<JoinSet<()>>,
    attempt_seq: AtomicU64,
}

struct SubscriberInner {
    cancel: Option<CancellationToken>,
}

impl<R: Record> LiveFeedSubscriber<R> {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        handler: Arc<ChangeEventHandler<R>>,
        config: SyncConfig,
    ) -> Self {
        LiveFeedSubscriber {
            transport,
            handler,
            config,
            state: Arc::new(SharedFeedState::new()),
            inner: Mutex::new(SubscriberInner { cancel: None }),
            cleanup: Mutex::new(JoinSet::new()),
            attempt_seq: AtomicU64::new(0),
        }
    }

    /// Open the feed for a tenant and start listening in the background.
    ///
    /// Idempotent: while a listener is live this is a no-op. Stale state
    /// from a finished or cancelled listener is torn down first, and every
    /// attempt presents a fresh channel identity to the transport.
    pub async fn subscribe(&self, tenant: &TenantId) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if let Some(ref cancel) = inner.cancel {
            if !cancel.is_cancelled() && self.state.status() != FeedStatus::Unsubscribed {
                debug!("already subscribed to {}, ignoring", R::KIND);
                return Ok(());
            }
        }
        if let Some(stale) = inner.cancel.take() {
            stale.cancel();
        }

        let generation = self.state.begin();
        let channel = self.next_channel(tenant);
        info!("subscribing to {}", channel.topic);

        let subscription = match timeout(
            self.config.subscribe_timeout,
            self.transport.subscribe(&channel),
        )
        .await
        {
            Ok(Ok(subscription)) => subscription,
            Ok(Err(e)) => {
                self.state.set(generation, FeedStatus::Unsubscribed);
                return Err(e);
            }
            Err(_) => {
                self.state.set(generation, FeedStatus::Unsubscribed);
                return Err(Error::Timeout(self.config.subscribe_timeout));
            }
        };

        self.state.set(generation, FeedStatus::Connected);
        let cancel = CancellationToken::new();
        inner.cancel = Some(cancel.clone());

        let handler = Arc::clone(&self.handler);
        let state = Arc::clone(&self.state);
        self.cleanup
            .lock()
            .await
            .spawn(listen(subscription, handler, state, generation, cancel));
        Ok(())
    }

    /// Stop listening and release the channel.
    ///
    /// Cancels the loop and returns immediately; the network teardown
    /// finishes in the tracked background task. Safe to call repeatedly,
    /// including when never subscribed.
    pub async fn cleanup(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(cancel) = inner.cancel.take() {
            debug!("cancelling {} feed", R::KIND);
            cancel.cancel();
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> FeedStatus {
        self.state.status()
    }

    /// Await all background listeners and teardowns spawned so far.
    pub async fn drain_cleanup(&self) {
        let mut tasks = self.cleanup.lock().await;
        while tasks.join_next().await.is_some() {}
    }

    fn next_channel(&self, tenant: &TenantId) -> ChannelSpec {
        let seq = self.attempt_seq.fetch_add(1, Ordering::Relaxed);
        ChannelSpec {
            topic: format!(
                "{}:{}:{}-{}",
                tenant,
                R::KIND.table(),
                Utc::now().timestamp_millis(),
                seq
            ),
            table: R::KIND.table().to_string(),
            tenant: tenant.clone(),
        }
    }
}

async fn listen<R: Record>(
    mut subscription: Box<dyn FeedSubscription>,
    handler: Arc<ChangeEventHandler<R>>,
    state: Arc<SharedFeedState>,
    generation: u64,
    cancel: CancellationToken,
) {
    state.set(generation, FeedStatus::Listening);
    loop {
        // Cancellation is checked every iteration, not only at stream end.
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("{} feed cancelled", R::KIND);
                break;
            }
            next = subscription.next_event() => match next {
                Ok(Some(event)) => event,
                Ok(None) => {
                    info!("{} feed stream ended", R::KIND);
                    break;
                }
                Err(e) => {
                    warn!("{} feed stream failed: {}", R::KIND, e);
                    break;
                }
            },
        };

        // One event is applied fully before the next is awaited.
        if let Err(e) = handler.handle(event).await {
            warn!("dropping {} feed event: {}", R::KIND, e);
        }
    }
    state.set(generation, FeedStatus::Unsubscribed);
    // Channel release happens off the caller's path.
    subscription.unsubscribe().await;
}
