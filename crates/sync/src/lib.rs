// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! till-sync: Replica synchronization engine
//!
//! Keeps the local replica consistent with the remote authoritative service
//! through two channels: throttled full reconciliation sweeps and a
//! continuous live change feed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  full sweep   ┌─────────────────┐
//! │ SyncOrchestrator │──────────────►│  EntitySyncer   │───┐
//! └──────────────────┘ (×3 parallel) └─────────────────┘   │
//!                                                          ▼
//! ┌────────────────────┐ per event ┌────────────────────┐ MutationLock
//! │ LiveFeedSubscriber │──────────►│ ChangeEventHandler │───┐
//! └────────────────────┘           └────────────────────┘   ▼
//!          ▲                                 │          MemoryReplica
//!          │ FeedTransport                   │ RemoteGateway  │
//!          └── live change feed              └── fetch        ▼
//!                                                        UI (reads only)
//! ```
//!
//! Both write paths acquire the shared [`MutationLock`] before touching the
//! replica; the UI reads replica snapshots and never takes the lock.

pub mod config;
pub mod feed;
pub mod gateway;
pub mod handler;
pub mod lock;
pub mod orchestrator;
pub mod service;
pub mod subscriber;
pub mod syncer;

pub use config::SyncConfig;
pub use feed::{ChannelSpec, FeedSubscription, FeedTransport};
pub use gateway::RemoteGateway;
pub use handler::ChangeEventHandler;
pub use lock::{MutationGuard, MutationLock};
pub use orchestrator::SyncOrchestrator;
pub use service::SyncService;
pub use subscriber::{FeedStatus, LiveFeedSubscriber};
pub use syncer::EntitySyncer;

#[cfg(test)]
mod test_helpers;




#[cfg(test)]
mod handler_tests;





#[cfg(test)]
mod syncer_tests;
