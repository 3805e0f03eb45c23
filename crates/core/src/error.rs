// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for replica sync operations.

use std::time::Duration;

use thiserror::Error;

use crate::record::EntityKind;

/// All possible errors that can occur while keeping the replica in sync.
///
/// None of these propagate past the sync layer: malformed payloads are
/// dropped, transport failures abort the current pass and leave the replica
/// at its last committed state, and cancellation is an expected outcome of
/// superseding a sweep.
#[derive(Debug, Error)]
pub enum Error {
    /// A change-event payload or remote row could not be decoded.
    #[error("malformed payload: {0}")]
    Decode(String),

    /// A payload carried no usable record id.
    #[error("payload has no usable record id")]
    MissingId,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fetch or subscribe against the remote service failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A remote call exceeded its configured bound.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Fetch-one found no record for the id.
    #[error("record not found: {kind}/{id}")]
    NotFound {
        kind: EntityKind,
        id: String,
    },

    /// A sync pass observed cooperative cancellation and stopped.
    #[error("sync pass cancelled")]
    Cancelled,
}

/// A specialized Result type for replica sync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
