// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Change-event envelopes delivered by the live feed.

use serde::{Deserialize, Serialize};

use crate::payload::FeedValue;

/// The kind of change a feed event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single insert/update/delete notification for one remote row.
///
/// `record` carries the new row for inserts and updates; `old_record`
/// carries the previous row for deletes. Both stay loosely typed until
/// sanitized by the handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: String,
    #[serde(default)]
    pub record: Option<FeedValue>,
    #[serde(default)]
    pub old_record: Option<FeedValue>,
}

impl ChangeEvent {
    /// An insert notification carrying the new row.
    pub fn insert(table: impl Into<String>, record: FeedValue) -> Self {
        ChangeEvent {
            kind: ChangeKind::Insert,
            table: table.into(),
            record: Some(record),
            old_record: None,
        }
    }

    /// An update notification carrying the new row.
    pub fn update(table: impl Into<String>, record: FeedValue) -> Self {
        ChangeEvent {
            kind: ChangeKind::Update,
            table: table.into(),
            record: Some(record),
            old_record: None,
        }
    }

    /// A delete notification carrying the old row.
    pub fn delete(table: impl Into<String>, old_record: FeedValue) -> Self {
        ChangeEvent {
            kind: ChangeKind::Delete,
            table: table.into(),
            record: None,
            old_record: Some(old_record),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
