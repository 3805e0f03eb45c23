// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local replica storage.
//!
//! The replica is the single shared mutable resource in the engine. Writers
//! hold the engine's mutation lock before calling in here; readers take
//! point-in-time snapshots and never coordinate with writers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::record::{CustomerRecord, EntityKind, LocationRecord, OrderRecord, Record};

/// Typed storage operations for one mirrored entity type.
///
/// `insert` appends, `insert_front` prepends (live order feeds keep
/// most-recent-first ordering), `replace` overwrites the whole record for a
/// matching id, and `commit` marks the end of one batch of writes.
pub trait ReplicaStore<R: Record>: Send + Sync {
    /// Look up a record by id.
    fn find_by_id(&self, id: &str) -> Option<R>;

    /// Append a record.
    fn insert(&self, record: R);

    /// Insert a record at the head of the ordering.
    fn insert_front(&self, record: R);

    /// Overwrite the record with a matching id in place.
    ///
    /// Returns false when no record matched.
    fn replace(&self, record: R) -> bool;

    /// Remove any record with the given id. Returns whether one was removed.
    fn remove_by_id(&self, id: &str) -> bool;

    /// Mark the end of a batch of writes.
    fn commit(&self);

    /// Point-in-time copy of all records, in replica order.
    fn snapshot(&self) -> Vec<R>;

    /// Number of records currently held.
    fn len(&self) -> usize;

    /// True when no records are held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-entity existence checks, used to spot dangling parent references.
pub trait ReplicaIndex: Send + Sync {
    /// Whether a record of the given kind and id exists locally.
    fn contains(&self, kind: EntityKind, id: &str) -> bool;
}

/// One entity type's rows.
struct Shelf<R> {
    rows: RwLock<Vec<R>>,
}

impl<R: Record> Shelf<R> {
    fn new() -> Self {
        Shelf {
            rows: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<R>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<R>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn find(&self, id: &str) -> Option<R> {
        self.read().iter().find(|r| r.id() == id).cloned()
    }

    fn insert(&self, record: R) {
        self.write().push(record);
    }

    fn insert_front(&self, record: R) {
        self.write().insert(0, record);
    }

    fn replace(&self, record: R) -> bool {
        let mut rows = self.write();
        match rows.iter().position(|r| r.id() == record.id()) {
            Some(at) => {
                rows[at] = record;
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: &str) -> bool {
        let mut rows = self.write();
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        rows.len() != before
    }

    fn snapshot(&self) -> Vec<R> {
        self.read().clone()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|r| r.id() == id)
    }
}

/// In-memory replica holding all three entity types.
///
/// Each shelf is internally consistent per record: a reader may lag the
/// writers but never observes a torn record.
pub struct MemoryReplica {
    locations: Shelf<LocationRecord>,
    orders: Shelf<OrderRecord>,
    customers: Shelf<CustomerRecord>,
    commits: AtomicU64,
}

impl MemoryReplica {
    pub fn new() -> Self {
        MemoryReplica {
            locations: Shelf::new(),
            orders: Shelf::new(),
            customers: Shelf::new(),
            commits: AtomicU64::new(0),
        }
    }

    /// Number of commit marks recorded since creation.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }
}

impl Default for MemoryReplica {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_replica_store {
    ($record:ty, $shelf:ident) => {
        impl ReplicaStore<$record> for MemoryReplica {
            fn find_by_id(&self, id: &str) -> Option<$record> {
                self.$shelf.find(id)
            }

            fn insert(&self, record: $record) {
                self.$shelf.insert(record);
            }

            fn insert_front(&self, record: $record) {
                self.$shelf.insert_front(record);
            }

            fn replace(&self, record: $record) -> bool {
                self.$shelf.replace(record)
            }

            fn remove_by_id(&self, id: &str) -> bool {
                self.$shelf.remove(id)
            }

            fn commit(&self) {
                self.commits.fetch_add(1, Ordering::AcqRel);
            }

            fn snapshot(&self) -> Vec<$record> {
                self.$shelf.snapshot()
            }

            fn len(&self) -> usize {
                self.$shelf.len()
            }
        }
    };
}

impl_replica_store!(LocationRecord, locations);
impl_replica_store!(OrderRecord, orders);
impl_replica_store!(CustomerRecord, customers);

impl ReplicaIndex for MemoryReplica {
    fn contains(&self, kind: EntityKind, id: &str) -> bool {
        match kind {
            EntityKind::Location => self.locations.contains(id),
            EntityKind::Order => self.orders.contains(id),
            EntityKind::Customer => self.customers.contains(id),
        }
    }
}

#[cfg(test)]
#[path = "replica_tests.rs"]
mod tests;
