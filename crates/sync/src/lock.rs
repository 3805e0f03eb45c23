// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fair asynchronous mutual exclusion for replica writers.
//!
//! Every write to the replica, whether from a reconciliation sweep or a
//! live-feed event, happens inside a scope that holds this lock. Waiters
//! are granted access in strict arrival order so a chatty feed cannot
//! starve a sweep, and a blocked caller consumes no scheduler time while
//! suspended.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

struct LockState {
    locked: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// FIFO-fair async mutex that hands the lock directly to the next waiter.
///
/// `acquire` returns an RAII guard; dropping the guard releases. Release on
/// every exit path is therefore structural, which is the only way the
/// release-exactly-once contract survives `?` and task cancellation.
pub struct MutationLock {
    state: Mutex<LockState>,
}

impl MutationLock {
    pub fn new() -> Self {
        MutationLock {
            state: Mutex::new(LockState {
                locked: false,
                waiters: VecDeque::new(),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suspend until exclusive access is granted.
    pub async fn acquire(&self) -> MutationGuard<'_> {
        loop {
            let rx = {
                let mut state = self.lock_state();
                if !state.locked && state.waiters.is_empty() {
                    state.locked = true;
                    return MutationGuard { lock: self };
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                rx
            };

            let mut waiter = QueuedWaiter {
                lock: self,
                rx: Some(rx),
            };
            if waiter.wait().await {
                return MutationGuard { lock: self };
            }
            // The sender vanished without a grant; queue again.
        }
    }

    /// Whether the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.lock_state().locked
    }

    /// Number of callers queued behind the holder.
    pub fn waiters(&self) -> usize {
        self.lock_state().waiters.len()
    }

    fn release(&self) {
        let mut state = self.lock_state();
        loop {
            match state.waiters.pop_front() {
                // Hand off directly: the flag stays set for the new holder.
                Some(next) => {
                    if next.send(()).is_ok() {
                        return;
                    }
                    // That waiter was cancelled; try the one behind it.
                }
                None => {
                    state.locked = false;
                    return;
                }
            }
        }
    }
}

impl Default for MutationLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to the replica; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct MutationGuard<'a> {
    lock: &'a MutationLock,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// A queued acquire. If the future is dropped after the lock was already
/// handed to it, the grant is passed on instead of being lost.
struct QueuedWaiter<'a> {
    lock: &'a MutationLock,
    rx: Option<oneshot::Receiver<()>>,
}

impl QueuedWaiter<'_> {
    async fn wait(&mut self) -> bool {
        match self.rx.as_mut() {
            Some(rx) => {
                let granted = rx.await.is_ok();
                if granted {
                    self.rx = None;
                }
                granted
            }
            None => false,
        }
    }
}

impl Drop for QueuedWaiter<'_> {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                self.lock.release();
            }
        }
    }
}
