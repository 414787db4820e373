// src/core/transaction/lock_manager.rs

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Requested lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared read lock; compatible with other readers.
    Read,
    /// Exclusive write lock; requires no readers and no writer.
    Write,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Read => f.write_str("read"),
            LockMode::Write => f.write_str("write"),
        }
    }
}

/// Synthetic row key used to lock whole-table operations (create/drop table,
/// drop column, unkeyed scans). A schema lock contends with every row lock
/// taken under the same key, and with nothing else.
pub const SCHEMA_KEY: &str = "schema";

/// A lockable resource: `(table, row-key)`, or `(table, "schema")`.
pub type LockKey = (String, String);

#[derive(Debug, Default)]
struct LockState {
    readers: HashSet<String>,
    writer: Option<String>,
    queue: VecDeque<(String, LockMode)>,
}

impl LockState {
    fn grants(&self, tx: &str, mode: LockMode) -> bool {
        match mode {
            LockMode::Read => self.writer.is_none(),
            LockMode::Write => {
                self.writer.is_none()
                    && (self.readers.is_empty()
                        || (self.readers.len() == 1 && self.readers.contains(tx)))
            }
        }
    }

    fn install(&mut self, tx: &str, mode: LockMode) {
        match mode {
            LockMode::Read => {
                self.readers.insert(tx.to_string());
            }
            LockMode::Write => {
                // An upgrading transaction stops counting as a reader.
                self.readers.remove(tx);
                self.writer = Some(tx.to_string());
            }
        }
    }

    fn is_free(&self) -> bool {
        self.readers.is_empty() && self.writer.is_none() && self.queue.is_empty()
    }
}

/// Multi-reader/single-writer locks keyed by `(table, row-or-schema)`.
///
/// Acquisition is non-blocking: an incompatible request is appended to the
/// key's FIFO queue and `false` is returned, and the caller treats the
/// refusal as a retryable failure. Locks are held until the owning
/// transaction ends; release drains each affected queue from the head,
/// granting waiters while compatibility holds.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: HashMap<LockKey, LockState>,
    /// Keys currently locked by each transaction.
    held: HashMap<String, HashSet<LockKey>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to take `mode` on `(table, key)` for transaction `tx`.
    ///
    /// Re-acquisition is a no-op: a reader is granted `read` again, a writer
    /// is granted either mode. A transaction that is the sole reader of a
    /// key may upgrade to `write`. Anything incompatible enqueues the
    /// request and returns `false` immediately.
    pub fn try_acquire(&mut self, tx: &str, table: &str, key: &str, mode: LockMode) -> bool {
        let lock_key = (table.to_string(), key.to_string());
        let state = self.locks.entry(lock_key.clone()).or_default();

        if state.writer.as_deref() == Some(tx) {
            return true;
        }
        if mode == LockMode::Read && state.readers.contains(tx) {
            return true;
        }

        if state.grants(tx, mode) {
            state.install(tx, mode);
            self.held.entry(tx.to_string()).or_default().insert(lock_key);
            return true;
        }

        state.queue.push_back((tx.to_string(), mode));
        tracing::debug!(tx, table, key, %mode, "lock refused, request queued");
        false
    }

    /// Releases every lock held by `tx` and purges its queued requests, then
    /// drains each affected queue in FIFO order, granting head-of-queue
    /// waiters for as long as the requests stay compatible.
    pub fn release_all(&mut self, tx: &str) {
        let keys = self.held.remove(tx).unwrap_or_default();
        for lock_key in keys {
            if let Some(state) = self.locks.get_mut(&lock_key) {
                state.readers.remove(tx);
                if state.writer.as_deref() == Some(tx) {
                    state.writer = None;
                }
                self.drain_queue(&lock_key);
            }
        }

        // A transaction that died while waiting must not be granted later.
        let stale: Vec<LockKey> = self
            .locks
            .iter()
            .filter(|(_, state)| state.queue.iter().any(|(waiter, _)| waiter == tx))
            .map(|(key, _)| key.clone())
            .collect();
        for lock_key in stale {
            if let Some(state) = self.locks.get_mut(&lock_key) {
                state.queue.retain(|(waiter, _)| waiter != tx);
            }
        }

        self.locks.retain(|_, state| !state.is_free());
    }

    fn drain_queue(&mut self, lock_key: &LockKey) {
        let Some(state) = self.locks.get_mut(lock_key) else { return };
        while let Some((waiter, mode)) = state.queue.front().cloned() {
            if !state.grants(&waiter, mode) {
                break;
            }
            state.queue.pop_front();
            state.install(&waiter, mode);
            self.held.entry(waiter).or_default().insert(lock_key.clone());
        }
    }

    /// The keys currently locked by `tx`.
    pub fn held_by(&self, tx: &str) -> HashSet<LockKey> {
        self.held.get(tx).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    fn holders(&self, table: &str, key: &str) -> (HashSet<String>, Option<String>) {
        self.locks
            .get(&(table.to_string(), key.to_string()))
            .map(|s| (s.readers.clone(), s.writer.clone()))
            .unwrap_or_default()
    }
}
