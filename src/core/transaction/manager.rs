// src/core/transaction/manager.rs

use crate::core::common::error::{DbError, DbResult};
use crate::core::transaction::lock_manager::LockManager;
use crate::core::transaction::transaction::{EngineSnapshot, Transaction, TransactionState};
use std::collections::HashMap;

/// Owns the transaction registry and the lock manager.
///
/// The registry retains finished transactions, so a terminal id cannot be
/// reused by `begin` and operations against it fail with "not active". The
/// operation log inside each transaction is likewise retained unbounded;
/// this mirrors the engine's diagnostic-only use of the log.
#[derive(Debug, Default)]
pub struct TransactionManager {
    transactions: HashMap<String, Transaction>,
    pub locks: LockManager,
    implicit_counter: u64,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fabricates the next implicit-transaction id.
    pub fn next_implicit_id(&mut self) -> String {
        self.implicit_counter += 1;
        format!("implicit_transaction_{}", self.implicit_counter)
    }

    /// Starts a transaction, installing `snapshot` as its rollback point.
    pub fn begin(&mut self, id: &str, snapshot: EngineSnapshot) -> DbResult<()> {
        if self.transactions.contains_key(id) {
            return Err(DbError::TransactionExists(id.to_string()));
        }
        self.transactions.insert(id.to_string(), Transaction::new(id.to_string(), snapshot));
        Ok(())
    }

    /// Commits: releases every lock, discards the rollback snapshot, and
    /// flips the state. The caller is responsible for flushing the on-disk
    /// snapshot afterwards.
    pub fn commit(&mut self, id: &str) -> DbResult<()> {
        let txn = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| DbError::TransactionNotFound(id.to_string()))?;
        if !txn.is_active() {
            return Err(DbError::TransactionNotActive(id.to_string()));
        }
        txn.state = TransactionState::Committed;
        txn.snapshot = None;
        self.locks.release_all(id);
        Ok(())
    }

    /// Rolls back: releases every lock, flips the state, and hands the
    /// rollback snapshot to the caller for restoration.
    pub fn rollback(&mut self, id: &str) -> DbResult<Option<EngineSnapshot>> {
        let txn = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| DbError::TransactionNotFound(id.to_string()))?;
        if !txn.is_active() {
            return Err(DbError::TransactionNotActive(id.to_string()));
        }
        txn.state = TransactionState::RolledBack;
        let snapshot = txn.snapshot.take();
        self.locks.release_all(id);
        Ok(snapshot)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.transactions.get(id).is_some_and(Transaction::is_active)
    }

    /// Appends a diagnostic log entry to an active transaction. Silently
    /// ignored for unknown or finished transactions.
    pub fn log_operation(&mut self, id: &str, operation: &str, args: Vec<String>) {
        if let Some(txn) = self.transactions.get_mut(id) {
            if txn.is_active() {
                txn.log(operation, args);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indexing::manager::IndexMap;
    use crate::core::storage::catalog::Catalog;

    fn empty_snapshot() -> EngineSnapshot {
        EngineSnapshot { catalog: Catalog::default(), indexes: IndexMap::default() }
    }

    #[test]
    fn begin_rejects_duplicate_ids() {
        let mut manager = TransactionManager::new();
        manager.begin("tx1", empty_snapshot()).unwrap();
        assert!(matches!(
            manager.begin("tx1", empty_snapshot()),
            Err(DbError::TransactionExists(_))
        ));
    }

    #[test]
    fn terminal_ids_stay_reserved() {
        let mut manager = TransactionManager::new();
        manager.begin("tx1", empty_snapshot()).unwrap();
        manager.commit("tx1").unwrap();
        assert!(matches!(
            manager.begin("tx1", empty_snapshot()),
            Err(DbError::TransactionExists(_))
        ));
        assert!(!manager.is_active("tx1"));
    }

    #[test]
    fn commit_requires_an_active_transaction() {
        let mut manager = TransactionManager::new();
        assert!(matches!(manager.commit("ghost"), Err(DbError::TransactionNotFound(_))));

        manager.begin("tx1", empty_snapshot()).unwrap();
        manager.rollback("tx1").unwrap();
        assert!(matches!(manager.commit("tx1"), Err(DbError::TransactionNotActive(_))));
    }

    #[test]
    fn rollback_returns_the_snapshot_once() {
        let mut manager = TransactionManager::new();
        manager.begin("tx1", empty_snapshot()).unwrap();
        let snapshot = manager.rollback("tx1").unwrap();
        assert!(snapshot.is_some());
        assert!(matches!(manager.rollback("tx1"), Err(DbError::TransactionNotActive(_))));
    }

    #[test]
    fn commit_discards_the_snapshot() {
        let mut manager = TransactionManager::new();
        manager.begin("tx1", empty_snapshot()).unwrap();
        manager.commit("tx1").unwrap();
        assert!(manager.get("tx1").unwrap().snapshot.is_none());
    }

    #[test]
    fn implicit_ids_are_monotone() {
        let mut manager = TransactionManager::new();
        assert_eq!(manager.next_implicit_id(), "implicit_transaction_1");
        assert_eq!(manager.next_implicit_id(), "implicit_transaction_2");
    }

    #[test]
    fn log_is_appended_only_while_active() {
        let mut manager = TransactionManager::new();
        manager.begin("tx1", empty_snapshot()).unwrap();
        manager.log_operation("tx1", "insert", vec!["students".into(), "1".into()]);
        manager.commit("tx1").unwrap();
        manager.log_operation("tx1", "insert", vec!["students".into(), "2".into()]);

        let txn = manager.get("tx1").unwrap();
        assert_eq!(txn.operations.len(), 1);
        assert_eq!(txn.operations[0].operation, "insert");
    }
}
