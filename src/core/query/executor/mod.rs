// src/core/query/executor/mod.rs

mod ddl;
mod dml;
mod select;

use crate::core::common::error::{DbError, DbResult};
use crate::core::indexing::IndexManager;
use crate::core::storage::{catalog::Catalog, snapshot};
use crate::core::transaction::{EngineSnapshot, LockMode, TransactionManager};
use std::path::PathBuf;

/// The storage/transaction engine behind the public API.
///
/// Owns the catalog, the index manager, and the transaction registry, and
/// runs every operation inside a transaction envelope: either the caller's
/// explicit transaction, or a fabricated implicit one that commits on
/// success and rolls back on any failure. The executor is single-threaded
/// by construction; [`crate::api::Database`] wraps it in a mutex.
#[derive(Debug)]
pub struct QueryExecutor {
    pub(crate) catalog: Catalog,
    pub(crate) indexes: IndexManager,
    pub(crate) txns: TransactionManager,
    snapshot_path: PathBuf,
}

impl QueryExecutor {
    /// Opens the engine against a snapshot file, loading whatever state the
    /// file holds. A missing or unreadable file starts the engine empty.
    pub fn open(snapshot_path: PathBuf) -> Self {
        let (catalog, index_map) = snapshot::load(&snapshot_path);
        let mut indexes = IndexManager::new();
        indexes.restore(index_map);
        QueryExecutor { catalog, indexes, txns: TransactionManager::new(), snapshot_path }
    }

    /// Starts an explicit transaction, capturing the rollback snapshot.
    pub fn begin_transaction(&mut self, id: &str) -> DbResult<()> {
        let snapshot = EngineSnapshot {
            catalog: self.catalog.clone(),
            indexes: self.indexes.snapshot(),
        };
        self.txns.begin(id, snapshot)
    }

    /// Commits: releases locks, discards the rollback snapshot, and flushes
    /// the on-disk snapshot. A flush failure is logged rather than surfaced -
    /// the in-memory state is already committed and stays authoritative.
    pub fn commit_transaction(&mut self, id: &str) -> DbResult<()> {
        self.txns.commit(id)?;
        if let Err(err) = snapshot::save(&self.snapshot_path, &self.catalog, &self.indexes) {
            tracing::error!(
                path = %self.snapshot_path.display(),
                %err,
                "commit flush failed; in-memory state remains authoritative"
            );
        }
        Ok(())
    }

    /// Rolls back: releases locks and restores the catalog and index maps
    /// captured at `begin`.
    pub fn rollback_transaction(&mut self, id: &str) -> DbResult<()> {
        if let Some(snapshot) = self.txns.rollback(id)? {
            self.catalog = snapshot.catalog;
            self.indexes.restore(snapshot.indexes);
        }
        Ok(())
    }

    pub fn is_transaction_active(&self, id: &str) -> bool {
        self.txns.is_active(id)
    }

    /// Runs `op` inside a transaction envelope.
    ///
    /// With an explicit id the transaction must be active; the operation's
    /// error (if any) is returned unchanged and the transaction stays
    /// active - the client decides whether to commit or roll back. Without
    /// an id a fresh implicit transaction wraps the single operation:
    /// commit on success, rollback on any failure.
    pub(crate) fn with_transaction<T>(
        &mut self,
        txn_id: Option<&str>,
        op: impl FnOnce(&mut Self, &str) -> DbResult<T>,
    ) -> DbResult<T> {
        match txn_id {
            Some(id) => {
                if !self.txns.is_active(id) {
                    return Err(DbError::TransactionNotActive(id.to_string()));
                }
                op(self, id)
            }
            None => {
                let id = self.txns.next_implicit_id();
                self.begin_transaction(&id)?;
                match op(self, &id) {
                    Ok(value) => {
                        self.commit_transaction(&id)?;
                        Ok(value)
                    }
                    Err(err) => {
                        if let Err(rollback_err) = self.rollback_transaction(&id) {
                            tracing::warn!(%rollback_err, "implicit rollback failed");
                        }
                        Err(err)
                    }
                }
            }
        }
    }

    /// Takes a lock or reports the retryable refusal.
    pub(crate) fn acquire(
        &mut self,
        tx: &str,
        table: &str,
        key: &str,
        mode: LockMode,
    ) -> DbResult<()> {
        if self.txns.locks.try_acquire(tx, table, key, mode) {
            Ok(())
        } else {
            Err(DbError::LockRefused {
                table: table.to_string(),
                key: key.to_string(),
                mode,
            })
        }
    }

    pub(crate) fn log(&mut self, tx: &str, operation: &str, args: Vec<String>) {
        self.txns.log_operation(tx, operation, args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;
    use std::collections::HashMap;

    fn open_executor(dir: &tempfile::TempDir) -> QueryExecutor {
        QueryExecutor::open(dir.path().join("database.json"))
    }

    fn students(executor: &mut QueryExecutor) {
        let constraints =
            HashMap::from([("id".to_string(), vec!["primary_key".to_string()])]);
        executor
            .create_table(
                "students",
                &["id int".to_string(), "name string".to_string()],
                &constraints,
                None,
            )
            .unwrap();
    }

    #[test]
    fn implicit_transactions_commit_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut executor = open_executor(&dir);
            students(&mut executor);
            executor
                .insert("students", "1", &["1".to_string(), "John".to_string()], None)
                .unwrap();
        }

        // A fresh executor sees the committed state.
        let mut executor = open_executor(&dir);
        let record = executor.get("students", "1", None).unwrap();
        assert_eq!(record["name"], Value::Str("John".into()));
    }

    #[test]
    fn implicit_transactions_roll_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        students(&mut executor);

        let err = executor
            .insert("students", "1", &["not-an-int".to_string(), "John".to_string()], None)
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidValue { .. }));
        assert!(matches!(
            executor.get("students", "1", None),
            Err(DbError::KeyNotFound(_))
        ));
    }

    #[test]
    fn explicit_transaction_survives_an_operation_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        students(&mut executor);

        executor.begin_transaction("tx1").unwrap();
        let err = executor
            .insert("students", "1", &["bad".to_string(), "John".to_string()], Some("tx1"))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidValue { .. }));
        assert!(executor.is_transaction_active("tx1"));

        executor
            .insert("students", "1", &["1".to_string(), "John".to_string()], Some("tx1"))
            .unwrap();
        executor.commit_transaction("tx1").unwrap();
        assert!(executor.get("students", "1", None).is_ok());
    }

    #[test]
    fn rollback_restores_catalog_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        students(&mut executor);
        executor
            .insert("students", "1", &["1".to_string(), "John".to_string()], None)
            .unwrap();
        executor.create_index("students", "name", None).unwrap();

        let catalog_before = executor.catalog.clone();
        let indexes_before = executor.indexes.snapshot();

        executor.begin_transaction("tx1").unwrap();
        executor
            .insert("students", "2", &["2".to_string(), "Jane".to_string()], Some("tx1"))
            .unwrap();
        executor.rollback_transaction("tx1").unwrap();

        assert_eq!(executor.catalog, catalog_before);
        assert_eq!(executor.indexes.snapshot(), indexes_before);
    }

    #[test]
    fn operations_against_finished_transactions_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        students(&mut executor);

        executor.begin_transaction("tx1").unwrap();
        executor.commit_transaction("tx1").unwrap();
        assert!(matches!(
            executor.insert(
                "students",
                "1",
                &["1".to_string(), "John".to_string()],
                Some("tx1")
            ),
            Err(DbError::TransactionNotActive(_))
        ));
        assert!(matches!(
            executor.begin_transaction("tx1"),
            Err(DbError::TransactionExists(_))
        ));
    }

    #[test]
    fn lock_refusal_rolls_back_the_implicit_reader() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        students(&mut executor);

        executor.begin_transaction("tx1").unwrap();
        executor
            .insert("students", "3", &["3".to_string(), "Carol".to_string()], Some("tx1"))
            .unwrap();

        // An implicit get cannot take the read lock while tx1 writes.
        let err = executor.get("students", "3", None).unwrap_err();
        assert!(err.is_lock_refused());

        executor.rollback_transaction("tx1").unwrap();
        assert!(matches!(
            executor.get("students", "3", None),
            Err(DbError::KeyNotFound(_))
        ));
    }
}
