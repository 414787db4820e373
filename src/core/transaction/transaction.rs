// src/core/transaction/transaction.rs

use crate::core::indexing::manager::IndexMap;
use crate::core::storage::catalog::Catalog;
use chrono::{DateTime, Utc};

/// Lifecycle states of a transaction. Terminal states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// One diagnostic log entry. The log is never replayed; it exists for
/// inspection and debugging.
#[derive(Debug, Clone)]
pub struct OperationLogEntry {
    pub operation: String,
    pub args: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Everything restored by a rollback: the table catalog together with the
/// index maps, captured as one unit at `begin` so the index-coherence
/// invariant survives the restore.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub catalog: Catalog,
    pub indexes: IndexMap,
}

/// A single transaction's state.
#[derive(Debug)]
pub struct Transaction {
    pub id: String,
    pub state: TransactionState,
    pub operations: Vec<OperationLogEntry>,
    /// Present only while the transaction is active; discarded at commit,
    /// consumed at rollback.
    pub snapshot: Option<EngineSnapshot>,
}

impl Transaction {
    pub fn new(id: String, snapshot: EngineSnapshot) -> Self {
        Transaction {
            id,
            state: TransactionState::Active,
            operations: Vec::new(),
            snapshot: Some(snapshot),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    pub fn log(&mut self, operation: &str, args: Vec<String>) {
        self.operations.push(OperationLogEntry {
            operation: operation.to_string(),
            args,
            timestamp: Utc::now(),
        });
    }
}
