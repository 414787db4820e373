// src/core/common/error.rs

use crate::core::transaction::lock_manager::LockMode;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type DbResult<T> = Result<T, DbError>;

/// Every failure an engine operation can report.
///
/// Errors are values, not panics: each variant carries the human-readable
/// message a client sees. The taxonomy follows the engine surface - schema,
/// constraint, value, transaction, concurrency, and persistence failures are
/// distinct variants so callers can match on the category.
#[derive(Debug, Error)]
pub enum DbError {
    // --- Schema ---
    #[error("Table '{0}' already exists!")]
    TableExists(String),

    #[error("Table '{0}' does not exist!")]
    TableNotFound(String),

    #[error("Column '{column}' does not exist in table '{table}'!")]
    ColumnNotFound { table: String, column: String },

    #[error("Invalid column format: '{0}'. Expected format: column_name datatype")]
    InvalidColumnDecl(String),

    #[error("Unsupported data type: '{0}'")]
    UnsupportedType(String),

    #[error("Only one primary key is allowed per table!")]
    MultiplePrimaryKeys,

    #[error("Unknown constraint: '{0}'")]
    UnknownConstraint(String),

    #[error("Foreign key on '{0}' requires a 'parent_table.parent_column' target")]
    MissingForeignKeyTarget(String),

    // --- Constraint ---
    #[error("Primary key violation: '{0}' already exists!")]
    PrimaryKeyViolation(String),

    #[error("Unique constraint violation: '{0}' must be unique!")]
    UniqueViolation(String),

    #[error("Foreign key violation: '{value}' not found in '{target}'")]
    ForeignKeyViolation { value: String, target: String },

    #[error("Key '{0}' already exists! Use UPDATE instead.")]
    DuplicateKey(String),

    #[error("Cannot update primary key '{0}'.")]
    PrimaryKeyUpdate(String),

    // --- Value ---
    #[error("Invalid value '{value}' for column '{column}' (expected {expected})")]
    InvalidValue { value: String, column: String, expected: &'static str },

    #[error("Mismatch between column count and values!")]
    ArityMismatch { expected: usize, got: usize },

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    // --- Record ---
    #[error("Key '{0}' not found!")]
    KeyNotFound(String),

    // --- Index ---
    #[error("Index on '{table}.{column}' already exists!")]
    IndexExists { table: String, column: String },

    #[error("Index on '{table}.{column}' does not exist!")]
    IndexNotFound { table: String, column: String },

    // --- Transaction ---
    #[error("Transaction '{0}' already exists!")]
    TransactionExists(String),

    #[error("Transaction '{0}' does not exist!")]
    TransactionNotFound(String),

    #[error("Transaction '{0}' is not active!")]
    TransactionNotActive(String),

    // --- Concurrency ---
    #[error("Could not acquire {mode} lock on '{table}:{key}'. Try again later.")]
    LockRefused { table: String, key: String, mode: LockMode },

    // --- SQL front-end ---
    #[error("Invalid query syntax: {0}")]
    SqlSyntax(String),

    // --- Configuration / persistence ---
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    /// True for the retryable lock-refusal error, which clients are expected
    /// to handle by retrying rather than aborting outright.
    pub fn is_lock_refused(&self) -> bool {
        matches!(self, DbError::LockRefused { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = DbError::TableExists("students".to_string());
        assert_eq!(err.to_string(), "Table 'students' already exists!");

        let err = DbError::ForeignKeyViolation {
            value: "999".to_string(),
            target: "classes.id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Foreign key violation: '999' not found in 'classes.id'"
        );
    }

    #[test]
    fn lock_refusal_is_flagged_retryable() {
        let err = DbError::LockRefused {
            table: "students".to_string(),
            key: "1".to_string(),
            mode: LockMode::Write,
        };
        assert!(err.is_lock_refused());
        assert!(!DbError::MultiplePrimaryKeys.is_lock_refused());
    }
}
