// src/core/indexing/manager.rs

use crate::core::common::error::{DbError, DbResult};
use crate::core::query::Operator;
use crate::core::types::{Record, Value};
use std::collections::{BTreeMap, HashMap};

/// Posting map for one indexed column: value to the keys holding it.
pub type Postings = BTreeMap<Value, Vec<String>>;

/// All index structures: table to column to postings.
pub type IndexMap = HashMap<String, HashMap<String, Postings>>;

/// Maintains the secondary indexes for every table.
///
/// The store invokes the manager synchronously inside each mutation, so the
/// coherence invariant holds between operations: for every posting
/// `(table, column, value) -> keys`, the keys are exactly the records whose
/// field equals the value, and no empty posting list survives.
#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    indexes: IndexMap,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines an index on `table.column` and backfills it from `records`.
    pub fn create_index(
        &mut self,
        table: &str,
        column: &str,
        records: &HashMap<String, Record>,
    ) -> DbResult<()> {
        let table_indexes = self.indexes.entry(table.to_string()).or_default();
        if table_indexes.contains_key(column) {
            return Err(DbError::IndexExists {
                table: table.to_string(),
                column: column.to_string(),
            });
        }

        let mut postings = Postings::new();
        for (key, record) in records {
            if let Some(value) = record.get(column) {
                postings.entry(value.clone()).or_default().push(key.clone());
            }
        }
        table_indexes.insert(column.to_string(), postings);
        Ok(())
    }

    /// Removes the index on `table.column`. Dropping twice fails the second
    /// time and leaves state unchanged.
    pub fn drop_index(&mut self, table: &str, column: &str) -> DbResult<()> {
        let removed = self
            .indexes
            .get_mut(table)
            .and_then(|columns| columns.remove(column))
            .is_some();
        if !removed {
            return Err(DbError::IndexNotFound {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        if self.indexes.get(table).is_some_and(HashMap::is_empty) {
            self.indexes.remove(table);
        }
        Ok(())
    }

    pub fn has_index(&self, table: &str, column: &str) -> bool {
        self.indexes.get(table).is_some_and(|columns| columns.contains_key(column))
    }

    /// Every index as `"table.column"`, in no particular order.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .indexes
            .iter()
            .flat_map(|(table, columns)| {
                columns.keys().map(move |column| format!("{table}.{column}"))
            })
            .collect();
        names.sort();
        names
    }

    /// Adds a freshly inserted record to every index of its table.
    pub fn add_record(&mut self, table: &str, key: &str, record: &Record) {
        let Some(table_indexes) = self.indexes.get_mut(table) else { return };
        for (column, postings) in table_indexes {
            if let Some(value) = record.get(column) {
                postings.entry(value.clone()).or_default().push(key.to_string());
            }
        }
    }

    /// Removes a deleted record from every index of its table.
    pub fn remove_record(&mut self, table: &str, key: &str, record: &Record) {
        let Some(table_indexes) = self.indexes.get_mut(table) else { return };
        for (column, postings) in table_indexes {
            if let Some(value) = record.get(column) {
                remove_posting(postings, value, key);
            }
        }
    }

    /// Reindexes one field after an update: out of the old posting, into the
    /// new one.
    pub fn update_value(
        &mut self,
        table: &str,
        column: &str,
        key: &str,
        old: Option<&Value>,
        new: &Value,
    ) {
        let Some(postings) =
            self.indexes.get_mut(table).and_then(|columns| columns.get_mut(column))
        else {
            return;
        };
        if let Some(old) = old {
            remove_posting(postings, old, key);
        }
        postings.entry(new.clone()).or_default().push(key.to_string());
    }

    /// Drops a column's index if one exists; no error when absent.
    pub fn drop_column(&mut self, table: &str, column: &str) {
        let _ = self.drop_index(table, column);
    }

    /// Destroys every index of a dropped table.
    pub fn drop_table(&mut self, table: &str) {
        self.indexes.remove(table);
    }

    /// Clears every posting of a truncated table; the index definitions
    /// survive, matching the surviving schema.
    pub fn truncate_table(&mut self, table: &str) {
        if let Some(table_indexes) = self.indexes.get_mut(table) {
            for postings in table_indexes.values_mut() {
                postings.clear();
            }
        }
    }

    /// Index-accelerated key lookup.
    ///
    /// Returns `None` when no index exists on `table.column` - the caller
    /// must fall back to a full scan. With an index, `=` is a direct probe
    /// and the remaining operators walk the postings in value order.
    pub fn lookup(
        &self,
        table: &str,
        column: &str,
        operator: Operator,
        probe: &Value,
    ) -> Option<Vec<String>> {
        let postings = self.indexes.get(table)?.get(column)?;

        if operator == Operator::Eq {
            return Some(postings.get(probe).cloned().unwrap_or_default());
        }

        let mut keys = Vec::new();
        for (value, posting_keys) in postings {
            if operator.matches(value, probe) {
                keys.extend(posting_keys.iter().cloned());
            }
        }
        Some(keys)
    }

    /// Hands out a deep copy for transaction snapshots.
    pub fn snapshot(&self) -> IndexMap {
        self.indexes.clone()
    }

    /// Restores a previously captured snapshot.
    pub fn restore(&mut self, snapshot: IndexMap) {
        self.indexes = snapshot;
    }

    pub fn as_map(&self) -> &IndexMap {
        &self.indexes
    }
}

fn remove_posting(postings: &mut Postings, value: &Value, key: &str) {
    if let Some(keys) = postings.get_mut(value) {
        keys.retain(|k| k != key);
        if keys.is_empty() {
            postings.remove(value);
        }
    }
}
