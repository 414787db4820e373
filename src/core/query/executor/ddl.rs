// src/core/query/executor/ddl.rs

use super::QueryExecutor;
use crate::core::common::error::{DbError, DbResult};
use crate::core::common::fold_ident;
use crate::core::transaction::{LockMode, SCHEMA_KEY};
use crate::core::types::ColumnDef;
use std::collections::HashMap;

impl QueryExecutor {
    /// Creates a table from textual column declarations and a per-column
    /// constraint listing (see [`crate::core::storage::Catalog::create_table`]).
    pub fn create_table(
        &mut self,
        name: &str,
        columns: &[String],
        constraints: &HashMap<String, Vec<String>>,
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let name = fold_ident(name);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &name, SCHEMA_KEY, LockMode::Write)?;
            exec.catalog.create_table(&name, columns, constraints)?;
            exec.log(tx, "create_table", vec![name.clone(), format!("{columns:?}")]);
            Ok(())
        })
    }

    /// Drops a table and destroys its indexes.
    pub fn drop_table(&mut self, name: &str, txn_id: Option<&str>) -> DbResult<()> {
        let name = fold_ident(name);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &name, SCHEMA_KEY, LockMode::Write)?;
            exec.catalog.drop_table(&mut exec.indexes, &name)?;
            exec.log(tx, "drop_table", vec![name.clone()]);
            Ok(())
        })
    }

    /// Truncate: deletes every record of a table but keeps its schema (and
    /// its index definitions, emptied).
    pub fn delete_table(&mut self, name: &str, txn_id: Option<&str>) -> DbResult<()> {
        let name = fold_ident(name);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &name, SCHEMA_KEY, LockMode::Write)?;
            exec.catalog.truncate_table(&mut exec.indexes, &name)?;
            exec.log(tx, "delete_table", vec![name.clone()]);
            Ok(())
        })
    }

    /// Removes a column from the schema and from every record. Any index on
    /// the column is dropped with it.
    pub fn drop_column(
        &mut self,
        table: &str,
        column: &str,
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let table = fold_ident(table);
        let column = fold_ident(column);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, SCHEMA_KEY, LockMode::Write)?;
            exec.catalog.drop_column(&mut exec.indexes, &table, &column)?;
            exec.log(tx, "drop_column", vec![table.clone(), column.clone()]);
            Ok(())
        })
    }

    /// Creates a secondary index on `table.column`, backfilled from the
    /// existing records.
    pub fn create_index(
        &mut self,
        table: &str,
        column: &str,
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let table = fold_ident(table);
        let column = fold_ident(column);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, SCHEMA_KEY, LockMode::Read)?;
            let stored = exec.catalog.table(&table)?;
            if !stored.has_column(&column) {
                return Err(DbError::ColumnNotFound { table: table.clone(), column: column.clone() });
            }
            exec.indexes.create_index(&table, &column, &stored.records)?;
            exec.log(tx, "create_index", vec![table.clone(), column.clone()]);
            Ok(())
        })
    }

    /// Drops the index on `table.column`. Dropping twice reports "does not
    /// exist" the second time and changes nothing.
    pub fn drop_index(
        &mut self,
        table: &str,
        column: &str,
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let table = fold_ident(table);
        let column = fold_ident(column);
        self.with_transaction(txn_id, |exec, tx| {
            exec.indexes.drop_index(&table, &column)?;
            exec.log(tx, "drop_index", vec![table.clone(), column.clone()]);
            Ok(())
        })
    }

    pub fn has_index(&self, table: &str, column: &str) -> bool {
        self.indexes.has_index(&fold_ident(table), &fold_ident(column))
    }

    /// Every index as `"table.column"`.
    pub fn list_indexes(&self) -> Vec<String> {
        self.indexes.list()
    }

    /// The column definitions of a table, under a schema read lock.
    pub fn get_table_columns(
        &mut self,
        table: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<ColumnDef>> {
        let table = fold_ident(table);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, SCHEMA_KEY, LockMode::Read)?;
            let columns = exec.catalog.table(&table)?.columns.clone();
            exec.log(tx, "get_table_columns", vec![table.clone()]);
            Ok(columns)
        })
    }
}
