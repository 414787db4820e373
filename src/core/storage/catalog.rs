// src/core/storage/catalog.rs

use crate::core::common::error::{DbError, DbResult};
use crate::core::common::{fold_ident, fold_key};
use crate::core::indexing::IndexManager;
use crate::core::types::{ColumnDef, Constraint, Record, Table, Value};
use std::collections::HashMap;

/// The in-memory table catalog and record store.
///
/// The catalog enforces schema shape and per-row constraints; it holds no
/// locks itself. Callers are responsible for taking the appropriate
/// `(table, key)` or `(table, "schema")` locks before mutating, and for
/// passing the index manager in so index maintenance happens inside the same
/// mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub tables: HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> DbResult<&Table> {
        self.tables.get(name).ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> DbResult<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Installs a new table from textual column declarations (`"name type"`)
    /// and a per-column constraint listing. In the listing, `primary_key`
    /// and `unique` stand alone while `foreign_key` consumes the following
    /// entry as its `parent_table.parent_column` target.
    pub fn create_table(
        &mut self,
        name: &str,
        column_decls: &[String],
        constraints: &HashMap<String, Vec<String>>,
    ) -> DbResult<()> {
        let name = fold_ident(name);
        if self.tables.contains_key(&name) {
            return Err(DbError::TableExists(name));
        }

        let constraints: HashMap<String, Vec<String>> = constraints
            .iter()
            .map(|(column, keywords)| (fold_ident(column), keywords.clone()))
            .collect();

        let mut table = Table::default();
        for decl in column_decls {
            let mut column = ColumnDef::parse_decl(decl)?;
            if let Some(keywords) = constraints.get(&column.name) {
                apply_constraints(&mut table, &mut column, keywords)?;
            }
            if column.has_constraint(Constraint::PrimaryKey) {
                if table.primary_key.is_some() {
                    return Err(DbError::MultiplePrimaryKeys);
                }
                table.primary_key = Some(column.name.clone());
            }
            table.columns.push(column);
        }

        self.tables.insert(name, table);
        Ok(())
    }

    /// Inserts a record under `key`, positionally coercing `values` against
    /// the column declaration order and enforcing the full constraint
    /// taxonomy. The index manager is notified inside the same mutation.
    pub fn insert(
        &mut self,
        indexes: &mut IndexManager,
        table_name: &str,
        key: &str,
        values: &[String],
    ) -> DbResult<()> {
        let table_name = fold_ident(table_name);
        let key = fold_key(key);
        let table = self.table(&table_name)?;

        if values.len() != table.columns.len() {
            return Err(DbError::ArityMismatch {
                expected: table.columns.len(),
                got: values.len(),
            });
        }

        let mut record = Record::new();
        for (column, raw) in table.columns.iter().zip(values) {
            let value = Value::coerce(raw, column.data_type, &column.name)?;

            if column.has_constraint(Constraint::PrimaryKey) && table.records.contains_key(&key) {
                return Err(DbError::PrimaryKeyViolation(key));
            }
            if column.has_constraint(Constraint::Unique) {
                let taken = table
                    .records
                    .values()
                    .any(|existing| existing.get(&column.name) == Some(&value));
                if taken {
                    return Err(DbError::UniqueViolation(column.name.clone()));
                }
            }
            if column.has_constraint(Constraint::ForeignKey) {
                self.check_foreign_key(table, &column.name, &value)?;
            }

            record.insert(column.name.clone(), value);
        }

        if table.records.contains_key(&key) {
            return Err(DbError::DuplicateKey(key));
        }

        indexes.add_record(&table_name, &key, &record);
        self.table_mut(&table_name)?.records.insert(key, record);
        Ok(())
    }

    /// Applies a field-to-value update to one record. Every field is
    /// validated before any is applied, so a refused update changes nothing.
    pub fn update(
        &mut self,
        indexes: &mut IndexManager,
        table_name: &str,
        key: &str,
        updates: &HashMap<String, String>,
    ) -> DbResult<()> {
        let table_name = fold_ident(table_name);
        let key = fold_key(key);
        let table = self.table(&table_name)?;
        if !table.records.contains_key(&key) {
            return Err(DbError::KeyNotFound(key));
        }

        let mut coerced: Vec<(String, Value)> = Vec::with_capacity(updates.len());
        for (field, raw) in updates {
            let field = fold_ident(field);
            let Some(column) = table.column(&field) else {
                return Err(DbError::ColumnNotFound { table: table_name, column: field });
            };
            if column.has_constraint(Constraint::PrimaryKey) {
                return Err(DbError::PrimaryKeyUpdate(field));
            }

            let value = Value::coerce(raw, column.data_type, &field)?;
            if column.has_constraint(Constraint::Unique) {
                let taken = table.records.iter().any(|(existing_key, existing)| {
                    existing_key != &key && existing.get(&field) == Some(&value)
                });
                if taken {
                    return Err(DbError::UniqueViolation(field));
                }
            }
            if column.has_constraint(Constraint::ForeignKey) {
                self.check_foreign_key(table, &field, &value)?;
            }
            coerced.push((field, value));
        }

        for (field, value) in &coerced {
            let old = self
                .table(&table_name)?
                .records
                .get(&key)
                .and_then(|record| record.get(field))
                .cloned();
            indexes.update_value(&table_name, field, &key, old.as_ref(), value);
        }
        let record = self
            .table_mut(&table_name)?
            .records
            .get_mut(&key)
            .ok_or_else(|| DbError::KeyNotFound(key.clone()))?;
        for (field, value) in coerced {
            record.insert(field, value);
        }
        Ok(())
    }

    /// Removes one record and its index postings.
    pub fn delete(
        &mut self,
        indexes: &mut IndexManager,
        table_name: &str,
        key: &str,
    ) -> DbResult<()> {
        let table_name = fold_ident(table_name);
        let key = fold_key(key);
        let table = self.table_mut(&table_name)?;
        let Some(record) = table.records.remove(&key) else {
            return Err(DbError::KeyNotFound(key));
        };
        indexes.remove_record(&table_name, &key, &record);
        Ok(())
    }

    pub fn get(&self, table_name: &str, key: &str) -> DbResult<&Record> {
        let table_name = fold_ident(table_name);
        let key = fold_key(key);
        self.table(&table_name)?
            .records
            .get(&key)
            .ok_or(DbError::KeyNotFound(key))
    }

    /// Removes a column from the schema and from every record, together
    /// with any dependent index, primary-key marker, or foreign-key entry.
    pub fn drop_column(
        &mut self,
        indexes: &mut IndexManager,
        table_name: &str,
        column: &str,
    ) -> DbResult<()> {
        let table_name = fold_ident(table_name);
        let column = fold_ident(column);
        let table = self.table_mut(&table_name)?;
        let Some(position) = table.column_index(&column) else {
            return Err(DbError::ColumnNotFound { table: table_name, column });
        };

        table.columns.remove(position);
        if table.primary_key.as_deref() == Some(column.as_str()) {
            table.primary_key = None;
        }
        table.foreign_keys.remove(&column);
        for record in table.records.values_mut() {
            record.remove(&column);
        }
        indexes.drop_column(&table_name, &column);
        Ok(())
    }

    /// Truncate: clears the records (and index postings) of a table while
    /// keeping its schema and index definitions.
    pub fn truncate_table(
        &mut self,
        indexes: &mut IndexManager,
        table_name: &str,
    ) -> DbResult<()> {
        let table_name = fold_ident(table_name);
        self.table_mut(&table_name)?.records.clear();
        indexes.truncate_table(&table_name);
        Ok(())
    }

    /// Removes a table entirely, destroying its indexes.
    pub fn drop_table(&mut self, indexes: &mut IndexManager, table_name: &str) -> DbResult<()> {
        let table_name = fold_ident(table_name);
        if self.tables.remove(&table_name).is_none() {
            return Err(DbError::TableNotFound(table_name));
        }
        indexes.drop_table(&table_name);
        Ok(())
    }

    /// Foreign-key check: the value's string form must exist as a record key
    /// in the parent table. The parent column in the target is syntactic.
    fn check_foreign_key(&self, table: &Table, column: &str, value: &Value) -> DbResult<()> {
        let Some(target) = table.foreign_keys.get(column) else {
            return Ok(());
        };
        let parent_table = target.split('.').next().unwrap_or(target);
        let exists = self
            .tables
            .get(parent_table)
            .is_some_and(|parent| parent.records.contains_key(&value.to_string()));
        if exists {
            Ok(())
        } else {
            Err(DbError::ForeignKeyViolation {
                value: value.to_string(),
                target: target.clone(),
            })
        }
    }
}

fn apply_constraints(
    table: &mut Table,
    column: &mut ColumnDef,
    keywords: &[String],
) -> DbResult<()> {
    let mut iter = keywords.iter();
    while let Some(keyword) = iter.next() {
        let keyword = fold_ident(keyword);
        let constraint = Constraint::from_keyword(&keyword)
            .ok_or_else(|| DbError::UnknownConstraint(keyword.clone()))?;
        if constraint == Constraint::ForeignKey {
            let target = iter
                .next()
                .map(|t| fold_ident(t))
                .filter(|t| t.contains('.'))
                .ok_or_else(|| DbError::MissingForeignKeyTarget(column.name.clone()))?;
            table.foreign_keys.insert(column.name.clone(), target);
        }
        if !column.constraints.contains(&constraint) {
            column.constraints.push(constraint);
        }
    }
    Ok(())
}
