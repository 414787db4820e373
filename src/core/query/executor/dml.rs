// src/core/query/executor/dml.rs

use super::QueryExecutor;
use crate::core::common::error::DbResult;
use crate::core::common::{fold_ident, fold_key};
use crate::core::transaction::LockMode;
use crate::core::types::Record;
use std::collections::HashMap;

impl QueryExecutor {
    /// Inserts a record under `key`, matching `values` positionally against
    /// the column declaration order.
    pub fn insert(
        &mut self,
        table: &str,
        key: &str,
        values: &[String],
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let table = fold_ident(table);
        let key = fold_key(key);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, &key, LockMode::Write)?;
            exec.catalog.insert(&mut exec.indexes, &table, &key, values)?;
            exec.log(tx, "insert", vec![table.clone(), key.clone(), format!("{values:?}")]);
            Ok(())
        })
    }

    /// Point lookup by record key.
    pub fn get(&mut self, table: &str, key: &str, txn_id: Option<&str>) -> DbResult<Record> {
        let table = fold_ident(table);
        let key = fold_key(key);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, &key, LockMode::Read)?;
            let record = exec.catalog.get(&table, &key)?.clone();
            exec.log(tx, "get", vec![table.clone(), key.clone()]);
            Ok(record)
        })
    }

    /// Applies a field-to-textual-value map to one record; values are
    /// coerced per the column type, and primary-key fields refuse updates.
    pub fn update(
        &mut self,
        table: &str,
        key: &str,
        updates: &HashMap<String, String>,
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let table = fold_ident(table);
        let key = fold_key(key);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, &key, LockMode::Write)?;
            exec.catalog.update(&mut exec.indexes, &table, &key, updates)?;
            exec.log(tx, "update", vec![table.clone(), key.clone(), format!("{updates:?}")]);
            Ok(())
        })
    }

    /// Deletes one record, maintaining every index of the table.
    pub fn delete(&mut self, table: &str, key: &str, txn_id: Option<&str>) -> DbResult<()> {
        let table = fold_ident(table);
        let key = fold_key(key);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, &key, LockMode::Write)?;
            exec.catalog.delete(&mut exec.indexes, &table, &key)?;
            exec.log(tx, "delete", vec![table.clone(), key.clone()]);
            Ok(())
        })
    }

    /// Projects named columns out of one record. Columns absent from the
    /// record (for instance after `drop_column`) are omitted.
    pub fn select_columns(
        &mut self,
        table: &str,
        columns: &[String],
        key: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Record> {
        let table = fold_ident(table);
        let key = fold_key(key);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, &key, LockMode::Read)?;
            let record = exec.catalog.get(&table, &key)?;
            let projected: Record = columns
                .iter()
                .map(|column| fold_ident(column))
                .filter_map(|column| {
                    record.get(&column).map(|value| (column.clone(), value.clone()))
                })
                .collect();
            exec.log(
                tx,
                "select_columns",
                vec![table.clone(), format!("{columns:?}"), key.clone()],
            );
            Ok(projected)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::common::error::DbError;
    use crate::core::types::Value;

    fn open_executor(dir: &tempfile::TempDir) -> QueryExecutor {
        QueryExecutor::open(dir.path().join("database.json"))
    }

    fn setup(executor: &mut QueryExecutor) {
        let constraints =
            HashMap::from([("id".to_string(), vec!["primary_key".to_string()])]);
        executor
            .create_table(
                "students",
                &["id int".to_string(), "name string".to_string(), "age int".to_string()],
                &constraints,
                None,
            )
            .unwrap();
        executor
            .insert(
                "students",
                "1",
                &["1".to_string(), "John".to_string(), "20".to_string()],
                None,
            )
            .unwrap();
    }

    #[test]
    fn insert_then_get_round_trips_coerced_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let record = executor.get("students", "1", None).unwrap();
        assert_eq!(record["id"], Value::Int(1));
        assert_eq!(record["name"], Value::Str("John".into()));
        assert_eq!(record["age"], Value::Int(20));
    }

    #[test]
    fn keys_and_identifiers_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let record = executor.get(" STUDENTS ", " 1 ", None).unwrap();
        assert_eq!(record["id"], Value::Int(1));
    }

    #[test]
    fn duplicate_key_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        // The primary-key column reports the duplicate before the plain
        // key-exists check does.
        let err = executor
            .insert(
                "students",
                "1",
                &["1".to_string(), "Jane".to_string(), "21".to_string()],
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DbError::PrimaryKeyViolation(_)));
    }

    #[test]
    fn update_changes_fields_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let change = HashMap::from([("name".to_string(), "Johnny".to_string())]);
        executor.update("students", "1", &change, None).unwrap();
        let record = executor.get("students", "1", None).unwrap();
        assert_eq!(record["name"], Value::Str("Johnny".into()));
    }

    #[test]
    fn delete_then_get_reports_key_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        executor.delete("students", "1", None).unwrap();
        assert!(matches!(
            executor.get("students", "1", None),
            Err(DbError::KeyNotFound(_))
        ));
    }

    #[test]
    fn select_columns_projects_known_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let projected = executor
            .select_columns(
                "students",
                &["name".to_string(), "ghost".to_string()],
                "1",
                None,
            )
            .unwrap();
        assert_eq!(projected.len(), 1);
        assert_eq!(projected["name"], Value::Str("John".into()));
    }
}
