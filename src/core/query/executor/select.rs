// src/core/query/executor/select.rs

use super::QueryExecutor;
use crate::core::common::error::{DbError, DbResult};
use crate::core::common::fold_ident;
use crate::core::query::Operator;
use crate::core::transaction::{LockMode, SCHEMA_KEY};
use crate::core::types::{Record, Value};
use std::collections::{BTreeMap, BTreeSet};

impl QueryExecutor {
    /// Every record of a table, sorted by key, under a schema read lock.
    pub fn select_all(
        &mut self,
        table: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<(String, Record)>> {
        let table = fold_ident(table);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, SCHEMA_KEY, LockMode::Read)?;
            let mut rows: Vec<(String, Record)> = exec
                .catalog
                .table(&table)?
                .records
                .iter()
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect();
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            exec.log(tx, "select_all", vec![table.clone()]);
            Ok(rows)
        })
    }

    /// Filtered scan: `column OP value`.
    ///
    /// The probe value is coerced to the column's declared type; a value the
    /// type cannot represent matches nothing. With an index on the column
    /// only the matching rows are read-locked; the fallback full scan locks
    /// every row it inspects.
    pub fn select_where(
        &mut self,
        table: &str,
        column: &str,
        operator: Operator,
        value: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<Record>> {
        let table = fold_ident(table);
        let column = fold_ident(column);
        self.with_transaction(txn_id, |exec, tx| {
            let stored = exec.catalog.table(&table)?;
            let Some(column_def) = stored.column(&column) else {
                return Err(DbError::ColumnNotFound {
                    table: table.clone(),
                    column: column.clone(),
                });
            };
            let data_type = column_def.data_type;

            let Ok(probe) = Value::coerce(value, data_type, &column) else {
                exec.log(tx, "select_where", vec![table.clone(), column.clone()]);
                return Ok(Vec::new());
            };

            let matching = match exec.indexes.lookup(&table, &column, operator, &probe) {
                Some(keys) => {
                    let mut matching = Vec::new();
                    for key in keys {
                        exec.acquire(tx, &table, &key, LockMode::Read)?;
                        if let Some(record) = exec.catalog.table(&table)?.records.get(&key) {
                            matching.push(record.clone());
                        }
                    }
                    matching
                }
                None => {
                    let mut keys: Vec<String> =
                        exec.catalog.table(&table)?.records.keys().cloned().collect();
                    keys.sort();
                    let mut matching = Vec::new();
                    for key in keys {
                        exec.acquire(tx, &table, &key, LockMode::Read)?;
                        let Some(record) = exec.catalog.table(&table)?.records.get(&key) else {
                            continue;
                        };
                        if record.get(&column).is_some_and(|v| operator.matches(v, &probe)) {
                            matching.push(record.clone());
                        }
                    }
                    matching
                }
            };

            exec.log(
                tx,
                "select_where",
                vec![table.clone(), column.clone(), operator.to_string(), value.to_string()],
            );
            Ok(matching)
        })
    }

    /// Groups records by a column and counts each group.
    pub fn group_by(
        &mut self,
        table: &str,
        group_column: &str,
        txn_id: Option<&str>,
    ) -> DbResult<BTreeMap<Value, usize>> {
        let table = fold_ident(table);
        let group_column = fold_ident(group_column);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, SCHEMA_KEY, LockMode::Read)?;
            let stored = exec.catalog.table(&table)?;
            if !stored.has_column(&group_column) {
                return Err(DbError::ColumnNotFound {
                    table: table.clone(),
                    column: group_column.clone(),
                });
            }

            let mut groups: BTreeMap<Value, usize> = BTreeMap::new();
            for record in stored.records.values() {
                if let Some(value) = record.get(&group_column) {
                    *groups.entry(value.clone()).or_insert(0) += 1;
                }
            }
            exec.log(tx, "group_by", vec![table.clone(), group_column.clone()]);
            Ok(groups)
        })
    }

    /// Group-by filtered on the group size: keeps groups whose
    /// `count OP threshold` holds. The threshold must be an integer.
    pub fn having(
        &mut self,
        table: &str,
        group_column: &str,
        operator: Operator,
        threshold: &str,
        txn_id: Option<&str>,
    ) -> DbResult<BTreeMap<Value, usize>> {
        let threshold: i64 = threshold.trim().parse().map_err(|_| DbError::InvalidValue {
            value: threshold.to_string(),
            column: "count(*)".to_string(),
            expected: "int",
        })?;

        let groups = self.group_by(table, group_column, txn_id)?;
        Ok(groups
            .into_iter()
            .filter(|(_, count)| operator.matches_count(*count as i64, threshold))
            .collect())
    }

    /// The distinct values of one column, in value order.
    pub fn distinct(
        &mut self,
        table: &str,
        column: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<Value>> {
        let table = fold_ident(table);
        let column = fold_ident(column);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, SCHEMA_KEY, LockMode::Read)?;
            let stored = exec.catalog.table(&table)?;
            if !stored.has_column(&column) {
                return Err(DbError::ColumnNotFound {
                    table: table.clone(),
                    column: column.clone(),
                });
            }

            let values: BTreeSet<Value> = stored
                .records
                .values()
                .filter_map(|record| record.get(&column).cloned())
                .collect();
            exec.log(tx, "distinct", vec![table.clone(), column.clone()]);
            Ok(values.into_iter().collect())
        })
    }

    /// Nested-loop inner join on `t1.c1 = t2.c2`, projecting `columns`.
    ///
    /// A projected column is taken from whichever side carries it; the
    /// second table wins when both do. Rows missing a join column are
    /// skipped.
    pub fn inner_join(
        &mut self,
        table1: &str,
        table2: &str,
        column1: &str,
        column2: &str,
        columns: &[String],
        txn_id: Option<&str>,
    ) -> DbResult<Vec<Record>> {
        let table1 = fold_ident(table1);
        let table2 = fold_ident(table2);
        let column1 = fold_ident(column1);
        let column2 = fold_ident(column2);
        let projected: Vec<String> = columns.iter().map(|c| fold_ident(c)).collect();

        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table1, SCHEMA_KEY, LockMode::Read)?;
            exec.acquire(tx, &table2, SCHEMA_KEY, LockMode::Read)?;
            let left = exec.catalog.table(&table1)?;
            let right = exec.catalog.table(&table2)?;

            let mut left_keys: Vec<&String> = left.records.keys().collect();
            left_keys.sort();
            let mut right_keys: Vec<&String> = right.records.keys().collect();
            right_keys.sort();

            let mut joined = Vec::new();
            for left_key in &left_keys {
                let left_record = &left.records[*left_key];
                let Some(left_value) = left_record.get(&column1) else { continue };
                for right_key in &right_keys {
                    let right_record = &right.records[*right_key];
                    if right_record.get(&column2) != Some(left_value) {
                        continue;
                    }
                    let mut row = Record::new();
                    for column in &projected {
                        if let Some(value) = left_record.get(column) {
                            row.insert(column.clone(), value.clone());
                        }
                        if let Some(value) = right_record.get(column) {
                            row.insert(column.clone(), value.clone());
                        }
                    }
                    joined.push(row);
                }
            }

            exec.log(
                tx,
                "inner_join",
                vec![table1.clone(), table2.clone(), column1.clone(), column2.clone()],
            );
            Ok(joined)
        })
    }

    /// Number of records in a table.
    pub fn count_records(&mut self, table: &str, txn_id: Option<&str>) -> DbResult<usize> {
        let table = fold_ident(table);
        self.with_transaction(txn_id, |exec, tx| {
            exec.acquire(tx, &table, SCHEMA_KEY, LockMode::Read)?;
            let count = exec.catalog.table(&table)?.records.len();
            exec.log(tx, "count_records", vec![table.clone()]);
            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn open_executor(dir: &tempfile::TempDir) -> QueryExecutor {
        QueryExecutor::open(dir.path().join("database.json"))
    }

    fn setup(executor: &mut QueryExecutor) {
        executor
            .create_table(
                "students",
                &["id int".to_string(), "name string".to_string(), "age int".to_string()],
                &HashMap::new(),
                None,
            )
            .unwrap();
        for (key, name, age) in
            [("1", "John", "20"), ("2", "Alice", "20"), ("3", "Bob", "22")]
        {
            executor
                .insert(
                    "students",
                    key,
                    &[key.to_string(), name.to_string(), age.to_string()],
                    None,
                )
                .unwrap();
        }
    }

    #[test]
    fn select_where_scans_without_an_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let rows = executor
            .select_where("students", "age", Operator::Eq, "20", None)
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = executor
            .select_where("students", "age", Operator::Gt, "20", None)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::Str("Bob".into()));
    }

    #[test]
    fn select_where_uses_the_index_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);
        executor.create_index("students", "age", None).unwrap();

        let rows = executor
            .select_where("students", "age", Operator::Le, "20", None)
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn unparsable_probe_on_numeric_column_matches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let rows = executor
            .select_where("students", "age", Operator::Eq, "twenty", None)
            .unwrap();
        assert!(rows.is_empty());

        executor.create_index("students", "age", None).unwrap();
        let rows = executor
            .select_where("students", "age", Operator::Gt, "twenty", None)
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn group_by_counts_each_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let groups = executor.group_by("students", "age", None).unwrap();
        assert_eq!(groups.get(&Value::Int(20)), Some(&2));
        assert_eq!(groups.get(&Value::Int(22)), Some(&1));
    }

    #[test]
    fn having_filters_on_group_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let groups = executor.having("students", "age", Operator::Gt, "1", None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get(&Value::Int(20)), Some(&2));

        assert!(matches!(
            executor.having("students", "age", Operator::Gt, "many", None),
            Err(DbError::InvalidValue { .. })
        ));
    }

    #[test]
    fn distinct_deduplicates_in_value_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let values = executor.distinct("students", "age", None).unwrap();
        assert_eq!(values, vec![Value::Int(20), Value::Int(22)]);
    }

    #[test]
    fn inner_join_matches_on_equality() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);
        executor
            .create_table(
                "grades",
                &["student_id int".to_string(), "grade string".to_string()],
                &HashMap::new(),
                None,
            )
            .unwrap();
        executor
            .insert("grades", "g1", &["1".to_string(), "A".to_string()], None)
            .unwrap();
        executor
            .insert("grades", "g2", &["3".to_string(), "B".to_string()], None)
            .unwrap();

        let rows = executor
            .inner_join(
                "students",
                "grades",
                "id",
                "student_id",
                &["name".to_string(), "grade".to_string()],
                None,
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], Value::Str("John".into()));
        assert_eq!(rows[0]["grade"], Value::Str("A".into()));
        assert_eq!(rows[1]["name"], Value::Str("Bob".into()));
    }

    #[test]
    fn select_all_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut executor = open_executor(&dir);
        setup(&mut executor);

        let rows = executor.select_all("students", None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "1");
        assert_eq!(executor.count_records("students", None).unwrap(), 3);
    }
}
