// src/api/mod.rs

use crate::core::common::error::DbResult;
use crate::core::config::Config;
use crate::core::query::executor::QueryExecutor;
use crate::core::query::Operator;
use crate::core::sql;
use crate::core::types::{ColumnDef, Record, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// `Database` is the primary structure providing the public API for the
/// engine.
///
/// It wraps a [`QueryExecutor`] behind a mutex, so a single `Database` (or
/// an `Arc<Database>`) may be shared freely between threads: every operation
/// is serialized on the mutex, while the logical reader/writer locks inside
/// provide isolation *between transactions*. Lock acquisition never blocks -
/// a refused lock surfaces as a retryable error.
///
/// Every operation takes an optional transaction id. With `Some(id)` the
/// operation joins that explicit transaction and the transaction stays open
/// afterwards, whatever the outcome. With `None` the engine fabricates an
/// implicit transaction around the single operation, committing on success
/// (which flushes the snapshot file) and rolling back on failure.
#[derive(Debug)]
pub struct Database {
    executor: Mutex<QueryExecutor>,
}

impl Database {
    /// Opens a database against the given snapshot file, loading whatever
    /// state the file holds. A missing file starts the database empty; a
    /// malformed one starts empty with a logged warning.
    pub fn open(snapshot_path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Database {
            executor: Mutex::new(QueryExecutor::open(snapshot_path.as_ref().to_path_buf())),
        })
    }

    /// Opens a database using an explicit [`Config`].
    pub fn with_config(config: Config) -> DbResult<Self> {
        Self::open(PathBuf::from(config.database_file_path))
    }

    /// Opens a database from a TOML configuration file. A missing file
    /// falls back to the default configuration.
    pub fn from_config_file(config_path: impl AsRef<Path>) -> DbResult<Self> {
        Self::with_config(Config::load_from_file(config_path.as_ref())?)
    }

    fn lock(&self) -> MutexGuard<'_, QueryExecutor> {
        // A poisoned mutex means another thread panicked mid-operation;
        // the engine state itself is still structurally sound.
        self.executor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Transactions ---

    /// Starts an explicit transaction. Fails if the id was ever used.
    pub fn begin_transaction(&self, txn_id: &str) -> DbResult<()> {
        self.lock().begin_transaction(txn_id)
    }

    /// Commits an explicit transaction, releasing its locks and flushing
    /// the snapshot file.
    pub fn commit_transaction(&self, txn_id: &str) -> DbResult<()> {
        self.lock().commit_transaction(txn_id)
    }

    /// Rolls an explicit transaction back, restoring the catalog and index
    /// state captured when it began.
    pub fn rollback_transaction(&self, txn_id: &str) -> DbResult<()> {
        self.lock().rollback_transaction(txn_id)
    }

    pub fn is_transaction_active(&self, txn_id: &str) -> bool {
        self.lock().is_transaction_active(txn_id)
    }

    // --- Schema ---

    /// Creates a table.
    ///
    /// # Arguments
    /// * `name` - the table name (case-folded).
    /// * `columns` - textual declarations, one `"name type"` per column;
    ///   declaration order is the positional order for [`Self::insert`].
    /// * `constraints` - per-column constraint keywords; `primary_key` and
    ///   `unique` stand alone, `foreign_key` is followed by its
    ///   `"parent_table.parent_column"` target in the same list.
    pub fn create_table(
        &self,
        name: &str,
        columns: &[&str],
        constraints: &HashMap<String, Vec<String>>,
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let columns: Vec<String> = columns.iter().map(ToString::to_string).collect();
        self.lock().create_table(name, &columns, constraints, txn_id)
    }

    /// Drops a table and destroys its indexes.
    pub fn drop_table(&self, name: &str, txn_id: Option<&str>) -> DbResult<()> {
        self.lock().drop_table(name, txn_id)
    }

    /// Deletes every record of a table, keeping its schema.
    pub fn delete_table(&self, name: &str, txn_id: Option<&str>) -> DbResult<()> {
        self.lock().delete_table(name, txn_id)
    }

    /// Removes a column from the schema and from every record, dropping any
    /// index on it.
    pub fn drop_column(&self, table: &str, column: &str, txn_id: Option<&str>) -> DbResult<()> {
        self.lock().drop_column(table, column, txn_id)
    }

    /// The column definitions of a table.
    pub fn get_table_columns(
        &self,
        table: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<ColumnDef>> {
        self.lock().get_table_columns(table, txn_id)
    }

    // --- Records ---

    /// Inserts a record under an external string key. Values are matched
    /// positionally against the column declaration order and coerced to the
    /// declared types.
    ///
    /// # Errors
    /// The full taxonomy: unknown table, arity mismatch, coercion failure,
    /// primary-key duplicate, unique violation, foreign-key violation, or a
    /// key that already exists.
    pub fn insert(
        &self,
        table: &str,
        key: &str,
        values: &[&str],
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        let values: Vec<String> = values.iter().map(ToString::to_string).collect();
        self.lock().insert(table, key, &values, txn_id)
    }

    /// Fetches the record stored under `key`.
    pub fn get(&self, table: &str, key: &str, txn_id: Option<&str>) -> DbResult<Record> {
        self.lock().get(table, key, txn_id)
    }

    /// Updates named fields of one record. Textual values are coerced per
    /// the column types; primary-key fields refuse updates.
    pub fn update(
        &self,
        table: &str,
        key: &str,
        updates: &HashMap<String, String>,
        txn_id: Option<&str>,
    ) -> DbResult<()> {
        self.lock().update(table, key, updates, txn_id)
    }

    /// Deletes the record stored under `key`.
    pub fn delete(&self, table: &str, key: &str, txn_id: Option<&str>) -> DbResult<()> {
        self.lock().delete(table, key, txn_id)
    }

    /// Projects named columns out of one record.
    pub fn select_columns(
        &self,
        table: &str,
        columns: &[&str],
        key: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Record> {
        let columns: Vec<String> = columns.iter().map(ToString::to_string).collect();
        self.lock().select_columns(table, &columns, key, txn_id)
    }

    // --- Queries ---

    /// Every record of a table, sorted by key.
    pub fn select_all(
        &self,
        table: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<(String, Record)>> {
        self.lock().select_all(table, txn_id)
    }

    /// Filtered scan `column OP value` with `OP` one of `= > < >= <= <>`.
    /// Uses the column's index when one exists.
    pub fn select_where(
        &self,
        table: &str,
        column: &str,
        operator: &str,
        value: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<Record>> {
        let operator = Operator::parse(operator)?;
        self.lock().select_where(table, column, operator, value, txn_id)
    }

    /// Group sizes per distinct value of `group_column`.
    pub fn group_by(
        &self,
        table: &str,
        group_column: &str,
        txn_id: Option<&str>,
    ) -> DbResult<BTreeMap<Value, usize>> {
        self.lock().group_by(table, group_column, txn_id)
    }

    /// Group-by filtered on group size: keeps groups with
    /// `count OP threshold`.
    pub fn having(
        &self,
        table: &str,
        group_column: &str,
        operator: &str,
        threshold: &str,
        txn_id: Option<&str>,
    ) -> DbResult<BTreeMap<Value, usize>> {
        let operator = Operator::parse(operator)?;
        self.lock().having(table, group_column, operator, threshold, txn_id)
    }

    /// The distinct values of a column.
    pub fn distinct(
        &self,
        table: &str,
        column: &str,
        txn_id: Option<&str>,
    ) -> DbResult<Vec<Value>> {
        self.lock().distinct(table, column, txn_id)
    }

    /// Inner join on `table1.column1 = table2.column2`, projecting
    /// `columns` from whichever side carries them (the second table wins on
    /// a name collision).
    pub fn inner_join(
        &self,
        table1: &str,
        table2: &str,
        column1: &str,
        column2: &str,
        columns: &[&str],
        txn_id: Option<&str>,
    ) -> DbResult<Vec<Record>> {
        let columns: Vec<String> = columns.iter().map(ToString::to_string).collect();
        self.lock().inner_join(table1, table2, column1, column2, &columns, txn_id)
    }

    /// Number of records in a table.
    pub fn count_records(&self, table: &str, txn_id: Option<&str>) -> DbResult<usize> {
        self.lock().count_records(table, txn_id)
    }

    // --- Indexes ---

    /// Creates a secondary index on `table.column`, backfilled from the
    /// existing records.
    pub fn create_index(&self, table: &str, column: &str, txn_id: Option<&str>) -> DbResult<()> {
        self.lock().create_index(table, column, txn_id)
    }

    /// Drops the index on `table.column`.
    pub fn drop_index(&self, table: &str, column: &str, txn_id: Option<&str>) -> DbResult<()> {
        self.lock().drop_index(table, column, txn_id)
    }

    pub fn has_index(&self, table: &str, column: &str) -> bool {
        self.lock().has_index(table, column)
    }

    /// Every index as `"table.column"`.
    pub fn list_indexes(&self) -> Vec<String> {
        self.lock().list_indexes()
    }

    // --- SQL front-end ---

    /// Executes one SQL-subset statement, returning rendered text.
    ///
    /// The accepted grammar is the anchored, case-insensitive statement set
    /// documented in [`crate::core::sql`]; the front-end performs no
    /// validation beyond shape - typing, constraints, and locking are the
    /// engine's business.
    ///
    /// ```rust
    /// use ferrobase::api::Database;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let db = Database::open(dir.path().join("database.json")).unwrap();
    ///
    /// db.execute_sql(
    ///     "CREATE TABLE students (id int, name string) CONSTRAINTS (id primary_key)",
    ///     None,
    /// )
    /// .unwrap();
    /// db.execute_sql("INSERT INTO students VALUES (1, \"John\")", None).unwrap();
    ///
    /// let out = db.execute_sql("SELECT * FROM students WHERE id=1", None).unwrap();
    /// assert!(out.contains("John"));
    /// ```
    pub fn execute_sql(&self, statement: &str, txn_id: Option<&str>) -> DbResult<String> {
        sql::execute(self, statement, txn_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::common::error::DbError;
    use std::sync::Arc;
    use std::thread;

    fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::open(dir.path().join("database.json")).unwrap()
    }

    fn students(db: &Database) {
        let constraints =
            HashMap::from([("id".to_string(), vec!["primary_key".to_string()])]);
        db.create_table("students", &["id int", "name string"], &constraints, None).unwrap();
    }

    #[test]
    fn uncommitted_rows_are_invisible_to_other_threads() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(open_db(&dir));
        students(&db);

        db.begin_transaction("tx1").unwrap();
        db.insert("students", "3", &["3", "Carol"], Some("tx1")).unwrap();

        // A reader on a second thread is refused the row lock.
        let reader = {
            let db = Arc::clone(&db);
            thread::spawn(move || db.get("students", "3", None))
        };
        let err = reader.join().unwrap().unwrap_err();
        assert!(err.is_lock_refused());

        db.rollback_transaction("tx1").unwrap();
        assert!(matches!(
            db.get("students", "3", None),
            Err(DbError::KeyNotFound(_))
        ));
    }

    #[test]
    fn concurrent_implicit_writers_settle_on_one_state() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(open_db(&dir));
        students(&db);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    let key = i.to_string();
                    db.insert("students", &key, &[key.as_str(), "X"], None)
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(db.count_records("students", None).unwrap(), 8);
    }
}
