// src/core/sql/mod.rs

//! SQL-subset text front-end.
//!
//! A thin, regex-driven layer that lowers statements onto the typed engine
//! API. Each statement is an anchored, case-insensitive pattern; anything
//! that matches no pattern is a syntax error. The front-end validates shape
//! only - typing, constraints, and locking stay in the engine.
//!
//! Accepted statements:
//!
//! ```text
//! CREATE TABLE t (col type, ...) CONSTRAINTS (col kw, ...)
//! INSERT INTO t VALUES (v, ...)          -- first value is also the row key
//! SELECT * FROM t WHERE id=<int>
//! SELECT c, ... FROM t WHERE id=<int>
//! SELECT * FROM t WHERE col OP <int|"str">   -- OP in = > < >= <= <>
//! SELECT * FROM t
//! UPDATE t SET col=val, ... WHERE id=<int>
//! DELETE FROM t WHERE id=<int>
//! DELETE TABLE t                          -- truncate
//! DROP TABLE t
//! COUNT t
//! SELECT c, COUNT(*) FROM t GROUP BY g
//! SELECT c, COUNT(*) FROM t GROUP BY g HAVING COUNT(*) OP <int>
//! SELECT DISTINCT c FROM t
//! ALTER TABLE t DROP COLUMN c
//! ```

use crate::api::Database;
use crate::core::common::error::{DbError, DbResult};
use crate::core::types::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// One parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        table: String,
        columns: Vec<String>,
        constraints: HashMap<String, Vec<String>>,
    },
    Insert { table: String, values: Vec<String> },
    SelectByKey { table: String, key: String },
    SelectColumns { table: String, columns: Vec<String>, key: String },
    SelectWhere { table: String, column: String, operator: String, value: String },
    SelectAll { table: String },
    Update { table: String, key: String, updates: HashMap<String, String> },
    DeleteRow { table: String, key: String },
    Truncate { table: String },
    DropTable { table: String },
    Count { table: String },
    GroupBy { table: String, group: String },
    Having { table: String, group: String, operator: String, threshold: String },
    Distinct { table: String, column: String },
    DropColumn { table: String, column: String },
}

macro_rules! anchored {
    ($name:ident, $pattern:literal) => {
        #[allow(clippy::unwrap_used)]
        static $name: Lazy<Regex> = Lazy::new(|| {
            Regex::new(concat!("(?i)^", $pattern, "$")).unwrap()
        });
    };
}

anchored!(CREATE_RE, r"CREATE TABLE (\w+) \((.+)\) CONSTRAINTS \((.+)\)");
anchored!(INSERT_RE, r"INSERT INTO (\w+) VALUES \((.+)\)");
anchored!(DELETE_ROW_RE, r"DELETE FROM (\w+) WHERE id=(\d+)");
anchored!(UPDATE_RE, r"UPDATE (\w+) SET (.+) WHERE id=(\d+)");
anchored!(SELECT_KEY_RE, r"SELECT \* FROM (\w+) WHERE id=(\d+)");
anchored!(TRUNCATE_RE, r"DELETE TABLE (\w+)");
anchored!(SELECT_ALL_RE, r"SELECT \* FROM (\w+)");
anchored!(DROP_TABLE_RE, r"DROP TABLE (\w+)");
anchored!(COUNT_RE, r"COUNT (\w+)");
anchored!(SELECT_COLUMNS_RE, r"SELECT (.+) FROM (\w+) WHERE id=(\d+)");
anchored!(
    SELECT_WHERE_RE,
    r#"SELECT \* FROM (\w+) WHERE (\w+)\s*(>=|<=|<>|=|>|<)\s*(\d+|"[^"]*")"#
);
anchored!(GROUP_BY_RE, r"SELECT (\w+), COUNT\(\*\) FROM (\w+) GROUP BY (\w+)");
anchored!(
    HAVING_RE,
    r"SELECT (\w+), COUNT\(\*\) FROM (\w+) GROUP BY (\w+) HAVING COUNT\(\*\)\s*(>=|<=|<>|=|>|<)\s*(\d+)"
);
anchored!(DISTINCT_RE, r"SELECT DISTINCT (\w+) FROM (\w+)");
anchored!(ALTER_DROP_RE, r"ALTER TABLE (\w+) DROP COLUMN (\w+)");

#[allow(clippy::unwrap_used)]
static VALUE_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)"|'([^']*)'|([^,\s]+)"#).unwrap());

#[allow(clippy::unwrap_used)]
static SET_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(\w+)\s*=\s*("[^"]*"|'[^']*'|\d+|true|false)"#).unwrap());

impl Statement {
    /// Parses one statement, trying each pattern in turn.
    pub fn parse(raw: &str) -> DbResult<Self> {
        let raw = raw.trim();

        if let Some(caps) = CREATE_RE.captures(raw) {
            return Ok(Statement::CreateTable {
                table: caps[1].to_string(),
                columns: caps[2].split(',').map(|c| c.trim().to_string()).collect(),
                constraints: parse_constraints(&caps[3]),
            });
        }
        if let Some(caps) = INSERT_RE.captures(raw) {
            return Ok(Statement::Insert {
                table: caps[1].to_string(),
                values: parse_value_list(&caps[2]),
            });
        }
        if let Some(caps) = DELETE_ROW_RE.captures(raw) {
            return Ok(Statement::DeleteRow {
                table: caps[1].to_string(),
                key: caps[2].to_string(),
            });
        }
        if let Some(caps) = UPDATE_RE.captures(raw) {
            return Ok(Statement::Update {
                table: caps[1].to_string(),
                updates: parse_set_pairs(&caps[2]),
                key: caps[3].to_string(),
            });
        }
        if let Some(caps) = SELECT_KEY_RE.captures(raw) {
            return Ok(Statement::SelectByKey {
                table: caps[1].to_string(),
                key: caps[2].to_string(),
            });
        }
        if let Some(caps) = SELECT_WHERE_RE.captures(raw) {
            return Ok(Statement::SelectWhere {
                table: caps[1].to_string(),
                column: caps[2].to_string(),
                operator: caps[3].to_string(),
                value: caps[4].trim_matches('"').to_string(),
            });
        }
        if let Some(caps) = HAVING_RE.captures(raw) {
            return Ok(Statement::Having {
                table: caps[2].to_string(),
                group: caps[3].to_string(),
                operator: caps[4].to_string(),
                threshold: caps[5].to_string(),
            });
        }
        if let Some(caps) = GROUP_BY_RE.captures(raw) {
            return Ok(Statement::GroupBy {
                table: caps[2].to_string(),
                group: caps[3].to_string(),
            });
        }
        if let Some(caps) = DISTINCT_RE.captures(raw) {
            return Ok(Statement::Distinct {
                column: caps[1].to_string(),
                table: caps[2].to_string(),
            });
        }
        if let Some(caps) = SELECT_COLUMNS_RE.captures(raw) {
            return Ok(Statement::SelectColumns {
                columns: caps[1].split(',').map(|c| c.trim().to_string()).collect(),
                table: caps[2].to_string(),
                key: caps[3].to_string(),
            });
        }
        if let Some(caps) = SELECT_ALL_RE.captures(raw) {
            return Ok(Statement::SelectAll { table: caps[1].to_string() });
        }
        if let Some(caps) = TRUNCATE_RE.captures(raw) {
            return Ok(Statement::Truncate { table: caps[1].to_string() });
        }
        if let Some(caps) = DROP_TABLE_RE.captures(raw) {
            return Ok(Statement::DropTable { table: caps[1].to_string() });
        }
        if let Some(caps) = COUNT_RE.captures(raw) {
            return Ok(Statement::Count { table: caps[1].to_string() });
        }
        if let Some(caps) = ALTER_DROP_RE.captures(raw) {
            return Ok(Statement::DropColumn {
                table: caps[1].to_string(),
                column: caps[2].to_string(),
            });
        }

        Err(DbError::SqlSyntax(raw.to_string()))
    }
}

/// `col kw` pairs, comma-separated. A `foreign_key` keyword may be followed
/// by its `parent_table.parent_column` target as a third token.
fn parse_constraints(raw: &str) -> HashMap<String, Vec<String>> {
    let mut constraints: HashMap<String, Vec<String>> = HashMap::new();
    for entry in raw.split(',') {
        let tokens: Vec<&str> = entry.split_whitespace().collect();
        match tokens.as_slice() {
            [column, keyword] => {
                constraints
                    .entry((*column).to_string())
                    .or_default()
                    .push((*keyword).to_string());
            }
            [column, keyword, target] => {
                let list = constraints.entry((*column).to_string()).or_default();
                list.push((*keyword).to_string());
                list.push((*target).to_string());
            }
            _ => {}
        }
    }
    constraints
}

/// Comma-separated values, honoring single or double quotes.
fn parse_value_list(raw: &str) -> Vec<String> {
    VALUE_LIST_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .or_else(|| caps.get(3).map(|m| m.as_str().trim().to_string()))
        })
        .filter(|v| !v.is_empty())
        .collect()
}

/// `col=val` pairs out of an UPDATE's SET clause; quotes are stripped, the
/// engine coerces the rest.
fn parse_set_pairs(raw: &str) -> HashMap<String, String> {
    SET_PAIR_RE
        .captures_iter(raw)
        .map(|caps| {
            let value = caps[2].trim_matches(|c| c == '"' || c == '\'').to_string();
            (caps[1].to_string(), value)
        })
        .collect()
}

/// Parses and runs one statement against the engine, rendering the result
/// as display text.
pub fn execute(db: &Database, raw: &str, txn_id: Option<&str>) -> DbResult<String> {
    match Statement::parse(raw)? {
        Statement::CreateTable { table, columns, constraints } => {
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            db.create_table(&table, &columns, &constraints, txn_id)?;
            Ok(format!("Table '{}' created successfully.", table.to_lowercase()))
        }
        Statement::Insert { table, values } => {
            let Some(key) = values.first().cloned() else {
                return Err(DbError::SqlSyntax(raw.trim().to_string()));
            };
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            db.insert(&table, &key, &values, txn_id)?;
            Ok("Inserted successfully!".to_string())
        }
        Statement::SelectByKey { table, key } => {
            let record = db.get(&table, &key, txn_id)?;
            Ok(render_record(&record))
        }
        Statement::SelectColumns { table, columns, key } => {
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            let record = db.select_columns(&table, &columns, &key, txn_id)?;
            Ok(render_record(&record))
        }
        Statement::SelectWhere { table, column, operator, value } => {
            let rows = db.select_where(&table, &column, &operator, &value, txn_id)?;
            if rows.is_empty() {
                return Ok("No matching records!".to_string());
            }
            Ok(rows.iter().map(render_record).collect::<Vec<_>>().join("\n"))
        }
        Statement::SelectAll { table } => {
            let rows = db.select_all(&table, txn_id)?;
            if rows.is_empty() {
                return Ok(format!("No records found in table '{}'!", table.to_lowercase()));
            }
            let mut out = format!("Records in '{}':", table.to_lowercase());
            for (key, record) in rows {
                out.push_str(&format!("\nKey: {key}, {}", render_record(&record)));
            }
            Ok(out)
        }
        Statement::Update { table, key, updates } => {
            db.update(&table, &key, &updates, txn_id)?;
            Ok("Updated successfully!".to_string())
        }
        Statement::DeleteRow { table, key } => {
            db.delete(&table, &key, txn_id)?;
            Ok("Deleted successfully!".to_string())
        }
        Statement::Truncate { table } => {
            db.delete_table(&table, txn_id)?;
            Ok(format!("All records deleted from table '{}'.", table.to_lowercase()))
        }
        Statement::DropTable { table } => {
            db.drop_table(&table, txn_id)?;
            Ok(format!("Table '{}' dropped successfully.", table.to_lowercase()))
        }
        Statement::Count { table } => {
            let count = db.count_records(&table, txn_id)?;
            Ok(format!("Total records in '{}': {count}", table.to_lowercase()))
        }
        Statement::GroupBy { table, group } => {
            let groups = db.group_by(&table, &group, txn_id)?;
            Ok(groups
                .iter()
                .map(|(value, count)| format!("{value}: {count}"))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Statement::Having { table, group, operator, threshold } => {
            let groups = db.having(&table, &group, &operator, &threshold, txn_id)?;
            Ok(groups
                .iter()
                .map(|(value, count)| format!("{value}: {count}"))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Statement::Distinct { table, column } => {
            let values = db.distinct(&table, &column, txn_id)?;
            Ok(values.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))
        }
        Statement::DropColumn { table, column } => {
            db.drop_column(&table, &column, txn_id)?;
            Ok(format!(
                "Column '{}' dropped from table '{}'.",
                column.to_lowercase(),
                table.to_lowercase()
            ))
        }
    }
}

/// `field: value` pairs in field-name order.
fn render_record(record: &Record) -> String {
    let mut fields: Vec<(&String, String)> =
        record.iter().map(|(name, value)| (name, value.to_string())).collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    fields
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_constraints() {
        let statement = Statement::parse(
            "CREATE TABLE students (id int, name string) CONSTRAINTS (id primary_key, name unique)",
        )
        .unwrap();
        let Statement::CreateTable { table, columns, constraints } = statement else {
            panic!("wrong statement");
        };
        assert_eq!(table, "students");
        assert_eq!(columns, vec!["id int", "name string"]);
        assert_eq!(constraints["id"], vec!["primary_key"]);
        assert_eq!(constraints["name"], vec!["unique"]);
    }

    #[test]
    fn parses_foreign_key_targets() {
        let statement = Statement::parse(
            "CREATE TABLE students (id int, class_id int) CONSTRAINTS (id primary_key, class_id foreign_key classes.id)",
        )
        .unwrap();
        let Statement::CreateTable { constraints, .. } = statement else {
            panic!("wrong statement");
        };
        assert_eq!(constraints["class_id"], vec!["foreign_key", "classes.id"]);
    }

    #[test]
    fn parses_insert_value_lists_with_quotes() {
        let statement =
            Statement::parse("INSERT INTO students VALUES (1, \"John Doe\", 'x', 3.5)").unwrap();
        let Statement::Insert { values, .. } = statement else { panic!("wrong statement") };
        assert_eq!(values, vec!["1", "John Doe", "x", "3.5"]);
    }

    #[test]
    fn parses_all_select_shapes() {
        assert!(matches!(
            Statement::parse("SELECT * FROM students WHERE id=1").unwrap(),
            Statement::SelectByKey { .. }
        ));
        assert!(matches!(
            Statement::parse("SELECT name, age FROM students WHERE id=1").unwrap(),
            Statement::SelectColumns { .. }
        ));
        assert!(matches!(
            Statement::parse("SELECT * FROM students WHERE age >= 20").unwrap(),
            Statement::SelectWhere { .. }
        ));
        assert!(matches!(
            Statement::parse("SELECT * FROM students WHERE name = \"John\"").unwrap(),
            Statement::SelectWhere { .. }
        ));
        assert!(matches!(
            Statement::parse("SELECT * FROM students").unwrap(),
            Statement::SelectAll { .. }
        ));
        assert!(matches!(
            Statement::parse("SELECT DISTINCT age FROM students").unwrap(),
            Statement::Distinct { .. }
        ));
    }

    #[test]
    fn parses_grouping_statements() {
        let statement =
            Statement::parse("SELECT age, COUNT(*) FROM students GROUP BY age").unwrap();
        assert!(matches!(statement, Statement::GroupBy { .. }));

        let statement = Statement::parse(
            "SELECT age, COUNT(*) FROM students GROUP BY age HAVING COUNT(*) > 1",
        )
        .unwrap();
        let Statement::Having { operator, threshold, .. } = statement else {
            panic!("wrong statement");
        };
        assert_eq!(operator, ">");
        assert_eq!(threshold, "1");
    }

    #[test]
    fn parses_update_set_pairs() {
        let statement =
            Statement::parse("UPDATE students SET name=\"Johnny\", age=21 WHERE id=1").unwrap();
        let Statement::Update { updates, key, .. } = statement else {
            panic!("wrong statement");
        };
        assert_eq!(key, "1");
        assert_eq!(updates["name"], "Johnny");
        assert_eq!(updates["age"], "21");
    }

    #[test]
    fn statements_are_case_insensitive() {
        assert!(matches!(
            Statement::parse("select * from students").unwrap(),
            Statement::SelectAll { .. }
        ));
        assert!(matches!(
            Statement::parse("drop table students").unwrap(),
            Statement::DropTable { .. }
        ));
    }

    #[test]
    fn ddl_and_misc_statements() {
        assert!(matches!(
            Statement::parse("DELETE FROM students WHERE id=3").unwrap(),
            Statement::DeleteRow { .. }
        ));
        assert!(matches!(
            Statement::parse("DELETE TABLE students").unwrap(),
            Statement::Truncate { .. }
        ));
        assert!(matches!(
            Statement::parse("COUNT students").unwrap(),
            Statement::Count { .. }
        ));
        assert!(matches!(
            Statement::parse("ALTER TABLE students DROP COLUMN age").unwrap(),
            Statement::DropColumn { .. }
        ));
    }

    #[test]
    fn garbage_is_a_syntax_error() {
        assert!(matches!(
            Statement::parse("EXPLAIN students"),
            Err(DbError::SqlSyntax(_))
        ));
        assert!(matches!(
            Statement::parse("SELECT * FROM students WHERE"),
            Err(DbError::SqlSyntax(_))
        ));
    }
}
