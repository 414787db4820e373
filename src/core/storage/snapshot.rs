// src/core/storage/snapshot.rs

//! Whole-catalog JSON snapshot.
//!
//! The entire catalog and the index maps are flushed to one file at commit
//! time: `{"tables": {...}, "indexes": {...}}`. Loading is tolerant - a
//! missing file yields an empty catalog, a malformed file yields an empty
//! catalog with a warning, and a legacy file holding only the bare tables
//! object (no `tables` wrapper, no `indexes`) is accepted.

use crate::core::common::error::DbResult;
use crate::core::indexing::manager::{IndexMap, Postings};
use crate::core::indexing::IndexManager;
use crate::core::storage::catalog::Catalog;
use crate::core::types::{ColumnDef, Record, Table, Value};
use serde_json::{json, Map};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Serializes the catalog and index maps and atomically replaces `path`.
///
/// The write goes to a sibling temp file first and is renamed into place, so
/// a reader never observes a half-written snapshot and two sequential
/// commits cannot interleave on the file.
pub fn save(path: &Path, catalog: &Catalog, indexes: &IndexManager) -> DbResult<()> {
    let payload = json!({
        "tables": tables_to_json(catalog)?,
        "indexes": indexes_to_json(indexes.as_map()),
    });

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, serde_json::to_vec(&payload)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Reads a snapshot back into a catalog and index maps.
///
/// Never fails: every problem degrades to an empty (or partially loaded)
/// state with a `tracing` diagnostic, because an unreadable snapshot must
/// not prevent the engine from starting.
pub fn load(path: &Path) -> (Catalog, IndexMap) {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no snapshot file, starting empty");
            return (Catalog::default(), IndexMap::default());
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "snapshot unreadable, starting empty");
            return (Catalog::default(), IndexMap::default());
        }
    };

    let json: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "snapshot malformed, starting empty");
            return (Catalog::default(), IndexMap::default());
        }
    };

    // New layout wraps the catalog under "tables"; the legacy layout is the
    // bare catalog object with no index section.
    let (tables_json, indexes_json) = match json.as_object() {
        Some(object) if object.contains_key("tables") => {
            (object.get("tables"), object.get("indexes"))
        }
        Some(_) => (Some(&json), None),
        None => {
            tracing::warn!(path = %path.display(), "snapshot is not an object, starting empty");
            return (Catalog::default(), IndexMap::default());
        }
    };

    let catalog = tables_json.map_or_else(Catalog::default, tables_from_json);
    let indexes = indexes_json
        .map(|json| indexes_from_json(json, &catalog))
        .unwrap_or_default();
    (catalog, indexes)
}

fn tables_to_json(catalog: &Catalog) -> DbResult<serde_json::Value> {
    let mut tables = Map::new();
    for (name, table) in &catalog.tables {
        let mut records = Map::new();
        for (key, record) in &table.records {
            let fields: Map<String, serde_json::Value> =
                record.iter().map(|(field, value)| (field.clone(), value.to_json())).collect();
            records.insert(key.clone(), serde_json::Value::Object(fields));
        }
        tables.insert(
            name.clone(),
            json!({
                "columns": serde_json::to_value(&table.columns)?,
                "records": records,
                "primary_key": &table.primary_key,
                "foreign_keys": &table.foreign_keys,
            }),
        );
    }
    Ok(serde_json::Value::Object(tables))
}

fn indexes_to_json(indexes: &IndexMap) -> serde_json::Value {
    let mut tables = Map::new();
    for (table, columns) in indexes {
        let mut columns_json = Map::new();
        for (column, postings) in columns {
            let posting_json: Map<String, serde_json::Value> = postings
                .iter()
                .map(|(value, keys)| (value.to_string(), json!(keys)))
                .collect();
            columns_json.insert(column.clone(), serde_json::Value::Object(posting_json));
        }
        tables.insert(table.clone(), serde_json::Value::Object(columns_json));
    }
    serde_json::Value::Object(tables)
}

fn tables_from_json(json: &serde_json::Value) -> Catalog {
    let mut catalog = Catalog::default();
    let Some(tables) = json.as_object() else {
        tracing::warn!("snapshot tables section is not an object, starting empty");
        return catalog;
    };

    for (name, table_json) in tables {
        match table_from_json(table_json) {
            Some(table) => {
                catalog.tables.insert(name.clone(), table);
            }
            None => {
                tracing::warn!(table = %name, "skipping malformed table in snapshot");
            }
        }
    }
    catalog
}

fn table_from_json(json: &serde_json::Value) -> Option<Table> {
    let object = json.as_object()?;
    let columns: Vec<ColumnDef> =
        serde_json::from_value(object.get("columns")?.clone()).ok()?;

    let mut table = Table {
        columns,
        primary_key: object
            .get("primary_key")
            .and_then(|pk| pk.as_str())
            .map(ToString::to_string),
        foreign_keys: object
            .get("foreign_keys")
            .and_then(|fks| serde_json::from_value(fks.clone()).ok())
            .unwrap_or_default(),
        records: HashMap::new(),
    };

    if let Some(records) = object.get("records").and_then(|r| r.as_object()) {
        for (key, fields_json) in records {
            let Some(fields) = fields_json.as_object() else { continue };
            let mut record = Record::new();
            for (field, value_json) in fields {
                let Some(column) = table.column(field) else {
                    tracing::warn!(field = %field, "snapshot field has no column, skipping");
                    continue;
                };
                match Value::from_json(value_json, column.data_type) {
                    Some(value) => {
                        record.insert(field.clone(), value);
                    }
                    None => {
                        tracing::warn!(
                            field = %field,
                            "snapshot value does not fit its column type, skipping"
                        );
                    }
                }
            }
            table.records.insert(key.clone(), record);
        }
    }
    Some(table)
}

fn indexes_from_json(json: &serde_json::Value, catalog: &Catalog) -> IndexMap {
    let mut indexes = IndexMap::default();
    let Some(tables) = json.as_object() else { return indexes };

    for (table_name, columns_json) in tables {
        let Some(columns) = columns_json.as_object() else { continue };
        let Some(table) = catalog.tables.get(table_name) else {
            tracing::warn!(table = %table_name, "snapshot index for unknown table, skipping");
            continue;
        };
        for (column_name, postings_json) in columns {
            let Some(column) = table.column(column_name) else {
                tracing::warn!(
                    table = %table_name,
                    column = %column_name,
                    "snapshot index for unknown column, skipping"
                );
                continue;
            };
            let Some(raw_postings) = postings_json.as_object() else { continue };

            let mut postings = Postings::new();
            for (value_repr, keys_json) in raw_postings {
                let Ok(value) = Value::coerce(value_repr, column.data_type, column_name) else {
                    tracing::warn!(
                        column = %column_name,
                        value = %value_repr,
                        "snapshot index key does not fit its column type, skipping"
                    );
                    continue;
                };
                let keys: Vec<String> =
                    serde_json::from_value(keys_json.clone()).unwrap_or_default();
                if !keys.is_empty() {
                    postings.insert(value, keys);
                }
            }
            indexes
                .entry(table_name.clone())
                .or_default()
                .insert(column_name.clone(), postings);
        }
    }
    indexes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DataType;
    use std::collections::HashMap;

    fn build_state() -> (Catalog, IndexManager) {
        let mut catalog = Catalog::new();
        let mut indexes = IndexManager::new();
        let constraints =
            HashMap::from([("id".to_string(), vec!["primary_key".to_string()])]);
        catalog
            .create_table(
                "students",
                &[
                    "id int".to_string(),
                    "name string".to_string(),
                    "enrolled datetime".to_string(),
                ],
                &constraints,
            )
            .unwrap();
        catalog
            .insert(
                &mut indexes,
                "students",
                "1",
                &["1".to_string(), "John".to_string(), "2024-01-15 08:30:00".to_string()],
            )
            .unwrap();
        indexes
            .create_index("students", "name", &catalog.table("students").unwrap().records)
            .unwrap();
        (catalog, indexes)
    }

    #[test]
    fn round_trips_catalog_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let (catalog, indexes) = build_state();

        save(&path, &catalog, &indexes).unwrap();
        let (loaded_catalog, loaded_indexes) = load(&path);

        assert_eq!(loaded_catalog, catalog);
        assert_eq!(&loaded_indexes, indexes.as_map());

        // Types survive the trip.
        let record = loaded_catalog.get("students", "1").unwrap();
        assert_eq!(record["id"], Value::Int(1));
        assert_eq!(record["enrolled"].data_type(), DataType::DateTime);
    }

    #[test]
    fn datetimes_serialize_in_wire_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let (catalog, indexes) = build_state();
        save(&path, &catalog, &indexes).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("2024-01-15 08:30:00"));
    }

    #[test]
    fn missing_file_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, indexes) = load(&dir.path().join("absent.json"));
        assert!(catalog.tables.is_empty());
        assert!(indexes.is_empty());
    }

    #[test]
    fn malformed_file_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, "{not json").unwrap();
        let (catalog, indexes) = load(&path);
        assert!(catalog.tables.is_empty());
        assert!(indexes.is_empty());
    }

    #[test]
    fn legacy_bare_catalog_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let (catalog, _indexes) = build_state();

        // Write only the catalog object, the pre-index layout.
        let bare = tables_to_json(&catalog).unwrap();
        fs::write(&path, serde_json::to_vec(&bare).unwrap()).unwrap();

        let (loaded_catalog, loaded_indexes) = load(&path);
        assert_eq!(loaded_catalog, catalog);
        assert!(loaded_indexes.is_empty());
    }

    #[test]
    fn stringly_typed_records_are_recoerced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        fs::write(
            &path,
            serde_json::to_vec(&json!({
                "tables": {
                    "students": {
                        "columns": [
                            {"name": "id", "type": "int", "constraints": ["primary_key"]},
                            {"name": "name", "type": "string", "constraints": []}
                        ],
                        "records": {"1": {"id": "1", "name": "John"}},
                        "primary_key": "id",
                        "foreign_keys": {}
                    }
                },
                "indexes": {"students": {"id": {"1": ["1"]}}}
            }))
            .unwrap(),
        )
        .unwrap();

        let (catalog, indexes) = load(&path);
        let record = catalog.get("students", "1").unwrap();
        assert_eq!(record["id"], Value::Int(1));
        let postings = indexes.get("students").unwrap().get("id").unwrap();
        assert_eq!(postings.get(&Value::Int(1)).unwrap(), &vec!["1".to_string()]);
    }
}
