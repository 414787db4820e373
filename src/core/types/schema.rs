// src/core/types/schema.rs

use crate::core::common::error::{DbError, DbResult};
use crate::core::common::fold_ident;
use crate::core::types::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A per-column constraint keyword.
///
/// Foreign-key targets are not stored here; they live in the owning table's
/// [`Table::foreign_keys`] map, keyed by the constrained column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    PrimaryKey,
    Unique,
    ForeignKey,
}

impl Constraint {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "primary_key" => Some(Constraint::PrimaryKey),
            "unique" => Some(Constraint::Unique),
            "foreign_key" => Some(Constraint::ForeignKey),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Constraint::PrimaryKey => "primary_key",
            Constraint::Unique => "unique",
            Constraint::ForeignKey => "foreign_key",
        }
    }
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl ColumnDef {
    /// Parses a textual column declaration of the form `name type`, e.g.
    /// `"id int"`. The name and type keyword are case-folded.
    pub fn parse_decl(decl: &str) -> DbResult<Self> {
        let mut parts = decl.split_whitespace();
        let (name, type_kw) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(type_kw), None) => (name, type_kw),
            _ => return Err(DbError::InvalidColumnDecl(decl.trim().to_string())),
        };
        let data_type = DataType::from_keyword(&fold_ident(type_kw))
            .ok_or_else(|| DbError::UnsupportedType(fold_ident(type_kw)))?;
        Ok(ColumnDef { name: fold_ident(name), data_type, constraints: Vec::new() })
    }

    pub fn has_constraint(&self, constraint: Constraint) -> bool {
        self.constraints.contains(&constraint)
    }
}

/// A stored row: field name to typed value.
pub type Record = HashMap<String, Value>;

/// A table: ordered column schema plus keyed records.
///
/// Column declaration order is the positional order for tuple-style inserts.
/// Records are addressed by an external string key supplied at insert time;
/// the key is independent of any column marked `primary_key`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<ColumnDef>,
    pub records: HashMap<String, Record>,
    /// At most one column name carries `primary_key`.
    pub primary_key: Option<String>,
    /// Constrained column to `"parent_table.parent_column"`.
    pub foreign_keys: HashMap<String, String>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}
