// src/core/types/mod.rs

pub mod schema;

use crate::core::common::error::{DbError, DbResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Wire format for `datetime` values, both in textual input and in the
/// on-disk snapshot.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The column types a table may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
    Bool,
    Char,
    #[serde(rename = "string")]
    Str,
    DateTime,
}

impl DataType {
    /// Parses a declaration keyword (`int`, `float`, `bool`, `char`,
    /// `string`, `datetime`). Returns `None` for anything else.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "int" => Some(DataType::Int),
            "float" => Some(DataType::Float),
            "bool" => Some(DataType::Bool),
            "char" => Some(DataType::Char),
            "string" => Some(DataType::Str),
            "datetime" => Some(DataType::DateTime),
            _ => None,
        }
    }

    /// The declaration keyword for this type.
    pub fn keyword(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Char => "char",
            DataType::Str => "string",
            DataType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A typed cell value.
///
/// `Value` is totally ordered and hashable so it can key index posting maps
/// and group-by results. Floats order via `total_cmp` and hash via their bit
/// pattern; within one column every value shares a type, so the cross-type
/// ordering (by type rank) only matters for degenerate comparisons.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    DateTime(NaiveDateTime),
}

impl Value {
    /// The declared type this value inhabits.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Bool(_) => DataType::Bool,
            Value::Char(_) => DataType::Char,
            Value::Str(_) => DataType::Str,
            Value::DateTime(_) => DataType::DateTime,
        }
    }

    /// Coerces textual input into a typed value.
    ///
    /// Inputs arrive as strings from the SQL front-end and from snapshot
    /// files. The rules per type:
    ///
    /// - `int`: a non-empty ASCII digit string;
    /// - `float`: anything `f64` parses;
    /// - `bool`: case-insensitive `true/1/t/y/yes` or `false/0/f/n/no`;
    /// - `char`: exactly one character;
    /// - `datetime`: `YYYY-MM-DD HH:MM:SS`;
    /// - `string`: stored verbatim after stripping one outer pair of
    ///   matching single or double quotes.
    pub fn coerce(raw: &str, data_type: DataType, column: &str) -> DbResult<Self> {
        let trimmed = raw.trim();
        let invalid = |expected: &'static str| DbError::InvalidValue {
            value: trimmed.to_string(),
            column: column.to_string(),
            expected,
        };

        match data_type {
            DataType::Int => {
                if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                    trimmed.parse::<i64>().map(Value::Int).map_err(|_| invalid("int"))
                } else {
                    Err(invalid("int"))
                }
            }
            DataType::Float => {
                trimmed.parse::<f64>().map(Value::Float).map_err(|_| invalid("float"))
            }
            DataType::Bool => match trimmed.to_lowercase().as_str() {
                "true" | "1" | "t" | "y" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "f" | "n" | "no" => Ok(Value::Bool(false)),
                _ => Err(invalid("bool: true/false")),
            },
            DataType::Char => {
                let mut chars = trimmed.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(invalid("char - single character")),
                }
            }
            DataType::DateTime => NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
                .map(Value::DateTime)
                .map_err(|_| invalid("datetime 'YYYY-MM-DD HH:MM:SS'")),
            DataType::Str => Ok(Value::Str(strip_outer_quotes(trimmed).to_string())),
        }
    }

    /// Converts this value to its snapshot (JSON) representation.
    ///
    /// Numbers, booleans, and strings map to their JSON counterparts; `char`
    /// and `datetime` become strings (`datetime` via [`DATETIME_FORMAT`]).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Char(c) => serde_json::Value::from(c.to_string()),
            Value::Str(s) => serde_json::Value::from(s.clone()),
            Value::DateTime(dt) => serde_json::Value::from(dt.format(DATETIME_FORMAT).to_string()),
        }
    }

    /// Rebuilds a typed value from its snapshot representation, guided by the
    /// column type recorded in the catalog. Returns `None` when the JSON
    /// shape cannot represent the declared type.
    pub fn from_json(json: &serde_json::Value, data_type: DataType) -> Option<Self> {
        match (data_type, json) {
            (DataType::Int, serde_json::Value::Number(n)) => n.as_i64().map(Value::Int),
            (DataType::Int, serde_json::Value::String(s)) => {
                Value::coerce(s, DataType::Int, "").ok()
            }
            (DataType::Float, serde_json::Value::Number(n)) => n.as_f64().map(Value::Float),
            (DataType::Float, serde_json::Value::String(s)) => {
                Value::coerce(s, DataType::Float, "").ok()
            }
            (DataType::Bool, serde_json::Value::Bool(b)) => Some(Value::Bool(*b)),
            (DataType::Bool, serde_json::Value::String(s)) => {
                Value::coerce(s, DataType::Bool, "").ok()
            }
            (DataType::Char, serde_json::Value::String(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            }
            (DataType::DateTime, serde_json::Value::String(s)) => {
                NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok().map(Value::DateTime)
            }
            (DataType::Str, serde_json::Value::String(s)) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }
}

/// Strips one outer pair of matching quotes, if present.
fn strip_outer_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Int(_) => 0,
        Value::Float(_) => 1,
        Value::Bool(_) => 2,
        Value::Char(_) => 3,
        Value::Str(_) => 4,
        Value::DateTime(_) => 5,
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            // Mixed-type comparison falls back to the type rank; a column
            // index never mixes types, so this only orders degenerate input.
            (a, b) => type_rank(a).cmp(&type_rank(b)),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        type_rank(self).hash(state);
        match self {
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Char(c) => c.hash(state),
            Value::Str(s) => s.hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

pub use schema::{ColumnDef, Constraint, Record, Table};
