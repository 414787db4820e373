// src/core/common/mod.rs

pub mod error;

pub use error::{DbError, DbResult};

/// Folds an identifier (table, column, or field name) to its canonical form.
///
/// Identifiers are trimmed and lower-cased at every public boundary so that
/// `" Students "` and `"students"` address the same table.
pub fn fold_ident(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trims a record key. Keys are case-sensitive, unlike identifiers.
pub fn fold_key(raw: &str) -> String {
    raw.trim().to_string()
}
