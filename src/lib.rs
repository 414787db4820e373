#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::too_many_lines,
    clippy::map_unwrap_or,
    clippy::float_cmp,
    clippy::implicit_hasher,
    clippy::return_self_not_must_use
)]

//! # Ferrobase - An Embeddable Transactional Record Database
//!
//! Ferrobase is a lightweight, single-process database with a tabular data
//! model layered over a keyed record store. Tables carry typed columns
//! (`int`, `float`, `bool`, `char`, `string`, `datetime`) with `primary_key`,
//! `unique`, and `foreign_key` constraints. Reads and writes run under
//! two-phase locking with explicit or implicit transactions, secondary
//! indexes accelerate equality and range filters, and the whole catalog is
//! flushed to a JSON snapshot at commit time.
//!
//! ## Features
//!
//! - Typed tables with per-column constraint enforcement
//! - Explicit transactions (`begin`/`commit`/`rollback`) with snapshot-based
//!   rollback, plus implicit single-operation transactions
//! - Non-blocking multi-reader/single-writer locks keyed by `(table, row)`
//! - Secondary indexes kept coherent with every insert/update/delete
//! - Query primitives: point get, filtered scan, group-by, having, distinct,
//!   inner join, count
//! - An SQL-subset text front-end lowering to the typed engine API
//!
//! ## Example
//!
//! ```rust
//! use ferrobase::api::Database;
//! use std::collections::HashMap;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let db = Database::open(dir.path().join("database.json")).unwrap();
//!
//! let mut constraints = HashMap::new();
//! constraints.insert("id".to_string(), vec!["primary_key".to_string()]);
//! db.create_table("students", &["id int", "name string"], &constraints, None)
//!     .unwrap();
//! db.insert("students", "1", &["1", "John"], None).unwrap();
//!
//! let record = db.get("students", "1", None).unwrap();
//! assert_eq!(record["name"].to_string(), "John");
//! ```

pub mod api;
pub mod core;

pub use api::Database;
pub use core::common::error::{DbError, DbResult};
pub use core::types::{DataType, Value};
