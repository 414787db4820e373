// src/core/query/mod.rs

pub mod executor;

use crate::core::common::error::{DbError, DbResult};
use crate::core::types::Value;
use std::fmt;

/// Comparison operator accepted by filters and HAVING clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
}

impl Operator {
    pub fn parse(raw: &str) -> DbResult<Self> {
        match raw.trim() {
            "=" => Ok(Operator::Eq),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            "<>" => Ok(Operator::Ne),
            other => Err(DbError::UnsupportedOperator(other.to_string())),
        }
    }

    /// Evaluates `left OP right` over the total order on [`Value`].
    pub fn matches(self, left: &Value, right: &Value) -> bool {
        match self {
            Operator::Eq => left == right,
            Operator::Gt => left > right,
            Operator::Lt => left < right,
            Operator::Ge => left >= right,
            Operator::Le => left <= right,
            Operator::Ne => left != right,
        }
    }

    /// Integer comparison used by HAVING's `count OP threshold`.
    pub fn matches_count(self, count: i64, threshold: i64) -> bool {
        match self {
            Operator::Eq => count == threshold,
            Operator::Gt => count > threshold,
            Operator::Lt => count < threshold,
            Operator::Ge => count >= threshold,
            Operator::Le => count <= threshold,
            Operator::Ne => count != threshold,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Ne => "<>",
        };
        f.write_str(symbol)
    }
}
