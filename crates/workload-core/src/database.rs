//! The narrow SQL capability consumed by the engine.
//!
//! Any SQL-executing collaborator (a pooled client, a single connection,
//! an in-memory fake in tests) implements [`Database`]. The engine never
//! needs column-level schema knowledge, only positional values.

use crate::error::DbError;
use crate::vector::to_vector_literal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A positional statement parameter or a decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// Sent to the database in the vector literal text format
    Vector(Vec<f32>),
}

impl SqlValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Vector(_) => "vector",
        }
    }

    /// Text rendering used when the driver transmits a vector as text.
    pub fn vector_literal(&self) -> Option<String> {
        match self {
            SqlValue::Vector(values) => Some(to_vector_literal(values)),
            _ => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::Int(value as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<Vec<f32>> for SqlValue {
    fn from(value: Vec<f32>) -> Self {
        SqlValue::Vector(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row as positional values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlRow {
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: usize) -> Option<&SqlValue> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get_i64(&self, column: usize) -> Result<i64, DbError> {
        match self.value(column)? {
            SqlValue::Int(v) => Ok(*v),
            other => Err(unexpected(column, "int", other)),
        }
    }

    pub fn get_f64(&self, column: usize) -> Result<f64, DbError> {
        match self.value(column)? {
            SqlValue::Float(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v as f64),
            other => Err(unexpected(column, "float", other)),
        }
    }

    pub fn get_str(&self, column: usize) -> Result<&str, DbError> {
        match self.value(column)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(unexpected(column, "text", other)),
        }
    }

    fn value(&self, column: usize) -> Result<&SqlValue, DbError> {
        self.values
            .get(column)
            .ok_or(DbError::ColumnOutOfRange(column))
    }
}

fn unexpected(column: usize, expected: &'static str, found: &SqlValue) -> DbError {
    DbError::UnexpectedValue {
        column,
        expected,
        found: found.type_name().to_string(),
    }
}

/// SQL-executing collaborator.
///
/// Implementations must support concurrent use by many callers; the engine
/// performs no locking around them.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement and collect every returned row.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError>;

    /// Run a statement that must return at least one row.
    async fn query_row(&self, sql: &str, params: &[SqlValue]) -> Result<SqlRow, DbError> {
        self.query(sql, params)
            .await?
            .into_iter()
            .next()
            .ok_or(DbError::NoRows)
    }

    /// Run a statement and return the affected row count.
    async fn exec(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError>;

    /// Positional placeholder for parameter `index` (1-based) holding `value`.
    fn placeholder(&self, index: usize, value: &SqlValue) -> String {
        match value {
            SqlValue::Vector(_) => format!("${index}::text::vector"),
            _ => format!("${index}"),
        }
    }

    /// Upper bound on parameters in one statement.
    fn max_parameters(&self) -> usize {
        65_535
    }
}
