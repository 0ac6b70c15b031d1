//! Error types for the PostgreSQL backend.

use thiserror::Error;

/// Errors raised while establishing connections.
#[derive(Error, Debug)]
pub enum PostgreSQLError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// Pool checkout failure.
    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<tokio_postgres::Error>),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
