//! PostgreSQL backend for the workload engine.
//!
//! Two connection-sharing modes implement [`workload_core::Database`]:
//!
//! - [`PgPool`] - a bb8 pool shared by many concurrent workers
//! - [`PgClient`] - one dedicated `tokio_postgres::Client`
//!
//! Embeddings travel as vector literal text and are cast server-side
//! (`$n::text::vector`), so no pgvector client type is needed.

pub mod client;
pub mod convert;
pub mod error;

pub use client::{PgClient, PgPool, DEFAULT_POOL_SIZE};
pub use error::PostgreSQLError;
