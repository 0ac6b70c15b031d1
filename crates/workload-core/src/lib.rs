//! Core engine for synthetic vector-database workloads.
//!
//! This crate holds the pieces every workload domain reuses unchanged:
//!
//! - [`SizeCalculator`] - converts a target on-disk size into per-table row counts
//! - [`BatchInserter`] - turns generated rows into bounded, parameterized bulk inserts
//! - [`QueryDispatcher`] - weighted random selection and timed execution of queries
//! - [`Workload`] / [`WorkloadRegistry`] - the plugin contract and its lookup table
//! - [`Database`] - the narrow SQL capability the engine consumes
//!
//! # Architecture
//!
//! ```text
//! driver ──► WorkloadRegistry ──► dyn Workload
//!                                    │
//!              ┌─────────────────────┼──────────────────────┐
//!              ▼                     ▼                      ▼
//!        SizeCalculator        BatchInserter         LazyDispatcher
//!        (RowCountPlan)        (bulk INSERT)         (QueryResult per call)
//!                                    │                      │
//!                                    └────────► dyn Database ◄┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use workload_core::{SizeCalculator, TableSizeInfo};
//!
//! let calculator = SizeCalculator::new(vec![TableSizeInfo::new("article", 3000, 500.0, 1.5)]);
//! let plan = calculator.calculate_row_counts(10_000_000);
//! assert_eq!(plan.get("article"), Some(2000));
//! ```

pub mod batch;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod sizing;
pub mod types;
pub mod vector;

// Re-exports for convenience
pub use batch::{insert_all, BatchInserter, BatchOptions, InsertStats};
pub use database::{Database, SqlRow, SqlValue};
pub use dispatch::{
    count_rows, timed, LazyDispatcher, QueryDispatcher, QueryHandlers, WeightedSelector,
    INIT_QUERY_NAME,
};
pub use error::{ConfigError, DbError, GenerationError, QueryError, RegistryError, SchemaError};
pub use plugin::Workload;
pub use registry::WorkloadRegistry;
pub use sizing::{RowCountPlan, SizeCalculator};
pub use types::{
    EmbeddingConfig, EmbeddingMode, GeneratorConfig, QueryDefinition, QueryKind, QueryResult,
    TableSizeInfo, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use vector::{to_vector_literal, Embedding};
