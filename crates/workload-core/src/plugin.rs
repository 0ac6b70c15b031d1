//! The contract every workload domain implements.

use crate::database::Database;
use crate::error::{GenerationError, SchemaError};
use crate::sizing::SizeCalculator;
use crate::types::{GeneratorConfig, QueryDefinition, QueryResult, TableSizeInfo};
use async_trait::async_trait;

/// A self-contained simulated application domain (e-commerce, knowledge base, ...).
///
/// One instance is shared by every worker of a run. `execute_query` may be
/// called concurrently; implementations initialize their dispatch state at
/// most once.
#[async_trait]
pub trait Workload: Send + Sync {
    /// Registry key.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Free-form label such as "oltp+vector" or "rag".
    fn workload_type(&self) -> &'static str;

    /// Whether the vector-search extension must be installed.
    fn requires_vector_extension(&self) -> bool;

    /// Storage hints for every table, in foreign-key order.
    fn table_sizes(&self) -> Vec<TableSizeInfo>;

    /// The static query catalogue, for reporting and documentation.
    fn queries(&self) -> &'static [QueryDefinition];

    /// Create tables (and the vector extension when required). Idempotent.
    async fn create_schema(&self, db: &dyn Database) -> Result<(), SchemaError>;

    /// Drop every table of the workload. Idempotent.
    async fn drop_schema(&self, db: &dyn Database) -> Result<(), SchemaError>;

    /// Populate the schema to roughly `config.target_size` bytes.
    async fn generate_data(
        &self,
        db: &dyn Database,
        config: &GeneratorConfig,
    ) -> Result<(), GenerationError>;

    /// Select, run and time one weighted-random query. Never fails.
    async fn execute_query(&self, db: &dyn Database) -> QueryResult;

    /// Size calculator for this workload at the given embedding dimensionality.
    fn size_calculator(&self, dimensions: usize) -> SizeCalculator {
        SizeCalculator::new(self.table_sizes()).with_embedding_dimensions(dimensions)
    }
}
