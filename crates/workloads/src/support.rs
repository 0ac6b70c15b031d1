//! Schema and loading steps shared by the workload plugins.

use rand::Rng;
use tracing::{debug, info};
use workload_core::{
    Database, Embedding, GenerationError, QueryError, RowCountPlan, SchemaError,
    SizeCalculator, DEFAULT_EMBEDDING_DIMENSIONS,
};
use workload_embed::{Embedder, EmbeddingProvider};

pub const CREATE_VECTOR_EXTENSION: &str = "CREATE EXTENSION IF NOT EXISTS vector";

/// Run DDL statements in order, stopping at the first failure.
pub async fn execute_ddl(db: &dyn Database, statements: &[&str]) -> Result<(), SchemaError> {
    for statement in statements {
        debug!("DDL: {}", statement);
        db.exec(statement, &[])
            .await
            .map_err(|e| SchemaError::statement(*statement, e))?;
    }
    Ok(())
}

/// Drop `tables` in reverse order of creation.
pub async fn drop_tables(db: &dyn Database, tables: &[&str]) -> Result<(), SchemaError> {
    for table in tables.iter().rev() {
        let statement = format!("DROP TABLE IF EXISTS {table} CASCADE");
        debug!("DDL: {}", statement);
        db.exec(&statement, &[])
            .await
            .map_err(|e| SchemaError::statement(statement.clone(), e))?;
    }
    Ok(())
}

/// Fix the embedding column to `dimensions` so it can be indexed.
pub async fn set_vector_dimensions(
    db: &dyn Database,
    table: &str,
    column: &str,
    dimensions: usize,
) -> Result<(), GenerationError> {
    let statement =
        format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE vector({dimensions})");
    debug!("DDL: {}", statement);
    db.exec(&statement, &[])
        .await
        .map_err(|source| GenerationError::Statement {
            table: table.to_string(),
            source,
        })?;
    Ok(())
}

/// Move the identity sequence of `table` past the explicitly inserted ids.
pub async fn resync_sequence(db: &dyn Database, table: &str) -> Result<(), GenerationError> {
    let statement = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), (SELECT COALESCE(MAX(id), 1) FROM {table}))"
    );
    db.exec(&statement, &[])
        .await
        .map_err(|source| GenerationError::Statement {
            table: table.to_string(),
            source,
        })?;
    Ok(())
}

/// Build the approximate-nearest-neighbour index once the table is loaded.
pub async fn create_vector_index(
    db: &dyn Database,
    table: &str,
    column: &str,
) -> Result<(), GenerationError> {
    let statement = format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} USING hnsw ({column} vector_cosine_ops)"
    );
    info!("Building vector index on {}.{}", table, column);
    db.exec(&statement, &[])
        .await
        .map_err(|source| GenerationError::Statement {
            table: table.to_string(),
            source,
        })?;
    Ok(())
}

/// Embed `text` for a row of `table`.
pub async fn embed(
    embedder: &Embedder,
    table: &str,
    text: &str,
) -> Result<Embedding, GenerationError> {
    embedder
        .embed(text)
        .await
        .map_err(|e| GenerationError::Embedding {
            table: table.to_string(),
            source: Box::new(e),
        })
}

/// Dimensionality of the stored embeddings, or the default on an empty table.
pub async fn stored_dimensions(
    db: &dyn Database,
    table: &str,
    column: &str,
) -> Result<usize, QueryError> {
    let rows = db
        .query(
            &format!("SELECT vector_dims({column}) FROM {table} WHERE {column} IS NOT NULL LIMIT 1"),
            &[],
        )
        .await?;
    match rows.first() {
        Some(row) => Ok(row.get_i64(0)?.max(1) as usize),
        None => Ok(DEFAULT_EMBEDDING_DIMENSIONS),
    }
}

/// Log the row-count plan of a generation run.
pub fn log_plan(workload: &str, calculator: &SizeCalculator, plan: &RowCountPlan, target: i64) {
    info!(
        "{}: target {} bytes, {} rows planned, estimated {} bytes",
        workload,
        target,
        plan.total_rows(),
        calculator.estimated_size(plan)
    );
    for (table, rows) in plan.iter() {
        info!("  {}: {} rows", table, rows);
    }
}

/// Random id in `[1, bound]`.
pub fn random_id(bound: u64) -> i64 {
    rand::thread_rng().gen_range(1..=bound.max(1)) as i64
}

/// Random id in `[1, bound]` drawn from a generation RNG.
pub fn seeded_id<R: Rng + ?Sized>(rng: &mut R, bound: u64) -> i64 {
    rng.gen_range(1..=bound.max(1)) as i64
}
