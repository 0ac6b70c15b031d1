//! Error taxonomy shared by the workload engine.

use thiserror::Error;

/// Boxed error used where the concrete source belongs to another crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid or missing generation parameters. Generation never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown embedding mode '{0}' (expected random, openai or vectorizer)")]
    UnknownEmbeddingMode(String),

    #[error("embedding dimensions must be greater than zero")]
    ZeroDimensions,

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("vectorizer embedding mode requires an endpoint URL")]
    MissingVectorizerUrl,

    #[error("invalid embedding endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("query catalogue is empty")]
    EmptyQueryCatalogue,

    #[error("query '{0}' has zero weight")]
    ZeroWeight(String),

    #[error("query '{0}' is defined more than once")]
    DuplicateQuery(String),
}

/// Failure reported by a [`crate::Database`] implementation.
#[derive(Debug, Error)]
pub enum DbError {
    /// `query_row` found nothing.
    #[error("query returned no rows")]
    NoRows,

    #[error("column {0} is out of range")]
    ColumnOutOfRange(usize),

    #[error("column {column} holds {found}, expected {expected}")]
    UnexpectedValue {
        column: usize,
        expected: &'static str,
        found: String,
    },

    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    #[error("statement failed: {0}")]
    Statement(#[source] BoxError),
}

impl DbError {
    pub fn statement<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DbError::Statement(Box::new(err))
    }

    pub fn connection<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DbError::Connection(Box::new(err))
    }
}

/// Schema create/drop failure.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema statement failed ({statement}): {source}")]
    Statement {
        statement: String,
        #[source]
        source: DbError,
    },
}

impl SchemaError {
    pub fn statement(statement: impl Into<String>, source: DbError) -> Self {
        SchemaError::Statement {
            statement: statement.into(),
            source,
        }
    }
}

/// Data generation failure. Always names the table being populated.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A bulk INSERT failed. Earlier batches for the table stay committed.
    #[error("failed to insert batch {batch} (rows {first_row}..={last_row}) into '{table}': {source}")]
    Flush {
        table: String,
        batch: u64,
        first_row: u64,
        last_row: u64,
        #[source]
        source: DbError,
    },

    #[error("row for '{table}' has {actual} values, expected {expected}")]
    RowShape {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("failed to embed text for '{table}': {source}")]
    Embedding {
        table: String,
        #[source]
        source: BoxError,
    },

    #[error("statement on '{table}' failed: {source}")]
    Statement {
        table: String,
        #[source]
        source: DbError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl GenerationError {
    pub fn table(&self) -> Option<&str> {
        match self {
            GenerationError::Flush { table, .. }
            | GenerationError::RowShape { table, .. }
            | GenerationError::Embedding { table, .. }
            | GenerationError::Statement { table, .. } => Some(table),
            GenerationError::Config(_) | GenerationError::Schema(_) => None,
        }
    }
}

/// Failure of a single dispatch call. Captured into `QueryResult::error`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("unknown query type '{0}'")]
    UnknownQuery(String),

    #[error("embedding failed: {0}")]
    Embedding(#[source] BoxError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("workload '{0}' is already registered")]
    Duplicate(String),
}
