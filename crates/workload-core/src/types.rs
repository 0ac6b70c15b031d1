//! Data model shared by the sizing, generation and dispatch components.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Embedding dimensionality assumed by every workload's `base_row_size`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Storage-cost hint for one table of a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSizeInfo {
    /// Table name
    pub name: String,
    /// Average serialized row size in bytes, including any vector payload
    pub base_row_size: u64,
    /// Rows produced per scale unit
    pub scale_ratio: f64,
    /// Multiplier (>= 1) approximating secondary index overhead
    pub index_factor: f64,
    /// Number of embedding columns stored per row
    #[serde(default)]
    pub vector_columns: u32,
}

impl TableSizeInfo {
    pub fn new(
        name: impl Into<String>,
        base_row_size: u64,
        scale_ratio: f64,
        index_factor: f64,
    ) -> Self {
        Self {
            name: name.into(),
            base_row_size,
            scale_ratio,
            index_factor,
            vector_columns: 0,
        }
    }

    /// Mark the table as carrying `columns` embedding columns.
    pub fn with_vector_columns(mut self, columns: u32) -> Self {
        self.vector_columns = columns;
        self
    }

    /// Storage cost of one scale unit of this table.
    pub fn unit_cost(&self) -> f64 {
        self.base_row_size as f64 * self.index_factor * self.scale_ratio
    }

    /// Estimated on-disk bytes for `rows` rows.
    pub fn bytes_for(&self, rows: u64) -> f64 {
        rows as f64 * self.base_row_size as f64 * self.index_factor
    }
}

/// Whether a query only reads or also mutates data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Read,
    Write,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Read => write!(f, "read"),
            QueryKind::Write => write!(f, "write"),
        }
    }
}

/// One entry of a workload's static query catalogue.
///
/// Weights are relative mass and need not sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub weight: u32,
    pub kind: QueryKind,
}

impl QueryDefinition {
    pub const fn read(name: &'static str, description: &'static str, weight: u32) -> Self {
        Self {
            name,
            description,
            weight,
            kind: QueryKind::Read,
        }
    }

    pub const fn write(name: &'static str, description: &'static str, weight: u32) -> Self {
        Self {
            name,
            description,
            weight,
            kind: QueryKind::Write,
        }
    }
}

/// Outcome of exactly one dispatch call. Never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query_name: String,
    /// Wall time spent in the handler
    pub duration: Duration,
    /// Rows returned or mutated
    pub rows_affected: u64,
    /// Failure descriptor, `None` on success
    pub error: Option<String>,
}

impl QueryResult {
    pub fn success(query_name: impl Into<String>, duration: Duration, rows_affected: u64) -> Self {
        Self {
            query_name: query_name.into(),
            duration,
            rows_affected,
            error: None,
        }
    }

    pub fn failure(
        query_name: impl Into<String>,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            query_name: query_name.into(),
            duration,
            rows_affected: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Strategy used to fill embedding columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Deterministic, text-seeded, unit-length vectors
    #[default]
    Random,
    /// Hosted embedding API (falls back to random without a key)
    OpenAI,
    /// Internal embedding microservice
    Vectorizer,
}

impl FromStr for EmbeddingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(EmbeddingMode::Random),
            "openai" => Ok(EmbeddingMode::OpenAI),
            "vectorizer" => Ok(EmbeddingMode::Vectorizer),
            other => Err(ConfigError::UnknownEmbeddingMode(other.to_string())),
        }
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingMode::Random => write!(f, "random"),
            EmbeddingMode::OpenAI => write!(f, "openai"),
            EmbeddingMode::Vectorizer => write!(f, "vectorizer"),
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub dimensions: usize,
    #[serde(skip_serializing, default)]
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub vectorizer_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Random,
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            openai_api_key: None,
            openai_model: "text-embedding-3-small".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            vectorizer_url: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimensions == 0 {
            return Err(ConfigError::ZeroDimensions);
        }
        if self.mode == EmbeddingMode::Vectorizer
            && self
                .vectorizer_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::MissingVectorizerUrl);
        }
        Ok(())
    }
}

/// Parameters for one data-generation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Target on-disk size in bytes
    pub target_size: i64,
    pub embedding: EmbeddingConfig,
    /// Rows per bulk INSERT
    pub batch_size: usize,
    /// Rows between progress log lines
    pub progress_interval: u64,
    /// Seed for deterministic row generation
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target_size: 100 * 1024 * 1024,
            embedding: EmbeddingConfig::default(),
            batch_size: 1000,
            progress_interval: 10_000,
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        self.embedding.validate()
    }
}
