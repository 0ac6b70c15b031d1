//! Error types for embedding providers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// Transport failure, including timeouts.
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the embedding service.
    #[error("embedding service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("embedding service returned no vectors")]
    EmptyResponse,

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
