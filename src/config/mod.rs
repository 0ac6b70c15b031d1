//! Command-line value parsers.

pub mod duration;
pub mod size;

pub use duration::parse_duration;
pub use size::{format_size, parse_size};

use workload_core::{ConfigError, EmbeddingMode};

/// Parse `random`, `openai` or `vectorizer`.
pub fn parse_embedding_mode(s: &str) -> Result<EmbeddingMode, ConfigError> {
    s.parse()
}
