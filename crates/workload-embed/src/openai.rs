//! Hosted embedding API provider.
//!
//! Without an API key the provider transparently serves deterministic random
//! vectors of the same dimensionality instead of failing.

use crate::error::EmbedError;
use crate::random::RandomEmbedder;
use crate::{check_dimensions, EmbeddingProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use workload_core::{ConfigError, Embedding, EmbeddingConfig};

#[derive(Debug)]
pub struct OpenAiEmbedder {
    backend: Backend,
    dimensions: usize,
}

#[derive(Debug)]
enum Backend {
    Remote {
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        model: String,
    },
    Fallback(RandomEmbedder),
}

impl OpenAiEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());

        let backend = match api_key {
            None => {
                warn!(
                    "No OpenAI API key configured, falling back to random {}-dimensional embeddings",
                    config.dimensions
                );
                Backend::Fallback(RandomEmbedder::new(config.dimensions))
            }
            Some(api_key) => {
                let endpoint = format!("{}/embeddings", config.openai_base_url.trim_end_matches('/'));
                reqwest::Url::parse(&endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                    url: endpoint.clone(),
                    reason: e.to_string(),
                })?;
                let client = reqwest::Client::builder()
                    .timeout(config.request_timeout)
                    .build()
                    .map_err(|e| ConfigError::InvalidEndpoint {
                        url: endpoint.clone(),
                        reason: e.to_string(),
                    })?;
                Backend::Remote {
                    client,
                    endpoint,
                    api_key: api_key.to_string(),
                    model: config.openai_model.clone(),
                }
            }
        };

        Ok(Self {
            backend,
            dimensions: config.dimensions,
        })
    }

    /// True when serving random vectors because no key was configured.
    pub fn is_fallback(&self) -> bool {
        matches!(self.backend, Backend::Fallback(_))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        let (client, endpoint, api_key, model) = match &self.backend {
            Backend::Fallback(random) => return Ok(random.embed_text(text)),
            Backend::Remote {
                client,
                endpoint,
                api_key,
                model,
            } => (client, endpoint, api_key, model),
        };

        let request = EmbedRequest {
            model,
            input: [text],
            dimensions: supports_dimensions(model).then_some(self.dimensions),
        };
        debug!("Requesting embedding from {} ({} chars)", endpoint, text.len());

        let res = client
            .post(endpoint.as_str())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(EmbedError::Api {
                status: res.status().as_u16(),
                body: res.text().await?,
            });
        }

        let response = res.json::<EmbedResponse>().await?;
        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or(EmbedError::EmptyResponse)?
            .embedding;
        check_dimensions(embedding, self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Only the text-embedding-3 family accepts a `dimensions` parameter.
fn supports_dimensions(model: &str) -> bool {
    model.starts_with("text-embedding-3")
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbedResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedResponseItem>,
}
