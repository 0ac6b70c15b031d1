//! Internal embedding microservice provider.
//!
//! `POST {endpoint}` with `{"text": ..., "dimensions": n}` and expects
//! `{"embedding": [...]}`. Timeouts and non-2xx responses are returned as
//! errors; there is no fallback.

use crate::error::EmbedError;
use crate::{check_dimensions, EmbeddingProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use workload_core::{ConfigError, Embedding, EmbeddingConfig};

#[derive(Debug)]
pub struct VectorizerEmbedder {
    client: reqwest::Client,
    endpoint: String,
    dimensions: usize,
}

impl VectorizerEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let endpoint = config
            .vectorizer_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingVectorizerUrl)?
            .to_string();

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

        Ok(Self {
            client,
            endpoint,
            dimensions: config.dimensions,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingProvider for VectorizerEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        debug!("Requesting embedding from {} ({} chars)", self.endpoint, text.len());
        let res = self
            .client
            .post(&self.endpoint)
            .json(&VectorizeRequest {
                text,
                dimensions: self.dimensions,
            })
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(EmbedError::Api {
                status: res.status().as_u16(),
                body: res.text().await?,
            });
        }

        let response = res.json::<VectorizeResponse>().await?;
        if response.embedding.is_empty() {
            return Err(EmbedError::EmptyResponse);
        }
        check_dimensions(response.embedding, self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Serialize)]
struct VectorizeRequest<'a> {
    text: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct VectorizeResponse {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;
    use std::time::Duration;
    use workload_core::EmbeddingMode;

    fn config(url: &str, dimensions: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            mode: EmbeddingMode::Vectorizer,
            dimensions,
            vectorizer_url: Some(url.to_string()),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_embed_success() {
        let (url, server) = serve_once(200, r#"{"embedding":[0.0,1.0]}"#).await;
        let embedder = VectorizerEmbedder::from_config(&config(&format!("{url}/embed"), 2)).unwrap();

        assert_eq!(embedder.embed("doc").await.unwrap(), vec![0.0, 1.0]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /embed"));
        assert!(request.contains(r#""text":"doc""#));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (url, _server) = serve_once(503, "overloaded").await;
        let embedder = VectorizerEmbedder::from_config(&config(&url, 2)).unwrap();

        let err = embedder.embed("doc").await.unwrap_err();
        assert!(matches!(err, EmbedError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // Bind then drop a listener so the port is known to be closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let embedder = VectorizerEmbedder::from_config(&config(&format!("http://{addr}"), 2)).unwrap();
        assert!(matches!(
            embedder.embed("doc").await,
            Err(EmbedError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_an_error() {
        // Accept and read the request, then hold the socket open without replying
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let embedder = VectorizerEmbedder::from_config(&EmbeddingConfig {
            request_timeout: Duration::from_millis(100),
            ..config(&format!("http://{addr}"), 2)
        })
        .unwrap();

        let err = embedder.embed("doc").await.unwrap_err();
        assert!(matches!(err, EmbedError::Http(ref e) if e.is_timeout()), "{err:?}");
        server.abort();
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        let mut cfg = config("", 2);
        assert!(matches!(
            VectorizerEmbedder::from_config(&cfg),
            Err(ConfigError::MissingVectorizerUrl)
        ));
        cfg.vectorizer_url = None;
        assert!(matches!(
            VectorizerEmbedder::from_config(&cfg),
            Err(ConfigError::MissingVectorizerUrl)
        ));
    }
}
