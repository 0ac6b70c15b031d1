//! Embedding providers for vector workloads.
//!
//! Three interchangeable strategies implement [`EmbeddingProvider`]:
//!
//! - [`RandomEmbedder`] - deterministic, text-seeded unit vectors; no I/O
//! - [`OpenAiEmbedder`] - hosted embedding API; falls back to random vectors
//!   when no API key is configured
//! - [`VectorizerEmbedder`] - internal embedding microservice; failures
//!   propagate as [`EmbedError`]
//!
//! [`Embedder`] is the closed set of the three, chosen once from an
//! [`EmbeddingConfig`].

pub mod error;
pub mod openai;
pub mod random;
pub mod vectorizer;

pub use error::EmbedError;
pub use openai::OpenAiEmbedder;
pub use random::RandomEmbedder;
pub use vectorizer::VectorizerEmbedder;

use async_trait::async_trait;
use workload_core::{ConfigError, Embedding, EmbeddingConfig, EmbeddingMode};

/// Produces fixed-length vectors for arbitrary text.
///
/// Implementations are safe to share between concurrent callers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError>;

    /// Vector length, fixed at construction.
    fn dimensions(&self) -> usize;
}

/// The configured embedding strategy.
#[derive(Debug)]
pub enum Embedder {
    Random(RandomEmbedder),
    OpenAI(OpenAiEmbedder),
    Vectorizer(VectorizerEmbedder),
}

impl Embedder {
    /// Build the provider selected by `config.mode`.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(match config.mode {
            EmbeddingMode::Random => Embedder::Random(RandomEmbedder::new(config.dimensions)),
            EmbeddingMode::OpenAI => Embedder::OpenAI(OpenAiEmbedder::from_config(config)?),
            EmbeddingMode::Vectorizer => {
                Embedder::Vectorizer(VectorizerEmbedder::from_config(config)?)
            }
        })
    }

    pub fn mode(&self) -> EmbeddingMode {
        match self {
            Embedder::Random(_) => EmbeddingMode::Random,
            Embedder::OpenAI(_) => EmbeddingMode::OpenAI,
            Embedder::Vectorizer(_) => EmbeddingMode::Vectorizer,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for Embedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        match self {
            Embedder::Random(e) => e.embed(text).await,
            Embedder::OpenAI(e) => e.embed(text).await,
            Embedder::Vectorizer(e) => e.embed(text).await,
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Embedder::Random(e) => e.dimensions(),
            Embedder::OpenAI(e) => e.dimensions(),
            Embedder::Vectorizer(e) => e.dimensions(),
        }
    }
}

/// Reject vectors whose length differs from the configured dimensionality.
pub(crate) fn check_dimensions(
    embedding: Embedding,
    expected: usize,
) -> Result<Embedding, EmbedError> {
    if embedding.len() != expected {
        return Err(EmbedError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(embedding)
}

#[cfg(test)]
pub(crate) mod test_server {
    //! One-shot HTTP responder for exercising the network providers.

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve a single response and hand back the raw request text.
    pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }
}
