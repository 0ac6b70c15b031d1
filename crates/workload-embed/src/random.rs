//! Deterministic random embeddings.
//!
//! The text is hashed to seed a PRNG, one standard-normal value is drawn per
//! dimension and the result is L2-normalized. The same text always maps to
//! the same unit vector, in every process.

use crate::error::EmbedError;
use crate::EmbeddingProvider;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use sha2::{Digest, Sha256};
use workload_core::Embedding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomEmbedder {
    dimensions: usize,
}

impl RandomEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Synchronous form of [`EmbeddingProvider::embed`]; never fails.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut rng = StdRng::seed_from_u64(seed_for(text));
        let raw: Vec<f64> = (0..self.dimensions)
            .map(|_| -> f64 { StandardNormal.sample(&mut rng) })
            .collect();

        let norm = raw.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            let mut unit = vec![0.0; self.dimensions];
            if let Some(first) = unit.first_mut() {
                *first = 1.0;
            }
            return unit;
        }
        raw.iter().map(|v| (v / norm) as f32).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for RandomEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Stable 64-bit seed derived from the text.
fn seed_for(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
