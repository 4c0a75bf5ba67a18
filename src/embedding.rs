//! Embedding collaborator contract.
//!
//! The pipeline never computes embeddings itself; it hands batches of
//! normalized text to an [`Embedder`] implementation. Production deployments
//! wrap a model server or an in-process model; tests use the deterministic
//! [`MockEmbedder`].

use async_trait::async_trait;
use md5::{Digest, Md5};

use crate::types::RagError;

/// External embedding service.
///
/// Implementations should be deterministic (same text, same vector) so that
/// content-addressed deduplication stays coherent with vector search, but the
/// pipeline does not rely on it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text (query-side convenience).
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for &T {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        (**self).embed_many(texts).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        (**self).embed_one(text).await
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for std::sync::Arc<T> {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        (**self).embed_many(texts).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        (**self).embed_one(text).await
    }
}

/// Deterministic hash-seeded embedder for tests and offline runs.
///
/// Identical text always yields the identical unit-length vector; distinct
/// texts yield distinct vectors. The geometry is meaningless beyond
/// "self-similarity is maximal", which is exactly what pipeline tests need.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dim: usize,
}

impl MockEmbedder {
    /// Create a mock embedder producing vectors of the given dimension.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Vector dimension produced by this embedder.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let digest: [u8; 16] = Md5::digest(text.as_bytes()).into();
        let mut vector: Vec<f32> = (0..self.dim)
            .map(|i| {
                let byte = digest[i % digest.len()];
                let mixed = byte ^ (i as u8).wrapping_mul(31);
                f32::from(mixed) / 255.0 - 0.5
            })
            .collect();
        // Unit length, so brute-force cosine scores stay in [-1, 1].
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(self.embed_text(text))
    }
}
