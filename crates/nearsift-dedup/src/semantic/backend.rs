//! Embedding backend abstractions.
//!
//! This module defines the `EmbeddingBackend` trait which can be implemented
//! for different embedding providers (local models, feature hashing, test
//! doubles), plus the batching helper the engine uses to call them.

use crate::error::{DedupError, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Trait for text embedding backends.
///
/// Contract:
/// - output length equals input length,
/// - every vector has `embedding_dim()` components and unit L2 norm,
/// - identical input and model give identical output,
/// - an empty input slice yields an empty output.
pub trait EmbeddingBackend: Send + Sync {
    /// Compute embeddings for a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, String>;

    /// Get the dimensionality of the embedding vectors.
    fn embedding_dim(&self) -> usize;

    /// Model name/identifier.
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Embed `texts` in chunks of `batch_size`, checking the provider contract.
///
/// An empty slice returns immediately without calling the backend. Errors and
/// contract breaches surface as [`DedupError::ProviderFailure`] and are never
/// retried.
pub fn embed_all<B>(backend: &B, texts: &[&str], batch_size: usize) -> Result<Vec<Vec<f32>>>
where
    B: EmbeddingBackend + ?Sized,
{
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let dim = backend.embedding_dim();
    let mut all = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let embeddings = backend
            .embed_batch(batch)
            .map_err(DedupError::ProviderFailure)?;
        if embeddings.len() != batch.len() {
            return Err(DedupError::ProviderFailure(format!(
                "{} returned {} embeddings for {} texts",
                backend.model_name(),
                embeddings.len(),
                batch.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
            return Err(DedupError::ProviderFailure(format!(
                "{} returned a {}-dim vector, expected {dim}",
                backend.model_name(),
                bad.len()
            )));
        }
        all.extend(embeddings);
    }

    debug!(
        model = backend.model_name(),
        count = all.len(),
        dim,
        "computed embeddings"
    );
    Ok(all)
}

/// A mock embedding backend for testing.
///
/// Generates deterministic pseudo-random unit vectors seeded by the text
/// hash. Identical texts produce identical embeddings; different texts are
/// close to orthogonal.
pub struct MockBackend {
    dim: usize,
}

impl MockBackend {
    /// Create a mock backend with the specified embedding dimension.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut embedding: Vec<f32> = (0..self.dim)
            .map(|_| {
                // LCG step
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                ((state >> 32) as f32) / (u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        normalize(&mut embedding);
        embedding
    }
}

impl EmbeddingBackend for MockBackend {
    fn embed_batch(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, String> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Normalize a vector to unit length in place. Zero vectors are left as-is.
pub fn normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Assumes vectors are already normalized to unit length.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
