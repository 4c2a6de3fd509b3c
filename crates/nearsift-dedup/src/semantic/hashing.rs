//! Feature-hashing embedder.
//!
//! Each whitespace token is hashed with seeded xxh3 into one of `dim` buckets
//! with a sign taken from a second hash bit, and the accumulated vector is
//! L2-normalized. Texts sharing most of their tokens land close together, which
//! makes this a usable model-free provider for lexical near-duplicates. A text
//! with no tokens hashes the empty token instead, so every output is unit norm.

use super::backend::{normalize, EmbeddingBackend};
use nearsift_core::hashing::hash_with_seed;

const TOKEN_SEED: u64 = 0x6e65_6172_7369_6674;

/// Model-free embedder based on signed feature hashing.
pub struct HashingBackend {
    dim: usize,
    name: String,
}

impl HashingBackend {
    /// Default dimension.
    pub const DEFAULT_DIM: usize = 384;

    /// Create a hashing backend with the given dimension.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            name: format!("hashing:{dim}"),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        if self.dim == 0 {
            return vector;
        }
        let mut tokens = text.split_whitespace().peekable();
        if tokens.peek().is_none() {
            self.add_token(&mut vector, "");
        }
        for token in tokens {
            self.add_token(&mut vector, token);
        }
        normalize(&mut vector);
        vector
    }
}

impl HashingBackend {
    fn add_token(&self, vector: &mut [f32], token: &str) {
        let h = hash_with_seed(token.as_bytes(), TOKEN_SEED);
        let bucket = (h % self.dim as u64) as usize;
        let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
        vector[bucket] += sign;
    }
}

impl Default for HashingBackend {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIM)
    }
}

impl EmbeddingBackend for HashingBackend {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, String> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
