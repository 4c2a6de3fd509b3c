//! Embedding providers and nearest-neighbor indexes.
//!
//! Backends implement [`EmbeddingBackend`]; indexes implement [`AnnIndex`].
//! [`load_backend`] resolves a model identifier:
//!
//! - `mock` / `mock:<dim>`: pseudo-random vectors keyed on text (tests)
//! - `hashing` / `hashing:<dim>`: token feature hashing, no model files
//! - anything else: a HuggingFace sentence-transformer (requires the
//!   `candle` feature)
//!
//! ```no_run
//! use nearsift_dedup::semantic::{load_backend, ModelCache};
//!
//! let cache = ModelCache::new();
//! let backend = cache.get_or_load("hashing", load_backend).unwrap();
//! assert_eq!(backend.embedding_dim(), 384);
//! ```

mod backend;
mod cache;
#[cfg(feature = "candle")]
mod candle;
mod hashing;
mod hnsw;
mod index;

pub use backend::{cosine_similarity, embed_all, normalize, EmbeddingBackend, MockBackend};
pub use cache::{ModelCache, SharedBackend};
#[cfg(feature = "candle")]
pub use candle::CandleBackend;
pub use hashing::HashingBackend;
pub use hnsw::{HnswConfig, HnswIndex};
pub use index::{AnnIndex, BruteForceIndex};

use std::sync::Arc;

/// Default dimension for the built-in backends.
pub const DEFAULT_DIM: usize = 384;

fn parse_dim(suffix: Option<&str>) -> Result<usize, String> {
    match suffix {
        None => Ok(DEFAULT_DIM),
        Some(s) => match s.parse::<usize>() {
            Ok(0) | Err(_) => Err(format!("invalid embedding dimension '{s}'")),
            Ok(d) => Ok(d),
        },
    }
}

/// Resolve a model identifier to a backend.
///
/// Intended as the loader for [`ModelCache::get_or_load`].
pub fn load_backend(model_id: &str) -> Result<SharedBackend, String> {
    let (kind, dim) = match model_id.split_once(':') {
        Some((kind, dim)) => (kind, Some(dim)),
        None => (model_id, None),
    };

    match kind {
        "mock" => Ok(Arc::new(MockBackend::new(parse_dim(dim)?))),
        "hashing" => Ok(Arc::new(HashingBackend::new(parse_dim(dim)?))),
        _ => load_model(model_id),
    }
}

#[cfg(feature = "candle")]
fn load_model(model_id: &str) -> Result<SharedBackend, String> {
    Ok(Arc::new(CandleBackend::new(model_id)?))
}

#[cfg(not(feature = "candle"))]
fn load_model(model_id: &str) -> Result<SharedBackend, String> {
    Err(format!(
        "model '{model_id}' requires building with the `candle` feature; \
         use 'hashing' for a model-free backend"
    ))
}
