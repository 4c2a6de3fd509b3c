//! Cache of loaded embedding backends, keyed by model identifier.
//!
//! Model loading is expensive, so callers hold one `ModelCache` for the life of
//! the process and pass it to every request. Backends are created on first use
//! and shared read-only afterwards.

use super::backend::EmbeddingBackend;
use crate::error::{DedupError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Shared, read-only handle to a loaded backend.
pub type SharedBackend = Arc<dyn EmbeddingBackend>;

/// Lazily populated map of model id to backend.
#[derive(Default)]
pub struct ModelCache {
    models: RwLock<HashMap<String, SharedBackend>>,
}

impl ModelCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached backend.
    #[must_use]
    pub fn get(&self, model_id: &str) -> Option<SharedBackend> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model_id)
            .cloned()
    }

    /// Get the backend for `model_id`, loading it with `load` on first use.
    ///
    /// Load failures are returned as [`DedupError::ProviderFailure`] and
    /// nothing is cached.
    pub fn get_or_load<F>(&self, model_id: &str, load: F) -> Result<SharedBackend>
    where
        F: FnOnce(&str) -> std::result::Result<SharedBackend, String>,
    {
        if let Some(backend) = self.get(model_id) {
            debug!(model_id, "model cache hit");
            return Ok(backend);
        }

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have loaded it while we waited for the lock.
        if let Some(backend) = models.get(model_id) {
            return Ok(Arc::clone(backend));
        }

        info!(model_id, "loading embedding model");
        let backend = load(model_id).map_err(DedupError::ProviderFailure)?;
        models.insert(model_id.to_string(), Arc::clone(&backend));
        Ok(backend)
    }

    /// Number of loaded models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no model has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
