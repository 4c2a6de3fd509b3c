//! HNSW-based index for fast approximate nearest neighbor search.
//!
//! Wraps `instant-distance`. Builds are seeded; the graph is constructed in
//! parallel, so neighbor lists for near-tied candidates can still differ
//! between runs on very large inputs.

use super::index::{check_add, check_query, AnnIndex};
use crate::error::Result;
use instant_distance::{Builder, HnswMap, Search};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A point in the embedding space.
#[derive(Clone)]
struct EmbeddingPoint(Vec<f32>);

impl instant_distance::Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance; vectors are unit length.
        let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum();
        (1.0 - dot).max(0.0)
    }
}

/// HNSW index configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Size of the dynamic candidate list during construction.
    pub ef_construction: usize,
    /// Size of the dynamic candidate list during search. Caps how many
    /// neighbors a single query can return.
    pub ef_search: usize,
    /// Seed for level assignment.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            ef_construction: 50,
            ef_search: 100,
            seed: 0x5eed,
        }
    }
}

impl HnswConfig {
    /// Fast configuration (less accurate but faster).
    #[must_use]
    pub fn fast() -> Self {
        Self {
            ef_construction: 25,
            ef_search: 40,
            ..Self::default()
        }
    }

    /// Precise configuration (more accurate but slower).
    #[must_use]
    pub fn precise() -> Self {
        Self {
            ef_construction: 200,
            ef_search: 200,
            ..Self::default()
        }
    }

    /// Raise `ef_search` so a query can return at least `k` results.
    #[must_use]
    pub fn for_k(mut self, k: usize) -> Self {
        self.ef_search = self.ef_search.max(k);
        self
    }
}

/// HNSW-based index.
///
/// Vectors are added with dense ids, then `build()` constructs the graph.
pub struct HnswIndex {
    dim: usize,
    config: HnswConfig,
    points: Vec<EmbeddingPoint>,
    hnsw: Option<HnswMap<EmbeddingPoint, usize>>,
}

impl HnswIndex {
    /// Create a new empty index with default configuration.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self::with_config(dim, HnswConfig::default())
    }

    /// Create an index with custom configuration.
    #[must_use]
    pub fn with_config(dim: usize, config: HnswConfig) -> Self {
        Self {
            dim,
            config,
            points: Vec::new(),
            hnsw: None,
        }
    }

    /// Add all vectors and build in one step.
    pub fn from_vectors(dim: usize, vectors: &[Vec<f32>], config: HnswConfig) -> Result<Self> {
        let mut index = Self::with_config(dim, config);
        for (id, v) in vectors.iter().enumerate() {
            index.add(id, v.clone())?;
        }
        index.build();
        Ok(index)
    }

    /// Add a vector. Ids must be `0, 1, 2, ...`.
    ///
    /// Invalidates any previously built graph.
    pub fn add(&mut self, id: usize, embedding: Vec<f32>) -> Result<()> {
        check_add(self.points.len(), self.dim, id, &embedding)?;
        self.points.push(EmbeddingPoint(embedding));
        self.hnsw = None;
        Ok(())
    }

    /// Build the HNSW graph from added points. No-op on an empty index.
    pub fn build(&mut self) {
        if self.points.is_empty() {
            self.hnsw = None;
            return;
        }

        let values: Vec<usize> = (0..self.points.len()).collect();
        let hnsw = Builder::default()
            .ef_construction(self.config.ef_construction)
            .ef_search(self.config.ef_search)
            .seed(self.config.seed)
            .build(self.points.clone(), values);

        debug!(
            points = self.points.len(),
            ef_construction = self.config.ef_construction,
            ef_search = self.config.ef_search,
            "built HNSW index"
        );
        self.hnsw = Some(hnsw);
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Get the embedding dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl AnnIndex for HnswIndex {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn is_built(&self) -> bool {
        self.hnsw.is_some()
    }

    fn query_neighbors(&self, id: usize, k: usize) -> Result<Vec<usize>> {
        check_query(self, id)?;
        let Some(hnsw) = &self.hnsw else {
            return Ok(Vec::new());
        };

        let mut search = Search::default();
        Ok(hnsw
            .search(&self.points[id], &mut search)
            .take(k)
            .map(|item| *item.value)
            .collect())
    }
}
