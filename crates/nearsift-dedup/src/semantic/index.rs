//! Nearest-neighbor index abstraction and an exact brute-force index.
//!
//! Ids are dense positions `0..len` in the order vectors were added. Indexes
//! must be built before they are queried.

use super::backend::cosine_similarity;
use crate::error::{DedupError, Result};
use std::cmp::Ordering;

/// Approximate (or exact) nearest-neighbor index over unit vectors.
pub trait AnnIndex {
    /// Number of vectors in the index.
    fn len(&self) -> usize;

    /// True when the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `build()` has completed since the last `add()`.
    fn is_built(&self) -> bool;

    /// Up to `k` ids nearest to the stored vector `id`, nearest first.
    ///
    /// The result may include `id` itself. Callers must not reorder it.
    fn query_neighbors(&self, id: usize, k: usize) -> Result<Vec<usize>>;
}

/// Check the query preconditions shared by all index implementations.
pub(crate) fn check_query(index: &impl AnnIndex, id: usize) -> Result<()> {
    if !index.is_built() {
        return Err(DedupError::PreconditionViolation(
            "index queried before build()".to_string(),
        ));
    }
    if id >= index.len() {
        return Err(DedupError::PreconditionViolation(format!(
            "query id {id} outside index of size {}",
            index.len()
        )));
    }
    Ok(())
}

/// Check an `add(id, vector)` call against the index state.
pub(crate) fn check_add(len: usize, dim: usize, id: usize, embedding: &[f32]) -> Result<()> {
    if id != len {
        return Err(DedupError::InvalidInput(format!(
            "index ids must be added densely in order: expected {len}, got {id}"
        )));
    }
    if embedding.len() != dim {
        return Err(DedupError::InvalidInput(format!(
            "embedding dimension mismatch: index is {dim}, vector is {}",
            embedding.len()
        )));
    }
    Ok(())
}

/// Exact nearest-neighbor index using a linear scan.
///
/// O(n) per query. Ties in similarity are broken by ascending id, so results
/// are fully deterministic.
pub struct BruteForceIndex {
    /// Embedding dimensionality.
    dim: usize,
    /// Embedding vectors (flattened for cache efficiency).
    vectors: Vec<f32>,
    len: usize,
    built: bool,
}

impl BruteForceIndex {
    /// Create a new empty index.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
            len: 0,
            built: false,
        }
    }

    /// Build an index directly from a list of vectors.
    pub fn from_vectors(dim: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::new(dim);
        index.vectors.reserve(vectors.len() * dim);
        for (id, v) in vectors.iter().enumerate() {
            index.add(id, v)?;
        }
        index.build();
        Ok(index)
    }

    /// Add a vector. Ids must be `0, 1, 2, ...`.
    pub fn add(&mut self, id: usize, embedding: &[f32]) -> Result<()> {
        check_add(self.len, self.dim, id, embedding)?;
        self.vectors.extend_from_slice(embedding);
        self.len += 1;
        self.built = false;
        Ok(())
    }

    /// Mark the index ready for queries.
    pub fn build(&mut self) {
        self.built = self.len > 0;
    }

    /// Get the embedding dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Get the vector stored under `id`.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        (id < self.len).then(|| &self.vectors[id * self.dim..(id + 1) * self.dim])
    }

    /// Search for the `k` nearest vectors to an arbitrary query.
    ///
    /// Returns `(id, similarity)` pairs, highest similarity first.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        debug_assert_eq!(query.len(), self.dim, "Query dimension mismatch");

        let mut matches: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim.max(1))
            .take(self.len)
            .enumerate()
            .map(|(id, v)| (id, cosine_similarity(query, v)))
            .collect();

        // Stable sort keeps ascending id among equal scores.
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        matches.truncate(k);
        matches
    }
}

impl AnnIndex for BruteForceIndex {
    fn len(&self) -> usize {
        self.len
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn query_neighbors(&self, id: usize, k: usize) -> Result<Vec<usize>> {
        check_query(self, id)?;
        let query = &self.vectors[id * self.dim..(id + 1) * self.dim];
        Ok(self.search(query, k).into_iter().map(|(j, _)| j).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::normalize;

    fn unit(v: &[f32]) -> Vec<f32> {
        let mut v = v.to_vec();
        normalize(&mut v);
        v
    }

    #[test]
    fn test_query_neighbors_ordering() {
        let vectors = vec![
            unit(&[1.0, 0.0, 0.0]),
            unit(&[0.0, 1.0, 0.0]),
            unit(&[0.9, 0.1, 0.0]),
            unit(&[0.7, 0.7, 0.0]),
        ];
        let index = BruteForceIndex::from_vectors(3, &vectors).unwrap();

        let neighbors = index.query_neighbors(0, 3).unwrap();
        assert_eq!(neighbors, vec![0, 2, 3]);
    }

    #[test]
    fn test_k_larger_than_pool() {
        let vectors = vec![unit(&[1.0, 0.0]), unit(&[0.0, 1.0])];
        let index = BruteForceIndex::from_vectors(2, &vectors).unwrap();
        let neighbors = index.query_neighbors(1, 50).unwrap();
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0], 1);
    }

    #[test]
    fn test_ties_break_by_id() {
        let v = unit(&[1.0, 1.0]);
        let index = BruteForceIndex::from_vectors(2, &[v.clone(), v.clone(), v]).unwrap();
        assert_eq!(index.query_neighbors(2, 3).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unbuilt_index_rejected() {
        let mut index = BruteForceIndex::new(2);
        index.add(0, &[1.0, 0.0]).unwrap();
        let err = index.query_neighbors(0, 1).unwrap_err();
        assert!(matches!(err, DedupError::PreconditionViolation(_)));
    }

    #[test]
    fn test_empty_index_never_built() {
        let mut index = BruteForceIndex::new(2);
        index.build();
        assert!(!index.is_built());
        assert!(index.is_empty());
    }

    #[test]
    fn test_out_of_range_id() {
        let index = BruteForceIndex::from_vectors(2, &[unit(&[1.0, 0.0])]).unwrap();
        let err = index.query_neighbors(5, 1).unwrap_err();
        assert!(matches!(err, DedupError::PreconditionViolation(_)));
    }

    #[test]
    fn test_add_rejects_gaps_and_bad_dims() {
        let mut index = BruteForceIndex::new(2);
        assert!(index.add(1, &[1.0, 0.0]).is_err());
        assert!(index.add(0, &[1.0]).is_err());
        index.add(0, &[1.0, 0.0]).unwrap();
        assert_eq!(index.get(0), Some(&[1.0, 0.0][..]));
        assert!(index.get(1).is_none());
    }
}
