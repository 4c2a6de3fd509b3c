//! Near-duplicate clustering over ANN candidates.
//!
//! Each unassigned record, visited in input order, becomes a representative and
//! claims the unassigned candidates that pass the dual gate. Candidate order is
//! taken from the index as-is.

use crate::cluster::{Clustering, NearDupStats, UnionFind};
use crate::error::{DedupError, Result};
use crate::scorer::SimilarityScorer;
use crate::semantic::AnnIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default number of ANN candidates per query.
pub const DEFAULT_K: usize = 20;

/// How matched pairs are turned into clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMode {
    /// One pass in input order; a representative only claims its own matches.
    #[default]
    Greedy,
    /// Matched pairs are merged; chains collapse into one cluster.
    Transitive,
}

/// Configuration for the clustering engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearDupConfig {
    /// Minimum cosine similarity.
    pub cosine_threshold: f64,
    /// Minimum lexical ratio (0-100).
    pub fuzzy_threshold: i32,
    /// Candidates examined per representative, self excluded.
    pub k: usize,
    /// Clustering mode.
    pub mode: ClusterMode,
}

impl Default for NearDupConfig {
    fn default() -> Self {
        let scorer = SimilarityScorer::default();
        Self {
            cosine_threshold: scorer.cosine_threshold,
            fuzzy_threshold: scorer.fuzzy_threshold,
            k: DEFAULT_K,
            mode: ClusterMode::Greedy,
        }
    }
}

impl NearDupConfig {
    /// Set thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, cosine_threshold: f64, fuzzy_threshold: i32) -> Self {
        self.cosine_threshold = cosine_threshold;
        self.fuzzy_threshold = fuzzy_threshold;
        self
    }

    /// Set candidate count.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set clustering mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ClusterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate thresholds and `k`.
    pub fn validate(&self) -> Result<()> {
        self.scorer().validate()?;
        if self.k == 0 {
            return Err(DedupError::InvalidInput("k must be at least 1".into()));
        }
        Ok(())
    }

    fn scorer(&self) -> SimilarityScorer {
        SimilarityScorer {
            cosine_threshold: self.cosine_threshold,
            fuzzy_threshold: self.fuzzy_threshold,
        }
    }
}

/// Groups near-duplicate texts using ANN candidates and the dual gate.
#[derive(Debug, Clone)]
pub struct NearDuplicateClusterer {
    scorer: SimilarityScorer,
    k: usize,
    mode: ClusterMode,
}

impl Default for NearDuplicateClusterer {
    fn default() -> Self {
        let config = NearDupConfig::default();
        Self {
            scorer: config.scorer(),
            k: config.k,
            mode: config.mode,
        }
    }
}

impl NearDuplicateClusterer {
    /// Create a clusterer, validating the configuration.
    pub fn new(config: NearDupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scorer: config.scorer(),
            k: config.k,
            mode: config.mode,
        })
    }

    /// Candidate count per query.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Active clustering mode.
    #[must_use]
    pub fn mode(&self) -> ClusterMode {
        self.mode
    }

    /// Cluster `texts` whose embeddings were indexed in the same order.
    ///
    /// # Errors
    /// `InvalidInput` when `texts` and `embeddings` differ in length or a
    /// vector has the wrong dimension. `PreconditionViolation` when the index
    /// is empty, unbuilt, sized differently from `texts`, or returns an id
    /// outside `0..n`.
    pub fn cluster<S, I>(&self, texts: &[S], embeddings: &[Vec<f32>], index: &I) -> Result<Clustering>
    where
        S: AsRef<str>,
        I: AnnIndex + ?Sized,
    {
        if texts.len() != embeddings.len() {
            return Err(DedupError::InvalidInput(format!(
                "{} texts but {} embeddings",
                texts.len(),
                embeddings.len()
            )));
        }
        let n = texts.len();
        if n == 0 {
            return Ok(Clustering::empty());
        }
        if index.is_empty() || !index.is_built() {
            return Err(DedupError::PreconditionViolation(
                "index must be built over the records before clustering".into(),
            ));
        }
        if index.len() != n {
            return Err(DedupError::PreconditionViolation(format!(
                "index holds {} vectors but {} records were given",
                index.len(),
                n
            )));
        }

        let clustering = match self.mode {
            ClusterMode::Greedy => self.cluster_greedy(texts, embeddings, index)?,
            ClusterMode::Transitive => self.cluster_transitive(texts, embeddings, index)?,
        };

        info!(
            records = n,
            clusters = clustering.stats.clusters,
            candidates = clustering.stats.candidates_examined,
            verified = clustering.stats.pairs_verified,
            mode = ?self.mode,
            "near-duplicate clustering complete"
        );
        Ok(clustering)
    }

    fn cluster_greedy<S, I>(&self, texts: &[S], embeddings: &[Vec<f32>], index: &I) -> Result<Clustering>
    where
        S: AsRef<str>,
        I: AnnIndex + ?Sized,
    {
        let n = texts.len();
        let mut assigned = vec![false; n];
        let mut representative_of: Vec<usize> = (0..n).collect();
        let mut stats = NearDupStats::default();

        for i in 0..n {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            stats.clusters += 1;

            for j in self.candidates(index, i, n)? {
                stats.candidates_examined += 1;
                if assigned[j] {
                    continue;
                }
                if self
                    .scorer
                    .matches(&embeddings[i], &embeddings[j], texts[i].as_ref(), texts[j].as_ref())?
                {
                    debug!(representative = i, duplicate = j, "claimed near-duplicate");
                    representative_of[j] = i;
                    assigned[j] = true;
                    stats.pairs_verified += 1;
                }
            }
        }

        Ok(Clustering {
            representative_of,
            stats,
        })
    }

    fn cluster_transitive<S, I>(&self, texts: &[S], embeddings: &[Vec<f32>], index: &I) -> Result<Clustering>
    where
        S: AsRef<str>,
        I: AnnIndex + ?Sized,
    {
        let n = texts.len();
        let mut uf = UnionFind::new(n);
        let mut stats = NearDupStats::default();

        for i in 0..n {
            for j in self.candidates(index, i, n)? {
                stats.candidates_examined += 1;
                if uf.connected(i, j) {
                    continue;
                }
                if self
                    .scorer
                    .matches(&embeddings[i], &embeddings[j], texts[i].as_ref(), texts[j].as_ref())?
                {
                    uf.union(i, j);
                    stats.pairs_verified += 1;
                }
            }
        }

        let representative_of = uf.min_representatives();
        stats.clusters = representative_of
            .iter()
            .enumerate()
            .filter(|(i, r)| i == *r)
            .count();

        Ok(Clustering {
            representative_of,
            stats,
        })
    }

    /// Up to `k` candidate ids for `i`, self removed, index order kept.
    fn candidates<I: AnnIndex + ?Sized>(&self, index: &I, i: usize, n: usize) -> Result<Vec<usize>> {
        let neighbors = index.query_neighbors(i, self.k.saturating_add(1))?;
        let mut out = Vec::with_capacity(self.k.min(neighbors.len()));
        for j in neighbors.into_iter().filter(|&j| j != i).take(self.k) {
            if j >= n {
                return Err(DedupError::PreconditionViolation(format!(
                    "index returned id {j} outside 0..{n}"
                )));
            }
            out.push(j);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::BruteForceIndex;
    use std::cell::Cell;

    /// Index returning fixed candidate lists.
    struct ScriptedIndex {
        lists: Vec<Vec<usize>>,
        queries: Cell<usize>,
    }

    impl ScriptedIndex {
        fn new(lists: Vec<Vec<usize>>) -> Self {
            Self {
                lists,
                queries: Cell::new(0),
            }
        }
    }

    impl AnnIndex for ScriptedIndex {
        fn len(&self) -> usize {
            self.lists.len()
        }

        fn is_built(&self) -> bool {
            true
        }

        fn query_neighbors(&self, id: usize, k: usize) -> Result<Vec<usize>> {
            self.queries.set(self.queries.get() + 1);
            Ok(self.lists[id].iter().copied().take(k).collect())
        }
    }

    fn same_vectors(n: usize) -> Vec<Vec<f32>> {
        vec![vec![1.0, 0.0]; n]
    }

    fn permissive() -> NearDuplicateClusterer {
        NearDuplicateClusterer::new(NearDupConfig::default().with_thresholds(-1.0, 0)).unwrap()
    }

    #[test]
    fn test_empty_input_skips_index() {
        let index = ScriptedIndex::new(vec![]);
        let texts: Vec<&str> = vec![];
        let result = NearDuplicateClusterer::default().cluster(&texts, &[], &index).unwrap();
        assert!(result.is_empty());
        assert_eq!(index.queries.get(), 0);
    }

    #[test]
    fn test_unbuilt_index_rejected_before_loop() {
        let index = BruteForceIndex::new(2);
        let err = NearDuplicateClusterer::default()
            .cluster(&["a"], &same_vectors(1), &index)
            .unwrap_err();
        assert!(matches!(err, DedupError::PreconditionViolation(_)));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let index = ScriptedIndex::new(vec![vec![0], vec![1], vec![2]]);
        let err = NearDuplicateClusterer::default()
            .cluster(&["a", "b"], &same_vectors(2), &index)
            .unwrap_err();
        assert!(matches!(err, DedupError::PreconditionViolation(_)));
        assert_eq!(index.queries.get(), 0);
    }

    #[test]
    fn test_text_embedding_mismatch_rejected() {
        let index = ScriptedIndex::new(vec![vec![0], vec![1]]);
        let err = NearDuplicateClusterer::default()
            .cluster(&["a", "b"], &same_vectors(1), &index)
            .unwrap_err();
        assert!(matches!(err, DedupError::InvalidInput(_)));
    }

    #[test]
    fn test_out_of_range_candidate_rejected() {
        let index = ScriptedIndex::new(vec![vec![0, 7], vec![1]]);
        let err = permissive().cluster(&["a", "b"], &same_vectors(2), &index).unwrap_err();
        assert!(matches!(err, DedupError::PreconditionViolation(_)));
    }

    #[test]
    fn test_zero_k_rejected() {
        let err = NearDuplicateClusterer::new(NearDupConfig::default().with_k(0)).unwrap_err();
        assert!(matches!(err, DedupError::InvalidInput(_)));
    }

    #[test]
    fn test_greedy_is_one_hop() {
        // 0 matches 1, 1 matches 2, but 0 never sees 2.
        let index = ScriptedIndex::new(vec![vec![0, 1], vec![1, 0, 2], vec![2, 1]]);
        let result = permissive().cluster(&["a", "b", "c"], &same_vectors(3), &index).unwrap();
        assert_eq!(result.representative_of, vec![0, 0, 2]);
        assert_eq!(result.stats.clusters, 2);
        for (j, &r) in result.representative_of.iter().enumerate() {
            assert_eq!(result.representative_of[r], r, "representative of {j} is not a root");
        }
    }

    #[test]
    fn test_transitive_merges_chains() {
        let index = ScriptedIndex::new(vec![vec![0, 1], vec![1, 0, 2], vec![2, 1]]);
        let config = NearDupConfig::default()
            .with_thresholds(-1.0, 0)
            .with_mode(ClusterMode::Transitive);
        let clusterer = NearDuplicateClusterer::new(config).unwrap();
        let result = clusterer.cluster(&["a", "b", "c"], &same_vectors(3), &index).unwrap();
        assert_eq!(result.representative_of, vec![0, 0, 0]);
        assert_eq!(result.stats.clusters, 1);
    }

    #[test]
    fn test_first_claim_wins() {
        // 2 is a candidate of both 0 and 1; 0 is visited first.
        let index = ScriptedIndex::new(vec![vec![2], vec![2], vec![]]);
        let result = permissive().cluster(&["a", "b", "c"], &same_vectors(3), &index).unwrap();
        assert_eq!(result.representative_of, vec![0, 1, 0]);
    }

    #[test]
    fn test_self_filtered_and_k_respected() {
        let index = ScriptedIndex::new(vec![vec![0, 1, 2, 3], vec![1], vec![2], vec![3]]);
        let clusterer =
            NearDuplicateClusterer::new(NearDupConfig::default().with_thresholds(-1.0, 0).with_k(2)).unwrap();
        let result = clusterer.cluster(&["a", "b", "c", "d"], &same_vectors(4), &index).unwrap();
        // k + 1 = 3 ids fetched, self removed, so 1 and 2 are examined but not 3.
        assert_eq!(result.representative_of, vec![0, 0, 0, 3]);
    }

    #[test]
    fn test_dual_gate_applied() {
        let texts = ["the cat sat", "the cat sat", "completely different words"];
        let embeddings = same_vectors(3);
        let index = BruteForceIndex::from_vectors(2, &embeddings).unwrap();
        let result = NearDuplicateClusterer::default().cluster(&texts, &embeddings, &index).unwrap();
        // Identical vectors everywhere: only the lexical gate separates record 2.
        assert_eq!(result.representative_of, vec![0, 0, 2]);
        assert_eq!(result.partition().originals, vec![0, 2]);
        assert_eq!(result.partition().duplicates, vec![1]);
    }
}
