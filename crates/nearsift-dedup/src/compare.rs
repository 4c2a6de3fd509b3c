//! Pairwise and one-to-many comparison of normalized texts.
//!
//! No clustering state is involved: each candidate is scored against the
//! query only.

use crate::error::{DedupError, Result};
use crate::scorer::{SimilarityScore, SimilarityScorer};
use crate::semantic::{embed_all, EmbeddingBackend};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Score of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    #[serde(rename = "cosine_similarity")]
    pub cosine: f64,
    #[serde(rename = "levenshtein_ratio")]
    pub lexical_ratio: i32,
    pub is_duplicate: bool,
}

impl Comparison {
    fn from_score(score: SimilarityScore, scorer: &SimilarityScorer) -> Self {
        Self {
            cosine: score.cosine,
            lexical_ratio: score.lexical_ratio,
            is_duplicate: scorer.is_match(&score),
        }
    }
}

/// A candidate's comparison result, tagged with its input position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedComparison {
    pub position: usize,
    #[serde(flatten)]
    pub comparison: Comparison,
}

/// Compares normalized texts with an embedding backend and the dual gate.
pub struct Comparator<'a> {
    backend: &'a dyn EmbeddingBackend,
    scorer: SimilarityScorer,
}

impl<'a> Comparator<'a> {
    /// Create a comparator with the default thresholds.
    pub fn new(backend: &'a dyn EmbeddingBackend) -> Self {
        Self {
            backend,
            scorer: SimilarityScorer::default(),
        }
    }

    /// Use a specific scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: SimilarityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Active scorer.
    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Compare two texts. Both are embedded in a single batch.
    pub fn compare_pair(&self, a: &str, b: &str) -> Result<Comparison> {
        let embeddings = embed_all(self.backend, &[a, b], 2)?;
        let [ea, eb] = embeddings.as_slice() else {
            return Err(DedupError::ProviderFailure(
                "expected two embeddings for a pair".into(),
            ));
        };
        let score = self.scorer.score(ea, eb, a, b)?;
        Ok(Comparison::from_score(score, &self.scorer))
    }

    /// Compare `query` against every candidate.
    ///
    /// Results are ordered by cosine, then lexical ratio, both descending;
    /// equal scores keep candidate order. `top_n` truncates after sorting.
    /// An empty candidate list returns an empty result without embedding.
    pub fn compare_many<S: AsRef<str>>(
        &self,
        query: &str,
        candidates: &[S],
        top_n: Option<usize>,
    ) -> Result<Vec<RankedComparison>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = embed_all(self.backend, &[query], 1)?;
        let Some(q) = query_embedding.first() else {
            return Err(DedupError::ProviderFailure("no embedding for query".into()));
        };

        let texts: Vec<&str> = candidates.iter().map(AsRef::as_ref).collect();
        let embeddings = embed_all(self.backend, &texts, texts.len())?;

        let mut ranked = texts
            .iter()
            .zip(&embeddings)
            .enumerate()
            .map(|(position, (text, e))| {
                let score = self.scorer.score(q, e, query, text)?;
                Ok(RankedComparison {
                    position,
                    comparison: Comparison::from_score(score, &self.scorer),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        ranked.sort_by(|a, b| {
            b.comparison
                .cosine
                .partial_cmp(&a.comparison.cosine)
                .unwrap_or(Ordering::Equal)
                .then(b.comparison.lexical_ratio.cmp(&a.comparison.lexical_ratio))
        });
        if let Some(n) = top_n {
            ranked.truncate(n);
        }

        debug!(candidates = texts.len(), returned = ranked.len(), "ranked candidates");
        Ok(ranked)
    }
}
