//! Pairwise similarity: cosine over embeddings and a lexical edit ratio.
//!
//! A pair is a near-duplicate only when BOTH measures clear their thresholds.

use crate::error::{DedupError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default cosine similarity threshold.
pub const DEFAULT_COSINE_THRESHOLD: f64 = 0.9;
/// Default lexical ratio threshold (0-100).
pub const DEFAULT_FUZZY_THRESHOLD: i32 = 90;

/// Scores for one pair of records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Dot product of the two unit embeddings, in [-1, 1].
    pub cosine: f64,
    /// Normalized edit similarity, 0-100.
    pub lexical_ratio: i32,
}

/// Cosine similarity of two unit-norm vectors.
///
/// No renormalization is performed. Bit-identical non-zero vectors are pinned
/// to exactly 1.0.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(DedupError::InvalidInput(format!(
            "embedding dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a == b && a.iter().any(|x| *x != 0.0) {
        return Ok(1.0);
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    Ok(dot.clamp(-1.0, 1.0))
}

/// Lexical similarity ratio in 0..=100.
///
/// Indel similarity over characters: `2 * lcs / (len_a + len_b)`, scaled and
/// truncated. Identical strings (including two empty strings) score 100.
#[must_use]
pub fn lexical_ratio(a: &str, b: &str) -> i32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let ratio = 200 * lcs_len(&a, &b) / total;
    i32::try_from(ratio).unwrap_or(100)
}

/// Length of the longest common subsequence.
///
/// Bit-parallel over the shorter string, 64 positions per word.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (pattern, text) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let m = pattern.len();
    if m == 0 {
        return 0;
    }

    let words = m.div_ceil(64);
    let mut masks: HashMap<char, Vec<u64>> = HashMap::new();
    for (i, c) in pattern.iter().enumerate() {
        masks.entry(*c).or_insert_with(|| vec![0; words])[i / 64] |= 1u64 << (i % 64);
    }

    // Zero bits in `v` mark matched pattern positions.
    let mut v = vec![u64::MAX; words];
    for c in text {
        let Some(mask) = masks.get(c) else {
            continue;
        };
        let mut carry = 0u64;
        for (word, &m_word) in v.iter_mut().zip(mask) {
            let u = *word & m_word;
            let (sum, c1) = word.overflowing_add(u);
            let (sum, c2) = sum.overflowing_add(carry);
            carry = u64::from(c1 || c2);
            *word = sum | (*word & !m_word);
        }
    }

    if m % 64 != 0 {
        v[words - 1] |= u64::MAX << (m % 64);
    }
    v.iter().map(|w| w.count_zeros() as usize).sum()
}

/// Dual-gate scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScorer {
    /// Minimum cosine similarity.
    pub cosine_threshold: f64,
    /// Minimum lexical ratio.
    pub fuzzy_threshold: i32,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            cosine_threshold: DEFAULT_COSINE_THRESHOLD,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl SimilarityScorer {
    /// Create a scorer, validating both thresholds.
    pub fn new(cosine_threshold: f64, fuzzy_threshold: i32) -> Result<Self> {
        let scorer = Self {
            cosine_threshold,
            fuzzy_threshold,
        };
        scorer.validate()?;
        Ok(scorer)
    }

    /// Check that thresholds are within their ranges.
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.cosine_threshold) {
            return Err(DedupError::InvalidInput(format!(
                "cosine threshold must be within [-1, 1], got {}",
                self.cosine_threshold
            )));
        }
        if !(0..=100).contains(&self.fuzzy_threshold) {
            return Err(DedupError::InvalidInput(format!(
                "fuzzy threshold must be within [0, 100], got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }

    /// Score a pair.
    pub fn score(&self, a_vec: &[f32], b_vec: &[f32], a_text: &str, b_text: &str) -> Result<SimilarityScore> {
        Ok(SimilarityScore {
            cosine: cosine(a_vec, b_vec)?,
            lexical_ratio: lexical_ratio(a_text, b_text),
        })
    }

    /// The dual gate.
    #[must_use]
    pub fn is_match(&self, score: &SimilarityScore) -> bool {
        score.cosine >= self.cosine_threshold && score.lexical_ratio >= self.fuzzy_threshold
    }

    /// Score a pair and apply the gate.
    ///
    /// The lexical ratio is only computed when the cosine gate passes.
    pub fn matches(&self, a_vec: &[f32], b_vec: &[f32], a_text: &str, b_text: &str) -> Result<bool> {
        if cosine(a_vec, b_vec)? < self.cosine_threshold {
            return Ok(false);
        }
        Ok(lexical_ratio(a_text, b_text) >= self.fuzzy_threshold)
    }
}
