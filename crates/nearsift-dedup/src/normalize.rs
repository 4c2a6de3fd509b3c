//! Text normalization applied before hashing and embedding.
//!
//! Lowercases, replaces everything except ASCII letters, digits and whitespace
//! with a space, collapses whitespace runs and trims. Stopword removal is
//! optional and uses a fixed English list.

use std::collections::HashSet;
use std::sync::OnceLock;

const EN_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "cannot", "could", "couldn", "did", "didn", "do", "does", "doesn",
    "doing", "don", "down", "during", "each", "few", "for", "from", "further", "had", "hadn",
    "has", "hasn", "have", "haven", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "if", "in", "into", "is", "isn", "it", "its", "itself", "just",
    "ll", "m", "ma", "me", "mightn", "more", "most", "mustn", "my", "myself", "no", "nor", "not",
    "now", "o", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
    "out", "over", "own", "re", "s", "same", "shan", "she", "should", "shouldn", "so", "some",
    "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "wasn", "we", "were", "weren", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "won", "wouldn", "y", "you", "your", "yours", "yourself",
    "yourselves",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static STOPWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOPWORDS.get_or_init(|| EN_STOPWORDS.iter().copied().collect())
}

/// Normalize a single text.
#[must_use]
pub fn normalize_text(text: &str, remove_stopwords: bool) -> String {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let words = cleaned.split_whitespace();
    if remove_stopwords {
        let stop = stopwords();
        words
            .filter(|w| !stop.contains(w))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        words.collect::<Vec<_>>().join(" ")
    }
}

/// Normalize a batch of texts.
#[must_use]
pub fn normalize_all<S: AsRef<str>>(texts: &[S], remove_stopwords: bool) -> Vec<String> {
    texts
        .iter()
        .map(|t| normalize_text(t.as_ref(), remove_stopwords))
        .collect()
}
