//! Exact-duplicate detection by content fingerprint.
//!
//! A single linear pass keeps a set of seen fingerprints. The first record
//! carrying a fingerprint is the original; every later record with the same
//! fingerprint is an exact duplicate.

use nearsift_core::{Fingerprint, HashFunction, Partition, Record, Sha256Hasher};
use std::collections::HashSet;
use tracing::debug;

/// Partitions records into first-seen originals and exact duplicates.
#[derive(Debug, Clone, Default)]
pub struct ExactDeduplicator<H: HashFunction = Sha256Hasher> {
    hasher: H,
}

impl ExactDeduplicator {
    /// Create a detector using SHA-256 fingerprints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: HashFunction> ExactDeduplicator<H> {
    /// Create a detector with a custom hash function.
    #[must_use]
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }

    /// Name of the hash function in use.
    #[must_use]
    pub fn hasher_name(&self) -> &'static str {
        self.hasher.name()
    }

    /// Fingerprint a normalized text.
    #[must_use]
    pub fn fingerprint(&self, normalized_text: &str) -> Fingerprint {
        self.hasher.fingerprint(normalized_text.as_bytes())
    }

    /// Partition records, attaching a fingerprint to each.
    ///
    /// Both output groups keep input order.
    #[must_use]
    pub fn partition(&self, records: Vec<Record>) -> Partition<Record> {
        let mut seen: HashSet<Fingerprint> = HashSet::with_capacity(records.len());
        let mut flags = Vec::with_capacity(records.len());
        let mut stamped = Vec::with_capacity(records.len());

        for record in records {
            let fp = self.fingerprint(&record.normalized_text);
            flags.push(!seen.insert(fp));
            stamped.push(record.with_fingerprint(fp));
        }

        let partition = Partition::from_flags(stamped, &flags);
        debug!(
            originals = partition.originals.len(),
            duplicates = partition.duplicates.len(),
            "exact dedup pass complete"
        );
        partition
    }

    /// Partition positions of normalized texts.
    #[must_use]
    pub fn partition_texts<S: AsRef<str>>(&self, texts: &[S]) -> Partition<usize> {
        let mut seen: HashSet<Fingerprint> = HashSet::with_capacity(texts.len());
        let flags: Vec<bool> = texts
            .iter()
            .map(|t| !seen.insert(self.fingerprint(t.as_ref())))
            .collect();
        Partition::from_flags(0..texts.len(), &flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearsift_core::Blake3Hasher;

    fn records(texts: &[&str]) -> Vec<Record> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Record::new(i as u64 + 1, *t, *t))
            .collect()
    }

    #[test]
    fn test_first_occurrence_is_original() {
        let dedup = ExactDeduplicator::new();
        let p = dedup.partition(records(&["a", "b", "a", "c", "b", "a"]));

        let orig_ids: Vec<u64> = p.originals.iter().map(|r| r.id).collect();
        let dup_ids: Vec<u64> = p.duplicates.iter().map(|r| r.id).collect();
        assert_eq!(orig_ids, vec![1, 2, 4]);
        assert_eq!(dup_ids, vec![3, 5, 6]);
    }

    #[test]
    fn test_fingerprints_attached() {
        let dedup = ExactDeduplicator::new();
        let p = dedup.partition(records(&["x", "x"]));
        let fp = nearsift_core::fingerprint("x");
        assert_eq!(p.originals[0].fingerprint, Some(fp));
        assert_eq!(p.duplicates[0].fingerprint, Some(fp));
    }

    #[test]
    fn test_partition_is_exhaustive_and_disjoint() {
        let dedup = ExactDeduplicator::new();
        let input = records(&["q", "w", "q", "e", "w", "r", "q"]);
        let n = input.len();
        let p = dedup.partition(input);
        assert_eq!(p.len(), n);

        let mut ids: Vec<u64> = p
            .originals
            .iter()
            .chain(p.duplicates.iter())
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=n as u64).collect::<Vec<_>>());
    }

    #[test]
    fn test_idempotent_on_originals() {
        let dedup = ExactDeduplicator::new();
        let p = dedup.partition(records(&["a", "b", "a", "b", "c"]));
        let again = dedup.partition(p.originals.clone());
        assert!(again.duplicates.is_empty());
        assert_eq!(again.originals, p.originals);
    }

    #[test]
    fn test_empty_input() {
        let dedup = ExactDeduplicator::new();
        let p = dedup.partition(Vec::new());
        assert!(p.is_empty());
    }

    #[test]
    fn test_partition_texts_positions() {
        let dedup = ExactDeduplicator::with_hasher(Blake3Hasher::new());
        let p = dedup.partition_texts(&["x", "y", "x", "x"]);
        assert_eq!(p.originals, vec![0, 1]);
        assert_eq!(p.duplicates, vec![2, 3]);
        assert_eq!(dedup.hasher_name(), "blake3");
    }

    #[test]
    fn test_whitespace_difference_is_not_exact() {
        let dedup = ExactDeduplicator::new();
        let p = dedup.partition_texts(&["the cat", "the cat "]);
        assert_eq!(p.originals.len(), 2);
    }
}
