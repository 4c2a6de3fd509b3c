//! Common types for nearsift.

use crate::hashing::Fingerprint;
use serde::{Deserialize, Serialize};

/// A text record moving through the dedup stages.
///
/// Records are created once per input row. `fingerprint` and `embedding` are
/// attached as the record passes the hashing and embedding stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable id, 1-based, in order of first appearance.
    pub id: u64,
    /// Text as ingested.
    pub raw_text: String,
    /// Output of the normalizer.
    pub normalized_text: String,
    /// Content digest of `normalized_text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    /// Unit-norm embedding of `normalized_text`.
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl Record {
    /// Create a record with both text forms.
    #[must_use]
    pub fn new(id: u64, raw_text: impl Into<String>, normalized_text: impl Into<String>) -> Self {
        Self {
            id,
            raw_text: raw_text.into(),
            normalized_text: normalized_text.into(),
            fingerprint: None,
            embedding: None,
        }
    }

    /// Attach a fingerprint.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Attach an embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Two disjoint, exhaustive groups over an input sequence.
///
/// Both groups keep the relative input order of their members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition<T> {
    /// One entry per cluster (the representative / first occurrence).
    pub originals: Vec<T>,
    /// Everything else.
    pub duplicates: Vec<T>,
}

impl<T> Default for Partition<T> {
    fn default() -> Self {
        Self {
            originals: Vec::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<T> Partition<T> {
    /// Total number of items across both groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.originals.len() + self.duplicates.len()
    }

    /// True when both groups are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty() && self.duplicates.is_empty()
    }

    /// Split `items` by a per-item duplicate flag, preserving order.
    ///
    /// # Panics
    /// Panics if `items` and `is_duplicate` differ in length.
    pub fn from_flags(items: impl IntoIterator<Item = T>, is_duplicate: &[bool]) -> Self {
        let mut partition = Self::default();
        let mut flags = is_duplicate.iter();
        for item in items {
            match flags.next() {
                Some(true) => partition.duplicates.push(item),
                Some(false) => partition.originals.push(item),
                None => panic!("flag count mismatch: more items than flags"),
            }
        }
        assert!(
            flags.next().is_none(),
            "flag count mismatch: more flags than items"
        );
        partition
    }

    /// Map both groups.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Partition<U> {
        Partition {
            originals: self.originals.into_iter().map(&mut f).collect(),
            duplicates: self.duplicates.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::fingerprint;

    #[test]
    fn test_record_builders() {
        let rec = Record::new(1, "The Cat", "the cat")
            .with_fingerprint(fingerprint("the cat"))
            .with_embedding(vec![1.0, 0.0]);
        assert_eq!(rec.id, 1);
        assert_eq!(rec.fingerprint, Some(fingerprint("the cat")));
        assert_eq!(rec.embedding.as_deref(), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn test_record_serialization_skips_embedding() {
        let rec = Record::new(3, "a", "a").with_embedding(vec![0.5; 4]);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("embedding"));
        assert!(!json.contains("fingerprint"));
    }

    #[test]
    fn test_partition_from_flags() {
        let p = Partition::from_flags(vec!['a', 'b', 'c', 'd'], &[false, true, false, true]);
        assert_eq!(p.originals, vec!['a', 'c']);
        assert_eq!(p.duplicates, vec!['b', 'd']);
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn test_partition_map() {
        let p = Partition::from_flags(vec![1, 2, 3], &[false, false, true]).map(|x| x * 10);
        assert_eq!(p.originals, vec![10, 20]);
        assert_eq!(p.duplicates, vec![30]);
    }

    #[test]
    #[should_panic(expected = "more items than flags")]
    fn test_partition_surplus_items() {
        let _ = Partition::from_flags(vec![1, 2], &[false]);
    }

    #[test]
    #[should_panic(expected = "more flags than items")]
    fn test_partition_surplus_flags() {
        let _ = Partition::from_flags(vec![1], &[false, true]);
    }
}
