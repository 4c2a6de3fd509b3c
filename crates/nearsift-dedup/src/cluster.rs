//! Cluster assignments and the union-find used for transitive clustering.

use nearsift_core::Partition;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters collected while clustering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NearDupStats {
    /// Candidate ids returned by the index and considered (self excluded).
    pub candidates_examined: usize,
    /// Pairs that passed the dual gate.
    pub pairs_verified: usize,
    /// Number of clusters (representatives).
    pub clusters: usize,
}

/// Mapping from record position to the position of its representative.
///
/// `representative_of[r] == r` for representatives; every other entry points
/// directly at a representative (never at another duplicate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clustering {
    pub representative_of: Vec<usize>,
    pub stats: NearDupStats,
}

impl Clustering {
    /// A clustering with no records.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            representative_of: Vec::new(),
            stats: NearDupStats::default(),
        }
    }

    /// Number of records covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.representative_of.len()
    }

    /// True when no records were clustered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.representative_of.is_empty()
    }

    /// Whether position `i` was claimed by another representative.
    #[must_use]
    pub fn is_duplicate(&self, i: usize) -> bool {
        self.representative_of[i] != i
    }

    /// Positions split into representatives and duplicates, input order kept.
    #[must_use]
    pub fn partition(&self) -> Partition<usize> {
        let flags: Vec<bool> = (0..self.len()).map(|i| self.is_duplicate(i)).collect();
        Partition::from_flags(0..self.len(), &flags)
    }

    /// Clusters with more than one member, keyed by representative.
    #[must_use]
    pub fn duplicate_groups(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &r) in self.representative_of.iter().enumerate() {
            if r != i {
                groups.entry(r).or_insert_with(|| vec![r]).push(i);
            }
        }
        groups
    }
}

/// Union-Find (Disjoint Set Union) with path compression and union-by-rank.
pub struct UnionFind {
    /// Parent pointers. parent[i] = j means i's parent is j.
    parent: Vec<usize>,
    /// Rank (approximate tree depth) for union-by-rank.
    rank: Vec<usize>,
}

impl UnionFind {
    /// Create a new Union-Find structure with n singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Find the root of the set containing x.
    pub fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    /// Union the sets containing x and y.
    ///
    /// Returns true if x and y were in different sets.
    pub fn union(&mut self, x: usize, y: usize) -> bool {
        let rx = self.find(x);
        let ry = self.find(y);

        if rx == ry {
            return false;
        }

        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }

        true
    }

    /// Check if x and y are in the same set.
    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }

    /// Map every element to the smallest element of its set.
    pub fn min_representatives(&mut self) -> Vec<usize> {
        let n = self.parent.len();
        let mut min_of_root: Vec<usize> = (0..n).collect();
        let roots: Vec<usize> = (0..n).map(|i| self.find(i)).collect();
        for (i, &root) in roots.iter().enumerate() {
            min_of_root[root] = min_of_root[root].min(i);
        }
        roots.into_iter().map(|root| min_of_root[root]).collect()
    }

    /// Get the total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Check if the structure is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
