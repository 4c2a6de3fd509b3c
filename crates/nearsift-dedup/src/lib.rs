//! # nearsift-dedup
//!
//! Two-stage text deduplication.
//!
//! 1. **Exact**: records whose normalized text has the same fingerprint are
//!    collapsed onto their first occurrence.
//! 2. **Near**: survivors are embedded and indexed; each record's nearest
//!    neighbors are verified with a dual gate (cosine similarity AND lexical
//!    ratio) and greedily clustered around the first-seen representative.
//!
//! The same scoring is available for ad-hoc comparisons via [`Comparator`].
//!
//! # Example
//!
//! ```
//! use nearsift_dedup::{DedupConfig, Deduplicator, ModelCache};
//!
//! let cache = ModelCache::new();
//! let dedup = Deduplicator::from_cache(DedupConfig::default().with_model("hashing"), &cache).unwrap();
//! let outcome = dedup.run(&["First post!", "first post", "Another one"]).unwrap();
//!
//! assert_eq!(outcome.exact.duplicates.len(), 1);
//! assert_eq!(outcome.report(dedup.config()).final_records, 2);
//! ```

pub mod cluster;
pub mod compare;
pub mod error;
pub mod exact;
pub mod io;
pub mod near;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod scorer;
pub mod semantic;

pub use cluster::{Clustering, NearDupStats, UnionFind};
pub use compare::{Comparator, Comparison, RankedComparison};
pub use error::{DedupError, Result};
pub use exact::ExactDeduplicator;
pub use io::{
    collect_dir_files, detect_text_column, extract_text, extract_text_or_empty, read_texts, write_csv,
    write_jsonl, ArtifactRow, IngestedRow, InputFormat, IoError, NormalizedRow,
};
pub use near::{ClusterMode, NearDupConfig, NearDuplicateClusterer};
pub use normalize::{normalize_all, normalize_text};
pub use pipeline::{DedupConfig, DedupOutcome, Deduplicator, Disposition, IndexKind};
pub use report::{write_report, DedupReport};
pub use scorer::{cosine, lexical_ratio, SimilarityScore, SimilarityScorer};
pub use semantic::{load_backend, EmbeddingBackend, HashingBackend, MockBackend, ModelCache, SharedBackend};
