//! End-to-end deduplication: normalize, exact pass, embed, index, cluster.
//!
//! # Example
//!
//! ```
//! use nearsift_dedup::pipeline::{DedupConfig, Deduplicator};
//! use nearsift_dedup::semantic::ModelCache;
//!
//! let cache = ModelCache::new();
//! let config = DedupConfig::default().with_model("hashing");
//! let dedup = Deduplicator::from_cache(config, &cache).unwrap();
//!
//! let outcome = dedup.run(&["Hello, World!", "hello world", "something else"]).unwrap();
//! assert_eq!(outcome.exact.duplicates, vec![1]);
//! assert_eq!(outcome.kept().count(), 2);
//! ```

use crate::cluster::{Clustering, NearDupStats};
use crate::error::{DedupError, Result};
use crate::exact::ExactDeduplicator;
use crate::near::{ClusterMode, NearDupConfig, NearDuplicateClusterer, DEFAULT_K};
use crate::normalize::normalize_text;
use crate::report::{deduplication_rate, DedupReport};
use crate::scorer::{DEFAULT_COSINE_THRESHOLD, DEFAULT_FUZZY_THRESHOLD};
use crate::semantic::{
    embed_all, load_backend, AnnIndex, BruteForceIndex, HnswConfig, HnswIndex, ModelCache, SharedBackend,
};
use nearsift_core::{Fingerprint, NearsiftError, Partition, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Model used when none is configured.
#[cfg(feature = "candle")]
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Model used when none is configured.
#[cfg(not(feature = "candle"))]
pub const DEFAULT_MODEL: &str = "hashing";

/// Environment variable overriding the cosine threshold.
pub const ENV_COSINE_THRESHOLD: &str = "NEARSIFT_COSINE_THRESHOLD";
/// Environment variable overriding the fuzzy threshold.
pub const ENV_FUZZY_THRESHOLD: &str = "NEARSIFT_FUZZY_THRESHOLD";
/// Environment variable overriding the candidate count.
pub const ENV_ANN_K: &str = "NEARSIFT_ANN_K";
/// Environment variable overriding the model.
pub const ENV_MODEL: &str = "NEARSIFT_MODEL";

/// Nearest-neighbor index used for candidate generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Approximate HNSW graph.
    #[default]
    Hnsw,
    /// Exact linear scan.
    BruteForce,
}

/// Configuration for a dedup run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Drop English stopwords during normalization.
    pub remove_stopwords: bool,
    /// Embedding model identifier, resolved by [`load_backend`].
    pub model: String,
    /// Minimum cosine similarity for a near-duplicate.
    pub cosine_threshold: f64,
    /// Minimum lexical ratio (0-100) for a near-duplicate.
    pub fuzzy_threshold: i32,
    /// Candidates examined per representative.
    pub ann_k: usize,
    /// HNSW construction breadth.
    pub ef_construction: usize,
    /// HNSW search breadth; raised to `ann_k + 1` when building.
    pub ef_search: usize,
    /// Texts per embedding call.
    pub batch_size: usize,
    /// Greedy one-hop clusters, or transitive merging of matched pairs.
    pub cluster_mode: ClusterMode,
    /// Candidate index built over the survivors.
    pub index: IndexKind,
}

impl Default for DedupConfig {
    fn default() -> Self {
        let hnsw = HnswConfig::default();
        Self {
            remove_stopwords: false,
            model: DEFAULT_MODEL.to_string(),
            cosine_threshold: DEFAULT_COSINE_THRESHOLD,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            ann_k: DEFAULT_K,
            ef_construction: hnsw.ef_construction,
            ef_search: hnsw.ef_search,
            batch_size: 64,
            cluster_mode: ClusterMode::Greedy,
            index: IndexKind::Hnsw,
        }
    }
}

impl DedupConfig {
    /// Fast configuration (fewer candidates, smaller graph).
    #[must_use]
    pub fn fast() -> Self {
        let hnsw = HnswConfig::fast();
        Self {
            ann_k: 10,
            ef_construction: hnsw.ef_construction,
            ef_search: hnsw.ef_search,
            batch_size: 128,
            ..Self::default()
        }
    }

    /// Precise configuration (exact neighbor search, more candidates).
    #[must_use]
    pub fn precise() -> Self {
        let hnsw = HnswConfig::precise();
        Self {
            ann_k: 50,
            ef_construction: hnsw.ef_construction,
            ef_search: hnsw.ef_search,
            index: IndexKind::BruteForce,
            ..Self::default()
        }
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> nearsift_core::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            NearsiftError::InvalidFormat(format!("{}: {e}", path.as_ref().display()))
        })
    }

    /// Defaults overridden by `NEARSIFT_*` environment variables.
    pub fn from_env() -> nearsift_core::Result<Self> {
        Self::default().apply_env()
    }

    /// Override fields from `NEARSIFT_*` environment variables that are set.
    pub fn apply_env(mut self) -> nearsift_core::Result<Self> {
        if let Some(v) = env_parse(ENV_COSINE_THRESHOLD)? {
            self.cosine_threshold = v;
        }
        if let Some(v) = env_parse(ENV_FUZZY_THRESHOLD)? {
            self.fuzzy_threshold = v;
        }
        if let Some(v) = env_parse(ENV_ANN_K)? {
            self.ann_k = v;
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            if !model.is_empty() {
                self.model = model;
            }
        }
        Ok(self)
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set both thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, cosine_threshold: f64, fuzzy_threshold: i32) -> Self {
        self.cosine_threshold = cosine_threshold;
        self.fuzzy_threshold = fuzzy_threshold;
        self
    }

    /// Set the candidate count.
    #[must_use]
    pub fn with_ann_k(mut self, ann_k: usize) -> Self {
        self.ann_k = ann_k;
        self
    }

    /// Set the HNSW construction breadth.
    #[must_use]
    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    /// Enable or disable stopword removal.
    #[must_use]
    pub fn with_stopwords_removed(mut self, remove: bool) -> Self {
        self.remove_stopwords = remove;
        self
    }

    /// Set the clustering mode.
    #[must_use]
    pub fn with_cluster_mode(mut self, mode: ClusterMode) -> Self {
        self.cluster_mode = mode;
        self
    }

    /// Set the index kind.
    #[must_use]
    pub fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    /// Set the embedding batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Clustering parameters derived from this config.
    #[must_use]
    pub fn near_dup_config(&self) -> NearDupConfig {
        NearDupConfig::default()
            .with_thresholds(self.cosine_threshold, self.fuzzy_threshold)
            .with_k(self.ann_k)
            .with_mode(self.cluster_mode)
    }

    /// HNSW parameters derived from this config.
    #[must_use]
    pub fn hnsw_config(&self) -> HnswConfig {
        HnswConfig {
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            ..HnswConfig::default()
        }
        .for_k(self.ann_k.saturating_add(1))
    }

    /// Check every field is in range.
    pub fn validate(&self) -> Result<()> {
        self.near_dup_config().validate()?;
        if self.model.trim().is_empty() {
            return Err(DedupError::InvalidInput("model must not be empty".into()));
        }
        if self.ef_construction == 0 {
            return Err(DedupError::InvalidInput(
                "ef_construction must be at least 1".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(DedupError::InvalidInput("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> nearsift_core::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| NearsiftError::Config(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Disposition {
    Kept,
    ExactDuplicate { of: u64 },
    NearDuplicate { of: u64 },
}

/// Result of a dedup run.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// All records in input order, fingerprinted; survivors of the exact
    /// pass also carry their embedding.
    pub records: Vec<Record>,
    /// Per-record disposition, aligned with `records`.
    pub dispositions: Vec<Disposition>,
    /// Positions split by the exact pass.
    pub exact: Partition<usize>,
    /// Survivor positions split by near-duplicate clustering.
    pub near: Partition<usize>,
    /// Counters from the clustering pass.
    pub stats: NearDupStats,
    /// Backend that produced the embeddings.
    pub model: String,
}

impl DedupOutcome {
    /// Records left after both passes, in input order.
    pub fn kept(&self) -> impl Iterator<Item = &Record> {
        self.near.originals.iter().map(|&i| &self.records[i])
    }

    /// Exact duplicates, in input order.
    pub fn exact_duplicates(&self) -> impl Iterator<Item = &Record> {
        self.exact.duplicates.iter().map(|&i| &self.records[i])
    }

    /// Near duplicates, in input order.
    pub fn near_duplicates(&self) -> impl Iterator<Item = &Record> {
        self.near.duplicates.iter().map(|&i| &self.records[i])
    }

    /// Id of the record `records[i]` duplicates, if any.
    #[must_use]
    pub fn duplicate_of(&self, i: usize) -> Option<u64> {
        match self.dispositions[i] {
            Disposition::Kept => None,
            Disposition::ExactDuplicate { of } | Disposition::NearDuplicate { of } => Some(of),
        }
    }

    /// Summary report for this run.
    #[must_use]
    pub fn report(&self, config: &DedupConfig) -> DedupReport {
        let total = self.records.len();
        let final_records = self.near.originals.len();
        DedupReport {
            total_records: total,
            exact_duplicates_removed: self.exact.duplicates.len(),
            near_duplicates_removed: self.near.duplicates.len(),
            final_records,
            deduplication_rate: deduplication_rate(total, final_records),
            generated_at: chrono::Utc::now().to_rfc3339(),
            input: None,
            text_column: None,
            model: self.model.clone(),
            cosine_threshold: config.cosine_threshold,
            fuzzy_threshold: config.fuzzy_threshold,
            ann_k: config.ann_k,
            cluster_mode: config.cluster_mode,
            near_dup_stats: self.stats,
            artifacts: Default::default(),
        }
    }
}

/// Runs both dedup stages over a batch of texts.
pub struct Deduplicator {
    config: DedupConfig,
    backend: SharedBackend,
    clusterer: NearDuplicateClusterer,
    exact: ExactDeduplicator,
}

impl Deduplicator {
    /// Create a deduplicator with an explicit backend.
    pub fn new(config: DedupConfig, backend: SharedBackend) -> Result<Self> {
        config.validate()?;
        let clusterer = NearDuplicateClusterer::new(config.near_dup_config())?;
        Ok(Self {
            config,
            backend,
            clusterer,
            exact: ExactDeduplicator::new(),
        })
    }

    /// Create a deduplicator whose backend comes from `cache`.
    pub fn from_cache(config: DedupConfig, cache: &ModelCache) -> Result<Self> {
        config.validate()?;
        let backend = cache.get_or_load(&config.model, load_backend)?;
        Self::new(config, backend)
    }

    /// Active configuration.
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Deduplicate `texts`. Record ids are 1-based input positions.
    pub fn run<S: AsRef<str>>(&self, texts: &[S]) -> Result<DedupOutcome> {
        let records: Vec<Record> = texts
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let raw = raw.as_ref();
                Record::new(i as u64 + 1, raw, normalize_text(raw, self.config.remove_stopwords))
            })
            .collect();
        let total = records.len();

        // Exact pass
        let exact = self.exact.partition(records);
        let mut first_seen: HashMap<Fingerprint, u64> = HashMap::with_capacity(exact.originals.len());
        for record in &exact.originals {
            if let Some(fp) = record.fingerprint {
                first_seen.insert(fp, record.id);
            }
        }

        let mut dispositions = vec![Disposition::Kept; total];
        for record in &exact.duplicates {
            if let Some(of) = record.fingerprint.and_then(|fp| first_seen.get(&fp)) {
                dispositions[position(record)] = Disposition::ExactDuplicate { of: *of };
            }
        }
        info!(
            total,
            exact_duplicates = exact.duplicates.len(),
            "exact duplicate pass complete"
        );

        // Near pass over survivors
        let survivors = exact.originals;
        let survivor_texts: Vec<&str> = survivors.iter().map(|r| r.normalized_text.as_str()).collect();
        let embeddings = embed_all(self.backend.as_ref(), &survivor_texts, self.config.batch_size)?;
        let clustering = self.cluster(&survivor_texts, &embeddings)?;

        for (s, &r) in clustering.representative_of.iter().enumerate() {
            if r != s {
                dispositions[position(&survivors[s])] = Disposition::NearDuplicate { of: survivors[r].id };
            }
        }
        let survivor_positions: Vec<usize> = survivors.iter().map(position).collect();
        let near = clustering.partition().map(|s| survivor_positions[s]);
        info!(
            survivors = survivors.len(),
            near_duplicates = near.duplicates.len(),
            "near duplicate pass complete"
        );

        // Reassemble in input order
        let mut slots: Vec<Option<Record>> = vec![None; total];
        for (record, embedding) in survivors.into_iter().zip(embeddings) {
            let i = position(&record);
            slots[i] = Some(record.with_embedding(embedding));
        }
        let exact_duplicate_positions: Vec<usize> = exact.duplicates.iter().map(position).collect();
        for record in exact.duplicates {
            let i = position(&record);
            slots[i] = Some(record);
        }
        let records: Vec<Record> = slots.into_iter().flatten().collect();

        Ok(DedupOutcome {
            records,
            dispositions,
            exact: Partition {
                originals: survivor_positions,
                duplicates: exact_duplicate_positions,
            },
            near,
            stats: clustering.stats,
            model: self.backend.model_name().to_string(),
        })
    }

    fn cluster(&self, texts: &[&str], embeddings: &[Vec<f32>]) -> Result<Clustering> {
        if texts.is_empty() {
            return Ok(Clustering::empty());
        }
        let dim = self.backend.embedding_dim();
        let index: Box<dyn AnnIndex> = match self.config.index {
            IndexKind::Hnsw => Box::new(HnswIndex::from_vectors(dim, embeddings, self.config.hnsw_config())?),
            IndexKind::BruteForce => Box::new(BruteForceIndex::from_vectors(dim, embeddings)?),
        };
        debug!(kind = ?self.config.index, size = index.len(), "built candidate index");
        self.clusterer.cluster(texts, embeddings, index.as_ref())
    }
}

impl fmt::Debug for Deduplicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deduplicator")
            .field("config", &self.config)
            .field("model", &self.backend.model_name())
            .field("hasher", &self.exact.hasher_name())
            .finish_non_exhaustive()
    }
}

fn position(record: &Record) -> usize {
    (record.id - 1) as usize
}
