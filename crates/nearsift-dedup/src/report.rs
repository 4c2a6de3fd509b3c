//! Run summary written next to the dedup artifacts.

use crate::cluster::NearDupStats;
use crate::io::Result;
use crate::near::ClusterMode;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Counts and settings for one dedup run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupReport {
    pub total_records: usize,
    pub exact_duplicates_removed: usize,
    pub near_duplicates_removed: usize,
    pub final_records: usize,
    /// `(total - final) / max(1, total)`.
    pub deduplication_rate: f64,
    /// RFC 3339, UTC.
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_column: Option<String>,
    pub model: String,
    pub cosine_threshold: f64,
    pub fuzzy_threshold: i32,
    pub ann_k: usize,
    pub cluster_mode: ClusterMode,
    pub near_dup_stats: NearDupStats,
    /// Artifact name to path.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, String>,
}

/// Fraction of input records removed, 0 for empty input.
#[must_use]
pub fn deduplication_rate(total: usize, final_records: usize) -> f64 {
    total.saturating_sub(final_records) as f64 / total.max(1) as f64
}

impl DedupReport {
    /// Record where the input came from.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>, text_column: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self.text_column = Some(text_column.into());
        self
    }

    /// Record an artifact path.
    pub fn add_artifact(&mut self, name: &str, path: &Path) {
        self.artifacts
            .insert(name.to_string(), path.display().to_string());
    }
}

/// Write `report` as pretty JSON, creating parent directories.
pub fn write_report<P: AsRef<Path>>(path: P, report: &DedupReport) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, report)?;
    writeln!(file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DedupReport {
        DedupReport {
            total_records: 10,
            exact_duplicates_removed: 3,
            near_duplicates_removed: 2,
            final_records: 5,
            deduplication_rate: deduplication_rate(10, 5),
            generated_at: "2026-01-01T00:00:00+00:00".into(),
            input: None,
            text_column: None,
            model: "hashing:384".into(),
            cosine_threshold: 0.9,
            fuzzy_threshold: 90,
            ann_k: 20,
            cluster_mode: ClusterMode::Greedy,
            near_dup_stats: NearDupStats::default(),
            artifacts: BTreeMap::new(),
        }
    }

    #[test]
    fn test_rate() {
        assert_eq!(deduplication_rate(0, 0), 0.0);
        assert_eq!(deduplication_rate(10, 5), 0.5);
        assert_eq!(deduplication_rate(4, 4), 0.0);
    }

    #[test]
    fn test_write_report_pretty_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.json");

        let mut report = sample().with_input("data.jsonl", "text");
        report.add_artifact("cleaned", Path::new("/tmp/cleaned.jsonl"));
        write_report(&path, &report).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"total_records\": 10"));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["deduplication_rate"], 0.5);
        assert_eq!(value["cluster_mode"], "greedy");
        assert_eq!(value["input"], "data.jsonl");
        assert_eq!(value["artifacts"]["cleaned"], "/tmp/cleaned.jsonl");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("input").is_none());
        assert!(value.get("artifacts").is_none());
    }
}
