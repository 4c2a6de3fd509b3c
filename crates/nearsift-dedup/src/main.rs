//! nearsift CLI - exact and near-duplicate detection for text datasets.

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use nearsift_dedup::{
    collect_dir_files, extract_text, extract_text_or_empty, normalize_text, read_texts, write_csv,
    write_jsonl, write_report, ArtifactRow, ClusterMode, Comparator, Comparison, DedupConfig,
    DedupOutcome, Deduplicator, IndexKind, IngestedRow, ModelCache, NormalizedRow, SimilarityScorer,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exact and near-duplicate detection for text datasets.
///
/// Records are normalized and hashed to drop exact duplicates, then embedded
/// and clustered: two records are near duplicates only when both their cosine
/// similarity and their lexical (Indel) ratio clear the thresholds.
#[derive(Parser, Debug)]
#[command(name = "nearsift")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deduplicate a CSV, JSONL, JSON, TXT or Parquet file.
    Dedup(DedupArgs),
    /// Compare two documents.
    Compare(CompareArgs),
    /// Compare one document against every document in a directory.
    CompareDir(CompareDirArgs),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every command that scores text.
#[derive(Args, Debug)]
struct ScoringArgs {
    /// JSON config file; flags override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Remove English stopwords during normalization.
    #[arg(long)]
    remove_stopwords: bool,

    /// Embedding model: "hashing[:dim]", "mock[:dim]" or a HuggingFace id.
    #[arg(long)]
    model: Option<String>,

    /// Cosine similarity threshold [-1, 1].
    #[arg(long)]
    cosine_threshold: Option<f64>,

    /// Lexical ratio threshold [0, 100].
    #[arg(long)]
    fuzzy_threshold: Option<i32>,
}

#[derive(Args, Debug)]
struct DedupArgs {
    /// Input file path.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Column/field holding the text (auto-detected when omitted).
    #[arg(short = 'c', long = "text-column")]
    text_column: Option<String>,

    /// Directory for artifacts and the report.
    #[arg(short = 'o', long = "artifacts-dir", default_value = "artifacts")]
    artifacts_dir: PathBuf,

    #[command(flatten)]
    scoring: ScoringArgs,

    /// HNSW construction breadth.
    #[arg(long)]
    ef_construction: Option<usize>,

    /// Neighbors examined per record.
    #[arg(long)]
    ann_k: Option<usize>,

    /// Merge chains of matches into one cluster.
    #[arg(long)]
    transitive: bool,

    /// Use an exact linear scan instead of HNSW.
    #[arg(long)]
    brute_force: bool,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Show a progress spinner.
    #[arg(long)]
    progress: bool,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Query document.
    query: PathBuf,

    /// Target document.
    target: PathBuf,

    #[command(flatten)]
    scoring: ScoringArgs,
}

#[derive(Args, Debug)]
struct CompareDirArgs {
    /// Query document.
    query: PathBuf,

    /// Directory of candidate documents (searched recursively).
    dir: PathBuf,

    /// Number of best matches to print.
    #[arg(long, default_value = "50")]
    top_k: usize,

    #[command(flatten)]
    scoring: ScoringArgs,
}

#[derive(Serialize)]
struct CompareOutput {
    timestamp: String,
    query: String,
    target: String,
    #[serde(flatten)]
    comparison: Comparison,
}

#[derive(Serialize)]
struct MatchOutput {
    filename: String,
    #[serde(flatten)]
    comparison: Comparison,
}

#[derive(Serialize)]
struct CompareDirOutput {
    timestamp: String,
    query: String,
    directory: String,
    matches: Vec<MatchOutput>,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Create a spinner for indeterminate progress.
fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

/// Config file, then environment, then flags.
fn resolve_config(scoring: &ScoringArgs) -> Result<DedupConfig, Box<dyn std::error::Error>> {
    let base = match &scoring.config {
        Some(path) => DedupConfig::from_json_file(path)?,
        None => DedupConfig::default(),
    };
    let mut config = base.apply_env()?;

    if scoring.remove_stopwords {
        config.remove_stopwords = true;
    }
    if let Some(model) = &scoring.model {
        config.model = model.clone();
    }
    if let Some(c) = scoring.cosine_threshold {
        config.cosine_threshold = c;
    }
    if let Some(f) = scoring.fuzzy_threshold {
        config.fuzzy_threshold = f;
    }
    Ok(config)
}

fn require_file(path: &Path) {
    if !path.is_file() {
        fail(format_args!("file not found: {}", path.display()));
    }
}

fn run_dedup(args: &DedupArgs, cache: &ModelCache) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&args.input);

    let mut config = resolve_config(&args.scoring)?;
    if let Some(k) = args.ann_k {
        config.ann_k = k;
    }
    if let Some(ef) = args.ef_construction {
        config.ef_construction = ef;
    }
    if args.transitive {
        config.cluster_mode = ClusterMode::Transitive;
    }
    if args.brute_force {
        config.index = IndexKind::BruteForce;
    }
    if let Err(e) = config.validate() {
        fail(e);
    }

    let start = Instant::now();
    let pb = (args.progress && !args.json).then(|| create_spinner("Reading input..."));

    let ingested = read_texts(&args.input, args.text_column.as_deref())?;
    info!(
        records = ingested.texts.len(),
        column = %ingested.column,
        "loaded input"
    );

    if let Some(pb) = &pb {
        pb.set_message(format!("Loading model {}...", config.model));
    }
    let dedup = Deduplicator::from_cache(config, cache)?;

    if let Some(pb) = &pb {
        pb.set_message(format!("Deduplicating {} records...", ingested.texts.len()));
    }
    let outcome = dedup.run(&ingested.texts)?;

    if let Some(pb) = &pb {
        pb.set_message("Writing artifacts...");
    }
    std::fs::create_dir_all(&args.artifacts_dir)?;
    let ingested_path = args.artifacts_dir.join("ingested.csv");
    let normalized_path = args.artifacts_dir.join("normalized.csv");
    let exact_path = args.artifacts_dir.join("exact_dups.jsonl");
    let near_path = args.artifacts_dir.join("near_dups.jsonl");
    let cleaned_path = args.artifacts_dir.join("cleaned.jsonl");
    let report_path = args.artifacts_dir.join("report.json");

    let ingested_rows: Vec<IngestedRow> = outcome
        .records
        .iter()
        .map(|r| IngestedRow {
            temp_id: r.id,
            text: r.raw_text.clone(),
        })
        .collect();
    write_csv(&ingested_path, &ingested_rows)?;
    let normalized_rows: Vec<NormalizedRow> = outcome
        .records
        .iter()
        .map(|r| NormalizedRow {
            temp_id: r.id,
            text: r.raw_text.clone(),
            normalized: r.normalized_text.clone(),
        })
        .collect();
    write_csv(&normalized_path, &normalized_rows)?;

    write_jsonl(&exact_path, &duplicate_rows(&outcome, &outcome.exact.duplicates, true))?;
    write_jsonl(&near_path, &duplicate_rows(&outcome, &outcome.near.duplicates, false))?;
    let cleaned: Vec<ArtifactRow> = outcome
        .kept()
        .map(|r| ArtifactRow {
            id: r.id,
            text: r.raw_text.clone(),
            normalized_text: None,
            fingerprint: None,
            duplicate_of: None,
        })
        .collect();
    write_jsonl(&cleaned_path, &cleaned)?;

    let mut report = outcome
        .report(dedup.config())
        .with_input(args.input.display().to_string(), ingested.column.clone());
    report.add_artifact("ingested", &ingested_path);
    report.add_artifact("normalized", &normalized_path);
    report.add_artifact("exact_duplicates", &exact_path);
    report.add_artifact("near_duplicates", &near_path);
    report.add_artifact("cleaned", &cleaned_path);
    report.add_artifact("report", &report_path);
    write_report(&report_path, &report)?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!("Deduplication Results:");
        eprintln!("  Text column:        {}", ingested.column);
        eprintln!("  Total records:      {}", report.total_records);
        eprintln!("  Exact duplicates:   {}", report.exact_duplicates_removed);
        eprintln!("  Near duplicates:    {}", report.near_duplicates_removed);
        eprintln!("  Final records:      {}", report.final_records);
        eprintln!("  Deduplication rate: {:.2}%", report.deduplication_rate * 100.0);
        eprintln!();
        eprintln!("Cleaned dataset: {}", cleaned_path.display());
        eprintln!("Report:          {}", report_path.display());
        eprintln!("Total time: {:.3}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}

fn duplicate_rows(outcome: &DedupOutcome, positions: &[usize], with_fingerprint: bool) -> Vec<ArtifactRow> {
    positions
        .iter()
        .map(|&i| {
            let r = &outcome.records[i];
            ArtifactRow {
                id: r.id,
                text: r.raw_text.clone(),
                normalized_text: Some(r.normalized_text.clone()),
                fingerprint: r.fingerprint.filter(|_| with_fingerprint).map(|fp| fp.to_hex()),
                duplicate_of: outcome.duplicate_of(i),
            }
        })
        .collect()
}

fn scorer_for(config: &DedupConfig) -> SimilarityScorer {
    SimilarityScorer::new(config.cosine_threshold, config.fuzzy_threshold).unwrap_or_else(|e| fail(e))
}

fn run_compare(args: &CompareArgs, cache: &ModelCache) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&args.query);
    require_file(&args.target);

    let config = resolve_config(&args.scoring)?;
    let scorer = scorer_for(&config);

    let query = normalize_text(&extract_text(&args.query)?, config.remove_stopwords);
    let target = normalize_text(&extract_text(&args.target)?, config.remove_stopwords);

    let backend = cache.get_or_load(&config.model, nearsift_dedup::load_backend)?;
    let comparison = Comparator::new(backend.as_ref())
        .with_scorer(scorer)
        .compare_pair(&query, &target)?;

    let output = CompareOutput {
        timestamp: chrono::Utc::now().to_rfc3339(),
        query: args.query.display().to_string(),
        target: args.target.display().to_string(),
        comparison,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_compare_dir(args: &CompareDirArgs, cache: &ModelCache) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&args.query);
    if !args.dir.is_dir() {
        fail(format_args!("directory not found: {}", args.dir.display()));
    }

    let config = resolve_config(&args.scoring)?;
    let scorer = scorer_for(&config);

    let query = normalize_text(&extract_text(&args.query)?, config.remove_stopwords);
    let files = collect_dir_files(&args.dir)?;
    let candidates: Vec<String> = files
        .iter()
        .map(|path| normalize_text(&extract_text_or_empty(path), config.remove_stopwords))
        .collect();
    info!(files = files.len(), "collected candidate documents");

    let matches = if candidates.is_empty() {
        Vec::new()
    } else {
        let backend = cache.get_or_load(&config.model, nearsift_dedup::load_backend)?;
        Comparator::new(backend.as_ref())
            .with_scorer(scorer)
            .compare_many(&query, &candidates, Some(args.top_k))?
            .into_iter()
            .map(|ranked| MatchOutput {
                filename: files[ranked.position]
                    .strip_prefix(&args.dir)
                    .unwrap_or(&files[ranked.position])
                    .display()
                    .to_string(),
                comparison: ranked.comparison,
            })
            .collect()
    };

    let output = CompareDirOutput {
        timestamp: chrono::Utc::now().to_rfc3339(),
        query: args.query.display().to_string(),
        directory: args.dir.display().to_string(),
        matches,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Handle completions subcommand
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "nearsift", &mut io::stdout());
        return Ok(());
    }

    init_tracing(cli.verbose);
    let cache = ModelCache::new();

    let result = match &cli.command {
        Commands::Dedup(args) => run_dedup(args, &cache),
        Commands::Compare(args) => run_compare(args, &cache),
        Commands::CompareDir(args) => run_compare_dir(args, &cache),
        Commands::Completions { .. } => Ok(()),
    };
    if let Err(e) = result {
        fail(e);
    }
    Ok(())
}
