//! Error types for the dedup engine.

use crate::io::IoError;
use nearsift_core::NearsiftError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during deduplication or comparison.
#[derive(Debug, Error)]
pub enum DedupError {
    /// Input records or parameters are malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The ANN index was not in a usable state for the request.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// The embedding provider failed or broke its contract.
    #[error("Embedding provider failure: {0}")]
    ProviderFailure(String),

    /// Text extraction failed for a single document.
    #[error("Failed to extract text from {}: {message}", path.display())]
    ExtractionFailure { path: PathBuf, message: String },

    /// Ingestion or artifact I/O failed.
    #[error(transparent)]
    Ingest(#[from] IoError),

    /// Core error.
    #[error(transparent)]
    Core(#[from] NearsiftError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DedupError>;
