//! Error types for nearsift.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, NearsiftError>;

/// Errors raised by the core crate.
#[derive(Error, Debug)]
pub enum NearsiftError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
