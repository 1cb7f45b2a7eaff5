//! Error types for iso-qa-report

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during report generation
#[derive(Debug, Error)]
pub enum Error {
    /// IO error (from std::io)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A finished report could not be moved into place
    #[error("Failed to persist {path}: {source}")]
    Persist {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Unknown report format name
    #[error("Unknown report format: {0}")]
    UnknownFormat(String),
}
