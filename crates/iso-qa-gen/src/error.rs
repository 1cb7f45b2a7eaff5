//! Error types for iso-qa-gen

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for iso-qa-gen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a schema or building a plan
#[derive(Debug, Error)]
pub enum Error {
    /// Field identifier not present in the schema
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The schema document could not be parsed at all
    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A per-field configuration problem.
///
/// These never abort a run: the offending field is excluded from the
/// baseline and the plan, and the problem is carried through to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("Field {field_id}: {message}")]
pub struct ConfigError {
    /// Field the problem was found on
    pub field_id: String,
    /// Human-readable description
    pub message: String,
}

impl ConfigError {
    /// Create a new config error
    #[must_use]
    pub fn new(field_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            message: message.into(),
        }
    }
}
