//! Error types for iso-qa-runner

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or executing a run
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP client could not be constructed
    #[error("Transport setup failed: {0}")]
    TransportSetup(String),

    /// Message payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}
