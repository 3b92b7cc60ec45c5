//! Error types for boardsync wire data.

use thiserror::Error;

/// Errors that can occur converting board data to and from the wire.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Structurally valid JSON that is not a valid board shape
    #[error("invalid data: {0}")]
    InvalidData(String),
}
