//! Error types for memory operations

use thiserror::Error;

/// Result type for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors that can occur during memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Entry content could not be serialized
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Generic memory error
    #[error("Memory error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::SerializationFailed(err.to_string())
    }
}
