//! Error types for hub operations

use thiserror::Error;

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

/// Errors that can occur during hub operations
#[derive(Error, Debug)]
pub enum HubError {
    /// A role's bounded delivery queue rejected a message
    #[error("Role queue full for '{role}': capacity {capacity}")]
    RoleQueueFull { role: String, capacity: usize },

    /// A registered handler returned an error
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    /// A request did not receive a response in time
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Message serialization failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Generic hub error
    #[error("Hub error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::SerializationFailed(err.to_string())
    }
}
