//! Error types for tool operations

use thiserror::Error;

/// Result type for tool operations
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur inside a tool or its plumbing
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool registered under the requested name
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Arguments failed parameter validation
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The tool itself failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool exceeded its deadline
    #[error("Execution timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::ExecutionFailed(err.to_string())
    }
}
