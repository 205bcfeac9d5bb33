//! Error types for agent operations

use thiserror::Error;

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur inside an agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// Behavior initialization failed; fatal to `start`
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// A message handler failed
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    /// The agent is shut down and cannot process messages
    #[error("Agent is shut down")]
    ShutDown,

    /// A memory operation failed
    #[error("Memory error: {0}")]
    Memory(#[from] codecollab_memory::MemoryError),

    /// A hub operation failed
    #[error("Hub error: {0}")]
    Hub(#[from] codecollab_hub::HubError),

    /// Generic agent error
    #[error("Agent error: {0}")]
    Other(String),
}
