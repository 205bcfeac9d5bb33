//! Agent lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an agent is in its lifecycle.
///
/// `Shutdown` is terminal; `Error` is left either by the recovery path
/// (within the retry budget) or by an external restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Initializing,
    Idle,
    Processing,
    WaitingForResponse,
    Collaborating,
    Error,
    Shutdown,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentState::Initializing => "initializing",
            AgentState::Idle => "idle",
            AgentState::Processing => "processing",
            AgentState::WaitingForResponse => "waiting_for_response",
            AgentState::Collaborating => "collaborating",
            AgentState::Error => "error",
            AgentState::Shutdown => "shutdown",
        };
        write!(f, "{}", s)
    }
}
