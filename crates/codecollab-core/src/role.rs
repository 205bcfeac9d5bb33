//! The closed set of agent roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed category of agent, used both as a sender/recipient address and
/// as the subscription key on the hub. Exactly one live handler exists per
/// role at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    #[serde(rename = "pm")]
    ProductManager,
    #[serde(rename = "dev")]
    Developer,
    Reviewer,
    Tester,
    Orchestrator,
}

impl AgentRole {
    /// Wire string for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::ProductManager => "pm",
            AgentRole::Developer => "dev",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Tester => "tester",
            AgentRole::Orchestrator => "orchestrator",
        }
    }

    /// All roles in declaration order.
    pub fn all() -> &'static [AgentRole] {
        &[
            AgentRole::ProductManager,
            AgentRole::Developer,
            AgentRole::Reviewer,
            AgentRole::Tester,
            AgentRole::Orchestrator,
        ]
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent role: '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for AgentRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pm" => Ok(AgentRole::ProductManager),
            "dev" => Ok(AgentRole::Developer),
            "reviewer" => Ok(AgentRole::Reviewer),
            "tester" => Ok(AgentRole::Tester),
            "orchestrator" => Ok(AgentRole::Orchestrator),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
