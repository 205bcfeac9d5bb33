//! Agent configuration and the capability taxonomy.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use codecollab_core::AgentRole;

/// What an agent can do, advertised in its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RequirementsAnalysis,
    CodeGeneration,
    CodeReview,
    Testing,
    Documentation,
    ProjectManagement,
    ArchitectureDesign,
    Debugging,
}

/// Static configuration for one agent instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Human-readable agent name.
    pub name: String,
    /// Role this agent handles on the hub.
    pub role: AgentRole,
    /// Advertised capabilities.
    pub capabilities: HashSet<Capability>,
    /// Bounded message-history capacity.
    pub max_history: usize,
    /// Per-agent memory footprint cap.
    pub memory_capacity: usize,
    /// Timeout used when this agent asks another for something.
    pub response_timeout: Duration,
    /// Consecutive faults tolerated before the agent parks in error.
    pub retry_budget: u32,
    /// Base of the linearly growing recovery backoff.
    pub backoff_base: Duration,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            role,
            capabilities: HashSet::new(),
            max_history: 1000,
            memory_capacity: 1000,
            response_timeout: Duration::from_secs(30),
            retry_budget: 3,
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_memory_capacity(mut self, memory_capacity: usize) -> Self {
        self.memory_capacity = memory_capacity;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }
}
