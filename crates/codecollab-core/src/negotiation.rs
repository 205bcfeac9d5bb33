//! Negotiation sessions: recorded multi-party decision processes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::now_ts;
use crate::role::AgentRole;

/// Lifecycle state of a negotiation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Active,
    Resolved,
    Abandoned,
}

/// A recorded negotiation between a set of roles over a topic.
///
/// The hub only records the session and notifies participants; proposal
/// submission and resolution are an extension point left to the agents,
/// which is why `proposals` starts empty and `status` stays `Active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub id: String,
    pub participants: Vec<AgentRole>,
    pub topic: String,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub proposals: Vec<serde_json::Value>,
    pub status: NegotiationStatus,
    pub created_at: f64,
}

impl NegotiationSession {
    /// Open a new session over `topic` between `participants`.
    pub fn new(
        participants: Vec<AgentRole>,
        topic: impl Into<String>,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            participants,
            topic: topic.into(),
            data,
            proposals: Vec::new(),
            status: NegotiationStatus::Active,
            created_at: now_ts(),
        }
    }

    /// Whether the session is still accepting proposals.
    pub fn is_active(&self) -> bool {
        self.status == NegotiationStatus::Active
    }
}
