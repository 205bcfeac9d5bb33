//! Conversation threads grouping related messages.

use serde::{Deserialize, Serialize};

use crate::clock::now_ts;
use crate::message::{ConversationId, Message};
use crate::role::AgentRole;

/// Lifecycle state of a conversation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Active,
    Completed,
    Archived,
}

/// An ordered transcript of messages between a set of participant roles.
///
/// Appending a message stamps the thread's id onto it, so a message can
/// only ever belong to the thread that claimed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationThread {
    pub id: ConversationId,
    pub participants: Vec<AgentRole>,
    pub messages: Vec<Message>,
    pub created_at: f64,
    pub status: ThreadStatus,
}

impl ConversationThread {
    /// Create an empty active thread between `participants`.
    pub fn new(participants: Vec<AgentRole>) -> Self {
        Self::with_id(ConversationId::new(), participants)
    }

    /// Create an empty active thread under a known conversation id.
    pub fn with_id(id: ConversationId, participants: Vec<AgentRole>) -> Self {
        Self {
            id,
            participants,
            messages: Vec::new(),
            created_at: now_ts(),
            status: ThreadStatus::Active,
        }
    }

    /// Add a participant if not already present.
    pub fn add_participant(&mut self, role: AgentRole) {
        if !self.participants.contains(&role) {
            self.participants.push(role);
        }
    }

    /// Append a message, claiming it for this thread.
    pub fn add_message(&mut self, mut message: Message) {
        message.conversation_id = self.id.clone();
        self.messages.push(message);
    }

    /// The most recent `limit` messages, oldest first.
    pub fn get_context(&self, limit: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    /// Number of messages in the thread.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the thread has no messages yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
