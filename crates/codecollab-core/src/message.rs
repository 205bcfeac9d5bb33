//! Message value type, builders, and the wire-format mapping.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::clock::now_ts;
use crate::role::AgentRole;

/// Well-known metadata keys used by the hub and the agent runtime.
pub mod meta {
    /// Id of the message a response correlates with.
    pub const RESPONSE_TO: &str = "response_to";
    /// Instance id of the agent that produced a response.
    pub const AGENT_ID: &str = "agent_id";
    /// Wall-clock time at which a response was produced.
    pub const PROCESSING_TIME: &str = "processing_time";
    /// Marks a message fanned out by `broadcast`.
    pub const BROADCAST: &str = "broadcast";
    /// Id of the negotiation session a notice belongs to.
    pub const NEGOTIATION_ID: &str = "negotiation_id";
    /// Negotiation lifecycle action ("start" is the only one the core emits).
    pub const ACTION: &str = "action";
    /// Participant role strings of a negotiation notice.
    pub const PARTICIPANTS: &str = "participants";
}

/// Unique identifier for a message.
///
/// `new()` generates a fresh id; `from_string()` preserves whatever it is
/// given verbatim, including the empty string, which is a valid id rather
/// than an "absent" one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new random message id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a message id from a string, preserved verbatim.
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the message id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the conversation thread a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    /// Create a new random conversation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a conversation id from a string, preserved verbatim.
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the conversation id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The seven kinds of messages agents exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    TaskRequest,
    TaskResponse,
    CollaborationRequest,
    StatusUpdate,
    ErrorReport,
    Negotiation,
    Consensus,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::TaskRequest => "task_request",
            MessageKind::TaskResponse => "task_response",
            MessageKind::CollaborationRequest => "collaboration_request",
            MessageKind::StatusUpdate => "status_update",
            MessageKind::ErrorReport => "error_report",
            MessageKind::Negotiation => "negotiation",
            MessageKind::Consensus => "consensus",
        };
        write!(f, "{}", s)
    }
}

/// Error returned when a wire priority integer is outside 1–4.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid message priority: {0} (expected 1-4)")]
pub struct InvalidPriority(pub u8);

/// Ordered urgency tier governing dispatch order.
///
/// Serialized as the integers 1–4 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Wire integer for this tier.
    pub fn as_u8(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.as_u8()
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Urgent),
            other => Err(InvalidPriority(other)),
        }
    }
}

/// Open string-keyed metadata mapping carried by every message.
pub type MessageMetadata = HashMap<String, serde_json::Value>;

fn de_metadata<'de, D>(deserializer: D) -> Result<MessageMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    // A `null` metadata input normalizes to the empty mapping, never to an
    // absent value.
    let opt = Option::<MessageMetadata>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// A message routed between agent roles.
///
/// Once created, `id`, `sender`, `recipient`, `kind`, and `timestamp` do
/// not change; `conversation_id` may be overwritten exactly once, when a
/// conversation thread claims the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier; generated when absent from the wire.
    #[serde(default = "MessageId::new")]
    pub id: MessageId,
    /// Sending role.
    pub sender: AgentRole,
    /// Receiving role.
    pub recipient: AgentRole,
    /// Message kind.
    #[serde(rename = "message_type")]
    pub kind: MessageKind,
    /// Opaque text payload.
    pub content: String,
    /// Urgency tier; defaults to medium.
    #[serde(default = "Priority::default_tier")]
    pub priority: Priority,
    /// Creation time as float seconds; generated when absent from the wire.
    #[serde(default = "now_ts")]
    pub timestamp: f64,
    /// Open metadata mapping; never absent.
    #[serde(default, deserialize_with = "de_metadata")]
    pub metadata: MessageMetadata,
    /// Whether the sender expects a correlated response.
    #[serde(default)]
    pub requires_response: bool,
    /// Owning conversation; generated when absent from the wire.
    #[serde(default = "ConversationId::new")]
    pub conversation_id: ConversationId,
}

impl Priority {
    fn default_tier() -> Priority {
        Priority::Medium
    }
}

impl Message {
    /// Start building a message between two roles.
    pub fn builder(
        sender: AgentRole,
        recipient: AgentRole,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> MessageBuilder {
        MessageBuilder {
            id: None,
            sender,
            recipient,
            kind,
            content: content.into(),
            priority: Priority::Medium,
            timestamp: None,
            metadata: HashMap::new(),
            requires_response: false,
            conversation_id: None,
        }
    }

    /// Start building a correlated reply to `original`.
    ///
    /// The reply flows from the original recipient back to the original
    /// sender, references the original id in `response_to` metadata, and
    /// stays in the same conversation thread.
    pub fn reply(original: &Message, kind: MessageKind, content: impl Into<String>) -> MessageBuilder {
        Message::builder(original.recipient, original.sender, kind, content)
            .metadata(meta::RESPONSE_TO, original.id.as_str())
            .conversation(original.conversation_id.clone())
    }

    /// Get a metadata value by key.
    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Get a metadata value as a string slice, if it is a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// Id of the message this one responds to, if any.
    pub fn response_to(&self) -> Option<&str> {
        self.metadata_str(meta::RESPONSE_TO)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON, applying the wire-format defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Fluent builder for [`Message`].
///
/// Id, timestamp, and conversation id are generated at `build()` when not
/// supplied; an explicitly supplied empty id is preserved verbatim.
pub struct MessageBuilder {
    id: Option<String>,
    sender: AgentRole,
    recipient: AgentRole,
    kind: MessageKind,
    content: String,
    priority: Priority,
    timestamp: Option<f64>,
    metadata: MessageMetadata,
    requires_response: bool,
    conversation_id: Option<ConversationId>,
}

impl MessageBuilder {
    /// Set an explicit message id (preserved verbatim, even when empty).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the priority tier.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set an explicit creation timestamp.
    pub fn timestamp(mut self, ts: f64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Add a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Flag the message as requiring a correlated response.
    pub fn requires_response(mut self, requires: bool) -> Self {
        self.requires_response = requires;
        self
    }

    /// Place the message into an existing conversation.
    pub fn conversation(mut self, id: ConversationId) -> Self {
        self.conversation_id = Some(id);
        self
    }

    /// Build the message, generating any absent identity fields.
    pub fn build(self) -> Message {
        Message {
            id: self.id.map(MessageId::from_string).unwrap_or_default(),
            sender: self.sender,
            recipient: self.recipient,
            kind: self.kind,
            content: self.content,
            priority: self.priority,
            timestamp: self.timestamp.unwrap_or_else(now_ts),
            metadata: self.metadata,
            requires_response: self.requires_response,
            conversation_id: self.conversation_id.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message::builder(
            AgentRole::ProductManager,
            AgentRole::Developer,
            MessageKind::TaskRequest,
            "implement login endpoint",
        )
        .priority(Priority::High)
        .metadata("sprint", "7")
        .build()
    }

    #[test]
    fn builder_generates_identity_fields() {
        let msg = sample();
        assert!(!msg.id.as_str().is_empty());
        assert!(!msg.conversation_id.as_str().is_empty());
        assert!(msg.timestamp > 0.0);
        assert!(!msg.requires_response);
    }

    #[test]
    fn explicit_empty_id_is_preserved() {
        let msg = Message::builder(
            AgentRole::Developer,
            AgentRole::Reviewer,
            MessageKind::StatusUpdate,
            "empty id test",
        )
        .id("")
        .build();
        assert_eq!(msg.id.as_str(), "");

        let json = msg.to_json().unwrap();
        let back = Message::from_json(&json).unwrap();
        assert_eq!(back.id.as_str(), "");
    }

    #[test]
    fn serialization_round_trips_every_field() {
        for kind in [
            MessageKind::TaskRequest,
            MessageKind::TaskResponse,
            MessageKind::CollaborationRequest,
            MessageKind::StatusUpdate,
            MessageKind::ErrorReport,
            MessageKind::Negotiation,
            MessageKind::Consensus,
        ] {
            for priority in [
                Priority::Low,
                Priority::Medium,
                Priority::High,
                Priority::Urgent,
            ] {
                for role in AgentRole::all() {
                    let msg = Message::builder(*role, AgentRole::Tester, kind, "round trip")
                        .priority(priority)
                        .metadata("k", "v")
                        .requires_response(true)
                        .build();
                    let back = Message::from_json(&msg.to_json().unwrap()).unwrap();
                    assert_eq!(back, msg);
                }
            }
        }
    }

    #[test]
    fn priority_serializes_as_integer() {
        let msg = sample();
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["priority"], serde_json::json!(3));
        assert_eq!(value["sender"], serde_json::json!("pm"));
        assert_eq!(value["message_type"], serde_json::json!("task_request"));
    }

    #[test]
    fn invalid_priority_is_rejected() {
        let err = Priority::try_from(7).unwrap_err();
        assert_eq!(err, InvalidPriority(7));
    }

    #[test]
    fn null_metadata_normalizes_to_empty_map() {
        let json = r#"{
            "id": "edge-1",
            "sender": "dev",
            "recipient": "pm",
            "message_type": "task_request",
            "content": "test",
            "priority": 2,
            "timestamp": 123456.0,
            "metadata": null
        }"#;
        let msg = Message::from_json(json).unwrap();
        assert!(msg.metadata.is_empty());
    }

    #[test]
    fn absent_fields_are_generated() {
        let json = r#"{
            "sender": "dev",
            "recipient": "pm",
            "message_type": "task_request",
            "content": "test"
        }"#;
        let msg = Message::from_json(json).unwrap();
        assert!(!msg.id.as_str().is_empty());
        assert!(!msg.conversation_id.as_str().is_empty());
        assert!(msg.timestamp > 0.0);
        assert_eq!(msg.priority, Priority::Medium);
        assert!(msg.metadata.is_empty());
        assert!(!msg.requires_response);
    }

    #[test]
    fn reply_correlates_and_stays_in_thread() {
        let request = sample();
        let reply = Message::reply(&request, MessageKind::TaskResponse, "done").build();
        assert_eq!(reply.sender, request.recipient);
        assert_eq!(reply.recipient, request.sender);
        assert_eq!(reply.response_to(), Some(request.id.as_str()));
        assert_eq!(reply.conversation_id, request.conversation_id);
    }

    #[test]
    fn priority_tiers_are_ordered() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Urgent);
    }
}
