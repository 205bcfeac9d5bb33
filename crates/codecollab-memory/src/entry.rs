//! Memory entries and their classification.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use codecollab_core::now_ts;

/// What kind of knowledge an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Conversation,
    Task,
    Learning,
    Context,
    Fact,
    Pattern,
    Error,
}

/// Error returned when a wire memory priority is outside 1–5.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid memory priority: {0} (expected 1-5)")]
pub struct InvalidMemoryPriority(pub u8);

/// Retention priority. Serialized as the integers 5 (critical) down to
/// 1 (temporary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MemoryPriority {
    Temporary,
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPriority {
    /// Wire integer for this tier.
    pub fn as_u8(&self) -> u8 {
        match self {
            MemoryPriority::Temporary => 1,
            MemoryPriority::Low => 2,
            MemoryPriority::Medium => 3,
            MemoryPriority::High => 4,
            MemoryPriority::Critical => 5,
        }
    }
}

impl From<MemoryPriority> for u8 {
    fn from(p: MemoryPriority) -> u8 {
        p.as_u8()
    }
}

impl TryFrom<u8> for MemoryPriority {
    type Error = InvalidMemoryPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MemoryPriority::Temporary),
            2 => Ok(MemoryPriority::Low),
            3 => Ok(MemoryPriority::Medium),
            4 => Ok(MemoryPriority::High),
            5 => Ok(MemoryPriority::Critical),
            other => Err(InvalidMemoryPriority(other)),
        }
    }
}

/// One stored piece of agent knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub content: serde_json::Value,
    pub memory_type: MemoryType,
    pub priority: MemoryPriority,
    pub created_at: f64,
    pub last_accessed: f64,
    pub access_count: u64,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub expires_at: Option<f64>,
}

impl MemoryEntry {
    /// Create an entry with a fresh id and current timestamps.
    pub fn new(
        content: serde_json::Value,
        memory_type: MemoryType,
        priority: MemoryPriority,
    ) -> Self {
        let now = now_ts();
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            memory_type,
            priority,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            tags: Vec::new(),
            metadata: HashMap::new(),
            expires_at: None,
        }
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Expire the entry `ttl` from now.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(now_ts() + ttl.as_secs_f64());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Record a read: bump the access count and refresh the access time.
    pub fn access(&mut self) {
        self.access_count += 1;
        self.last_accessed = now_ts();
    }

    /// Whether the entry's TTL has elapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| now_ts() >= at)
    }
}
