//! Per-agent memory façade with a bounded footprint.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::entry::{MemoryEntry, MemoryPriority, MemoryType};
use crate::error::MemoryResult;
use crate::store::{InMemoryStore, MemoryStore};

/// An agent's view over a [`MemoryStore`].
///
/// Tracks the insertion order of its own entries and evicts the oldest
/// once the cap is exceeded, using only the five-operation contract so any
/// backend works.
pub struct AgentMemory {
    store: Arc<dyn MemoryStore>,
    max_entries: usize,
    owned: Mutex<VecDeque<String>>,
}

impl AgentMemory {
    /// Wrap an existing backend.
    pub fn new(store: Arc<dyn MemoryStore>, max_entries: usize) -> Self {
        Self {
            store,
            max_entries,
            owned: Mutex::new(VecDeque::new()),
        }
    }

    /// Convenience constructor over a fresh process-local backend.
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), max_entries)
    }

    /// Store a piece of knowledge, evicting the oldest owned entries past
    /// the cap. Returns the new entry's id.
    pub async fn remember(
        &self,
        content: serde_json::Value,
        memory_type: MemoryType,
        priority: MemoryPriority,
        tags: Vec<String>,
        ttl: Option<Duration>,
    ) -> MemoryResult<String> {
        let mut entry = MemoryEntry::new(content, memory_type, priority).with_tags(tags);
        if let Some(ttl) = ttl {
            entry = entry.with_ttl(ttl);
        }
        let id = entry.id.clone();
        self.store.store(entry).await?;

        let mut owned = self.owned.lock().await;
        owned.push_back(id.clone());
        while owned.len() > self.max_entries {
            if let Some(oldest) = owned.pop_front() {
                self.store.delete(&oldest).await?;
                debug!(id = %oldest, "Evicted oldest memory entry");
            }
        }
        Ok(id)
    }

    /// Fetch an entry by id.
    pub async fn recall(&self, id: &str) -> MemoryResult<Option<MemoryEntry>> {
        self.store.retrieve(id).await
    }

    /// Search this agent's backend.
    pub async fn search(
        &self,
        query: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> MemoryResult<Vec<MemoryEntry>> {
        self.store.search(query, memory_type, None, limit).await
    }

    /// Record one exchange of a conversation with another party.
    pub async fn remember_conversation(
        &self,
        with: &str,
        content: &str,
    ) -> MemoryResult<String> {
        self.remember(
            serde_json::json!({ "with": with, "content": content }),
            MemoryType::Conversation,
            MemoryPriority::Low,
            vec!["conversation".to_string(), with.to_string()],
            None,
        )
        .await
    }

    /// Record how a task went; failures are kept at higher priority so
    /// they outlive routine outcomes.
    pub async fn remember_task_outcome(
        &self,
        task: &str,
        success: bool,
        detail: serde_json::Value,
    ) -> MemoryResult<String> {
        let priority = if success {
            MemoryPriority::Medium
        } else {
            MemoryPriority::High
        };
        let outcome = if success { "success" } else { "failure" };
        self.remember(
            serde_json::json!({ "task": task, "outcome": outcome, "detail": detail }),
            MemoryType::Task,
            priority,
            vec!["task".to_string(), outcome.to_string()],
            None,
        )
        .await
    }

    /// Drop expired entries from the backend.
    pub async fn cleanup(&self) -> MemoryResult<usize> {
        self.store.cleanup_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cap_evicts_oldest_entries() {
        let memory = AgentMemory::in_memory(3);
        let mut ids = Vec::new();
        for i in 0..5 {
            let id = memory
                .remember(
                    serde_json::json!(format!("note {}", i)),
                    MemoryType::Fact,
                    MemoryPriority::Medium,
                    vec![],
                    None,
                )
                .await
                .unwrap();
            ids.push(id);
        }

        assert!(memory.recall(&ids[0]).await.unwrap().is_none());
        assert!(memory.recall(&ids[1]).await.unwrap().is_none());
        for id in &ids[2..] {
            assert!(memory.recall(id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn task_outcomes_tag_success_and_failure() {
        let memory = AgentMemory::in_memory(100);
        memory
            .remember_task_outcome("deploy", false, serde_json::json!("rollback"))
            .await
            .unwrap();
        memory
            .remember_task_outcome("lint", true, serde_json::json!(null))
            .await
            .unwrap();

        let failures = memory
            .search("deploy", Some(MemoryType::Task), 10)
            .await
            .unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].priority, MemoryPriority::High);
        assert!(failures[0].tags.contains(&"failure".to_string()));
    }

    #[tokio::test]
    async fn conversations_are_searchable_by_party() {
        let memory = AgentMemory::in_memory(100);
        memory
            .remember_conversation("pm", "need the API by friday")
            .await
            .unwrap();

        let found = memory
            .search("friday", Some(MemoryType::Conversation), 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].tags.contains(&"pm".to_string()));
    }
}
