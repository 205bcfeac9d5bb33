//! Memory store contract and the in-memory backend.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

use crate::entry::{MemoryEntry, MemoryType};
use crate::error::MemoryResult;

/// Narrow storage contract agents depend on.
///
/// Exactly five operations; everything richer is built on top of them so
/// backends stay swappable.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist an entry, replacing any entry with the same id.
    async fn store(&self, entry: MemoryEntry) -> MemoryResult<bool>;

    /// Fetch an entry by id, recording the access.
    ///
    /// An expired entry is deleted on read and reported as absent.
    async fn retrieve(&self, id: &str) -> MemoryResult<Option<MemoryEntry>>;

    /// Find entries whose content contains `query` (case-insensitive),
    /// optionally restricted by type and tags, ordered by access count
    /// then recency, at most `limit` results.
    async fn search(
        &self,
        query: &str,
        memory_type: Option<MemoryType>,
        tags: Option<&[String]>,
        limit: usize,
    ) -> MemoryResult<Vec<MemoryEntry>>;

    /// Remove an entry. Returns `false`, not an error, when it was
    /// already gone.
    async fn delete(&self, id: &str) -> MemoryResult<bool>;

    /// Drop every expired entry, returning how many were removed.
    async fn cleanup_expired(&self) -> MemoryResult<usize>;
}

#[derive(Default)]
struct StoreInner {
    entries: HashMap<String, MemoryEntry>,
    by_type: HashMap<MemoryType, HashSet<String>>,
    by_tag: HashMap<String, HashSet<String>>,
}

impl StoreInner {
    fn index(&mut self, entry: &MemoryEntry) {
        self.by_type
            .entry(entry.memory_type)
            .or_default()
            .insert(entry.id.clone());
        for tag in &entry.tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(entry.id.clone());
        }
    }

    fn unindex(&mut self, entry: &MemoryEntry) {
        if let Some(ids) = self.by_type.get_mut(&entry.memory_type) {
            ids.remove(&entry.id);
        }
        for tag in &entry.tags {
            if let Some(ids) = self.by_tag.get_mut(tag) {
                ids.remove(&entry.id);
            }
        }
    }

    fn remove(&mut self, id: &str) -> Option<MemoryEntry> {
        let entry = self.entries.remove(id)?;
        self.unindex(&entry);
        Some(entry)
    }
}

/// Process-local backend: a locked map with type and tag indices.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn store(&self, entry: MemoryEntry) -> MemoryResult<bool> {
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.entries.remove(&entry.id) {
            inner.unindex(&previous);
        }
        inner.index(&entry);
        debug!(id = %entry.id, memory_type = ?entry.memory_type, "Stored memory entry");
        inner.entries.insert(entry.id.clone(), entry);
        Ok(true)
    }

    async fn retrieve(&self, id: &str) -> MemoryResult<Option<MemoryEntry>> {
        let mut inner = self.inner.write().await;
        let expired = inner.entries.get(id).is_some_and(|e| e.is_expired());
        if expired {
            inner.remove(id);
            debug!(id, "Expired memory entry deleted on read");
            return Ok(None);
        }
        Ok(inner.entries.get_mut(id).map(|entry| {
            entry.access();
            entry.clone()
        }))
    }

    async fn search(
        &self,
        query: &str,
        memory_type: Option<MemoryType>,
        tags: Option<&[String]>,
        limit: usize,
    ) -> MemoryResult<Vec<MemoryEntry>> {
        let inner = self.inner.read().await;
        let query = query.to_lowercase();

        let mut matches: Vec<MemoryEntry> = inner
            .entries
            .values()
            .filter(|e| !e.is_expired())
            .filter(|e| memory_type.is_none_or(|t| e.memory_type == t))
            .filter(|e| {
                tags.is_none_or(|wanted| wanted.iter().all(|t| e.tags.contains(t)))
            })
            .filter(|e| {
                query.is_empty() || e.content.to_string().to_lowercase().contains(&query)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| b.last_accessed.total_cmp(&a.last_accessed))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn delete(&self, id: &str) -> MemoryResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.remove(id).is_some())
    }

    async fn cleanup_expired(&self) -> MemoryResult<usize> {
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .entries
            .values()
            .filter(|e| e.is_expired())
            .map(|e| e.id.clone())
            .collect();
        for id in &expired {
            inner.remove(id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Cleaned up expired memory entries");
        }
        Ok(expired.len())
    }
}
