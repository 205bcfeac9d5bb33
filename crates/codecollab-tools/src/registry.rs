//! Name-keyed tool registry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::tool::Tool;

/// Holds the tools available to an agent, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let replaced = self
            .tools
            .write()
            .await
            .insert(name.clone(), tool)
            .is_some();
        if replaced {
            debug!(tool = %name, "Replaced registered tool");
        } else {
            info!(tool = %name, "Registered tool");
        }
    }

    /// Look up a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Names of all registered tools, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tools whose name or description contains `query` (case-insensitive).
    pub async fn search(&self, query: &str) -> Vec<Arc<dyn Tool>> {
        let query = query.to_lowercase();
        self.tools
            .read()
            .await
            .values()
            .filter(|t| {
                t.name().to_lowercase().contains(&query)
                    || t.description().to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    /// Tools in a given category.
    pub async fn by_category(&self, category: &str) -> Vec<Arc<dyn Tool>> {
        self.tools
            .read()
            .await
            .values()
            .filter(|t| t.category() == category)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{CodeAnalyzer, DocGenerator, TestGenerator};

    #[tokio::test]
    async fn registry_lists_and_searches() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(CodeAnalyzer)).await;
        registry.register(Arc::new(DocGenerator)).await;
        registry.register(Arc::new(TestGenerator)).await;

        let names = registry.list().await;
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"code_analyzer".to_string()));

        assert!(registry.get("code_analyzer").await.is_some());
        assert!(registry.get("nope").await.is_none());

        let found = registry.search("documentation").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "doc_generator");

        let generation = registry.by_category("generation").await;
        assert_eq!(generation.len(), 2);
    }
}
