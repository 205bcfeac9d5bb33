//! Tool execution manager: deadlines, history, usage stats.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::registry::ToolRegistry;
use crate::tool::{ToolOutcome, validate_args};

/// Aggregate usage counters for one tool.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolUsage {
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_duration_secs: f64,
}

/// Runs registered tools with validation, a deadline, and bookkeeping.
///
/// Every ending is reported as a [`ToolOutcome`]; `execute` never returns
/// an error to the caller.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    default_timeout: Duration,
    max_history: usize,
    history: Mutex<VecDeque<ToolOutcome>>,
    usage: Mutex<HashMap<String, ToolUsage>>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, default_timeout: Duration, max_history: usize) -> Self {
        Self {
            registry,
            default_timeout,
            max_history,
            history: Mutex::new(VecDeque::new()),
            usage: Mutex::new(HashMap::new()),
        }
    }

    /// The registry this executor draws tools from.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Invoke a tool by name.
    ///
    /// Missing tool and failed validation produce failure outcomes; a
    /// blown deadline produces a timeout outcome.
    pub async fn execute(
        &self,
        name: &str,
        args: serde_json::Map<String, serde_json::Value>,
        timeout: Option<Duration>,
    ) -> ToolOutcome {
        let deadline = timeout.unwrap_or(self.default_timeout);
        let started = Instant::now();

        let Some(tool) = self.registry.get(name).await else {
            let fault = ToolError::NotFound(name.to_string());
            warn!(tool = name, error = %fault, "Unknown tool requested");
            let outcome = ToolOutcome::failure(name, fault.to_string(), 0.0);
            self.record(outcome.clone()).await;
            return outcome;
        };

        if let Err(e) = validate_args(&tool.parameters(), &args) {
            let outcome = ToolOutcome::failure(name, e.to_string(), started.elapsed().as_secs_f64());
            self.record(outcome.clone()).await;
            return outcome;
        }

        let outcome = match tokio::time::timeout(deadline, tool.execute(args)).await {
            Ok(Ok(output)) => {
                let elapsed = started.elapsed().as_secs_f64();
                debug!(tool = name, elapsed, "Tool succeeded");
                ToolOutcome::success(name, output, elapsed)
            }
            Ok(Err(e)) => {
                let elapsed = started.elapsed().as_secs_f64();
                warn!(tool = name, error = %e, "Tool failed");
                ToolOutcome::failure(name, e.to_string(), elapsed)
            }
            Err(_) => {
                let fault = ToolError::Timeout(deadline);
                warn!(tool = name, error = %fault, "Tool timed out");
                ToolOutcome::timeout(name, fault.to_string(), deadline.as_secs_f64())
            }
        };
        self.record(outcome.clone()).await;
        outcome
    }

    /// Most recent outcomes, newest last, at most `limit`.
    pub async fn recent_outcomes(&self, limit: usize) -> Vec<ToolOutcome> {
        let history = self.history.lock().await;
        let start = history.len().saturating_sub(limit);
        history.iter().skip(start).cloned().collect()
    }

    /// Usage counters per tool name.
    pub async fn usage_stats(&self) -> HashMap<String, ToolUsage> {
        self.usage.lock().await.clone()
    }

    async fn record(&self, outcome: ToolOutcome) {
        {
            let mut usage = self.usage.lock().await;
            let entry = usage.entry(outcome.tool_name.clone()).or_default();
            entry.invocations += 1;
            if outcome.is_success() {
                entry.successes += 1;
            } else {
                entry.failures += 1;
            }
            entry.total_duration_secs += outcome.duration_secs;
        }
        let mut history = self.history.lock().await;
        history.push_back(outcome);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }
}
