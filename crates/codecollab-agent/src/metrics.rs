//! Per-agent activity metrics.

use serde::Serialize;

use codecollab_core::now_ts;

/// Running counters and the moving-average task latency.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    /// Moving average over completed tasks, in seconds.
    pub average_response_time: f64,
    /// Wall-clock time of the last message activity, float seconds.
    pub last_activity: f64,
}

impl AgentMetrics {
    /// Record a completed task and fold its latency into the average.
    pub fn record_completed(&mut self, response_time: f64) {
        self.tasks_completed += 1;
        let n = self.tasks_completed as f64;
        self.average_response_time =
            (self.average_response_time * (n - 1.0) + response_time) / n;
    }

    /// Record an incoming message.
    pub fn record_received(&mut self) {
        self.messages_received += 1;
        self.last_activity = now_ts();
    }
}
