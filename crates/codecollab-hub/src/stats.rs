//! Delivery counters and the serializable stats snapshot.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared atomic delivery counters.
///
/// Held behind its own `Arc` so role workers can record outcomes without
/// keeping the whole hub alive.
#[derive(Debug, Default)]
pub(crate) struct DeliveryStats {
    sent: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DeliveryStats {
    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of hub activity.
#[derive(Debug, Clone, Serialize)]
pub struct HubStats {
    /// Messages ever accepted by `send`.
    pub messages_sent: u64,
    /// Messages successfully processed by a role handler.
    pub messages_delivered: u64,
    /// Handler failures plus role-queue rejections.
    pub messages_failed: u64,
    /// Point-to-point messages with no registered handler.
    pub messages_dropped: u64,
    /// Length of the append-only message history.
    pub total_messages: u64,
    /// Messages waiting in the central delivery queue.
    pub queue_depth: usize,
    /// Conversation threads seen so far.
    pub active_conversations: usize,
    /// Negotiation sessions recorded so far.
    pub active_negotiations: usize,
    /// Roles with a live handler.
    pub subscribed_roles: usize,
    /// Installed broadcast observers.
    pub observers: usize,
    /// Seconds since the hub was created.
    pub uptime_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let stats = DeliveryStats::default();
        stats.record_sent();
        stats.record_sent();
        stats.record_delivered();
        stats.record_failed();
        stats.record_dropped();

        assert_eq!(stats.sent(), 2);
        assert_eq!(stats.delivered(), 1);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.dropped(), 1);
    }
}
