//! Priority-then-FIFO delivery queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use codecollab_core::Message;

/// A queued message tagged with its enqueue sequence number.
///
/// Ordering is priority descending, then sequence ascending, so equal
/// priorities drain in arrival order.
struct QueuedMessage {
    message: Message,
    seq: u64,
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedMessage {}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.message
            .priority
            .cmp(&other.message.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The hub's central delivery queue.
///
/// Pushes are cheap and never block; the dispatch loop pops with a short
/// timeout so a stop request is noticed promptly. The queue survives the
/// dispatch loop, so messages sent while the hub is stopped are delivered
/// once it starts.
pub(crate) struct DeliveryQueue {
    heap: Mutex<BinaryHeap<QueuedMessage>>,
    seq: AtomicU64,
    notify: Notify,
}

impl DeliveryQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Enqueue a message for dispatch.
    pub(crate) async fn push(&self, message: Message) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.heap.lock().await.push(QueuedMessage { message, seq });
        self.notify.notify_one();
    }

    /// Pop the highest-priority message, waiting up to `wait` for one to
    /// arrive. Returns `None` when the wait elapses empty.
    pub(crate) async fn pop_timeout(&self, wait: Duration) -> Option<Message> {
        if let Some(message) = self.try_pop().await {
            return Some(message);
        }
        let _ = tokio::time::timeout(wait, self.notify.notified()).await;
        self.try_pop().await
    }

    async fn try_pop(&self) -> Option<Message> {
        self.heap.lock().await.pop().map(|q| q.message)
    }

    /// Wake a waiting pop without enqueuing anything, so the dispatch
    /// loop notices a stop request before the wait elapses.
    pub(crate) fn wake(&self) {
        self.notify.notify_one();
    }

    /// Current number of queued messages.
    pub(crate) async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codecollab_core::{AgentRole, MessageKind, Priority};

    fn msg(content: &str, priority: Priority) -> Message {
        Message::builder(
            AgentRole::Developer,
            AgentRole::Tester,
            MessageKind::StatusUpdate,
            content,
        )
        .priority(priority)
        .build()
    }

    #[tokio::test]
    async fn drains_by_priority_then_arrival_order() {
        let queue = DeliveryQueue::new();
        queue.push(msg("low", Priority::Low)).await;
        queue.push(msg("urgent-1", Priority::Urgent)).await;
        queue.push(msg("medium", Priority::Medium)).await;
        queue.push(msg("urgent-2", Priority::Urgent)).await;

        let mut order = Vec::new();
        while let Some(m) = queue.pop_timeout(Duration::from_millis(1)).await {
            order.push(m.content);
        }
        assert_eq!(order, vec!["urgent-1", "urgent-2", "medium", "low"]);
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let queue = DeliveryQueue::new();
        assert!(queue.pop_timeout(Duration::from_millis(5)).await.is_none());
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn push_wakes_a_waiting_pop() {
        let queue = std::sync::Arc::new(DeliveryQueue::new());
        let waiter = std::sync::Arc::clone(&queue);
        let pop = tokio::spawn(async move { waiter.pop_timeout(Duration::from_secs(5)).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(msg("wake", Priority::Medium)).await;

        let popped = pop.await.unwrap();
        assert_eq!(popped.unwrap().content, "wake");
    }
}
