//! The communication hub: priority dispatch, role workers, observers,
//! request/response correlation, broadcast, and negotiation bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use codecollab_core::{
    AgentRole, ConversationThread, Message, MessageKind, NegotiationSession, Priority,
    ThreadStatus, meta,
};

use crate::error::{HubError, HubResult};
use crate::handler::MessageHandler;
use crate::queue::DeliveryQueue;
use crate::stats::{DeliveryStats, HubStats};

/// Configuration for the communication hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How long the dispatch loop waits for a message before re-checking
    /// the stop flag
    pub poll_interval: Duration,
    /// Capacity of each role's bounded delivery queue
    pub role_queue_capacity: usize,
    /// Timeout applied to `request` when the caller passes none
    pub default_request_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            role_queue_capacity: 64,
            default_request_timeout: Duration::from_secs(5),
        }
    }
}

/// A role's live registration: its bounded queue plus the worker draining it.
struct RoleEntry {
    tx: mpsc::Sender<Message>,
    generation: u64,
}

/// A request awaiting its correlated response.
struct PendingRequest {
    tx: oneshot::Sender<Message>,
    responder: AgentRole,
}

struct HubInner {
    config: HubConfig,
    queue: DeliveryQueue,
    roles: RwLock<HashMap<AgentRole, RoleEntry>>,
    observers: RwLock<Vec<(u64, Arc<dyn MessageHandler>)>>,
    pending: Mutex<HashMap<String, PendingRequest>>,
    conversations: RwLock<HashMap<String, ConversationThread>>,
    history: RwLock<Vec<Message>>,
    negotiations: RwLock<HashMap<String, NegotiationSession>>,
    stats: Arc<DeliveryStats>,
    running: AtomicBool,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
    created: Instant,
}

/// In-process message bus routing messages between agent roles.
///
/// Cheaply clonable; all clones share the same queues, registrations, and
/// history. Messages may be sent while the hub is stopped; they sit in the
/// delivery queue until `start` spawns the dispatch loop.
#[derive(Clone)]
pub struct CommunicationHub {
    inner: Arc<HubInner>,
}

impl Default for CommunicationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunicationHub {
    /// Create a hub with default configuration.
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with the given configuration.
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config,
                queue: DeliveryQueue::new(),
                roles: RwLock::new(HashMap::new()),
                observers: RwLock::new(Vec::new()),
                pending: Mutex::new(HashMap::new()),
                conversations: RwLock::new(HashMap::new()),
                history: RwLock::new(Vec::new()),
                negotiations: RwLock::new(HashMap::new()),
                stats: Arc::new(DeliveryStats::default()),
                running: AtomicBool::new(false),
                dispatch: Mutex::new(None),
                next_id: AtomicU64::new(1),
                created: Instant::now(),
            }),
        }
    }

    /// Start the dispatch loop. Idempotent.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(dispatch_loop(inner));
        *self.inner.dispatch.lock().await = Some(handle);
        info!("Communication hub started");
    }

    /// Stop the dispatch loop. Idempotent.
    ///
    /// Stopping is cooperative: the stop flag is cleared, the queue wait
    /// is woken, and the dispatch task is awaited, so an in-flight
    /// delivery always runs to completion and a popped message is never
    /// lost. Queued messages, history, and subscriptions survive, so a
    /// later `start` resumes where this left off.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.queue.wake();
        if let Some(mut handle) = self.inner.dispatch.lock().await.take() {
            // Abort only as a last resort, after the loop had a full
            // poll cycle to notice the flag.
            let grace = self.inner.config.poll_interval * 2;
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!("Dispatch task did not wind down in time, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
        info!("Communication hub stopped");
    }

    /// Whether the dispatch loop is running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Install the handler for a role, replacing any prior registration.
    ///
    /// The replaced role's worker winds down once its queue drains. The
    /// returned handle unsubscribes only the registration it was issued
    /// for, so a stale handle cannot evict a successor.
    pub async fn subscribe(
        &self,
        role: AgentRole,
        handler: Arc<dyn MessageHandler>,
    ) -> RoleSubscription {
        let generation = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.config.role_queue_capacity);
        // The worker captures only the stats Arc, never the hub inner,
        // so dropping the entry's tx is enough to wind it down.
        let stats = Arc::clone(&self.inner.stats);
        let _worker = tokio::spawn(role_worker(role, rx, handler, stats));

        let mut roles = self.inner.roles.write().await;
        if roles.insert(role, RoleEntry { tx, generation }).is_some() {
            debug!(role = %role, "Replaced existing role handler");
        }
        info!(role = %role, "Registered handler for role");
        RoleSubscription {
            hub: self.clone(),
            role,
            generation,
        }
    }

    /// Install a broadcast observer invoked for every dispatched message.
    pub async fn subscribe_to_all(&self, handler: Arc<dyn MessageHandler>) -> ObserverSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.write().await.push((id, handler));
        debug!(observer = id, "Registered broadcast observer");
        ObserverSubscription {
            hub: self.clone(),
            id,
        }
    }

    /// Accept a message for dispatch.
    ///
    /// The message is recorded in the append-only history and its
    /// conversation thread before it is queued, so introspection sees it
    /// even if no handler ever does.
    pub async fn send(&self, message: Message) -> HubResult<()> {
        self.record(&message).await;
        self.inner.stats.record_sent();
        debug!(
            id = %message.id,
            sender = %message.sender,
            recipient = %message.recipient,
            "Queued message"
        );
        self.inner.queue.push(message).await;
        Ok(())
    }

    /// Send a request and wait for its correlated response.
    ///
    /// Returns `None` on timeout or delivery failure. The pending
    /// correlation entry is removed on every exit path.
    pub async fn request(
        &self,
        sender: AgentRole,
        recipient: AgentRole,
        content: impl Into<String>,
        kind: MessageKind,
        timeout: Option<Duration>,
    ) -> Option<Message> {
        let timeout = timeout.unwrap_or(self.inner.config.default_request_timeout);
        let message = Message::builder(sender, recipient, kind, content)
            .requires_response(true)
            .build();
        let correlation_id = message.id.as_str().to_string();

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(
            correlation_id.clone(),
            PendingRequest {
                tx,
                responder: recipient,
            },
        );
        debug!(request = %correlation_id, recipient = %recipient, "Sending request");

        if self.send(message).await.is_err() {
            self.inner.pending.lock().await.remove(&correlation_id);
            return None;
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => {
                debug!(request = %correlation_id, "Received response");
                Some(response)
            }
            Ok(Err(_)) => {
                self.inner.pending.lock().await.remove(&correlation_id);
                warn!(request = %correlation_id, "Response channel closed");
                None
            }
            Err(_) => {
                self.inner.pending.lock().await.remove(&correlation_id);
                let fault = HubError::Timeout(timeout);
                warn!(request = %correlation_id, error = %fault, "Request gave up");
                None
            }
        }
    }

    /// Send one directed copy of `content` to every subscribed role except
    /// the sender. Returns the number of messages sent.
    pub async fn broadcast(
        &self,
        sender: AgentRole,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> HubResult<usize> {
        let content = content.into();
        let recipients: Vec<AgentRole> = {
            let roles = self.inner.roles.read().await;
            roles.keys().copied().filter(|r| *r != sender).collect()
        };

        let mut count = 0;
        for recipient in recipients {
            let message = Message::builder(sender, recipient, kind, content.clone())
                .metadata(meta::BROADCAST, true)
                .build();
            self.send(message).await?;
            count += 1;
        }
        debug!(sender = %sender, count, "Broadcast message");
        Ok(count)
    }

    /// Record a negotiation session and notify every participant.
    ///
    /// Resolution is left to the participants; the hub only stores the
    /// session and fans out the start notice.
    pub async fn start_negotiation(
        &self,
        participants: Vec<AgentRole>,
        topic: impl Into<String>,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> HubResult<String> {
        let session = NegotiationSession::new(participants.clone(), topic, data);
        let id = session.id.clone();
        let topic = session.topic.clone();
        self.inner
            .negotiations
            .write()
            .await
            .insert(id.clone(), session);

        let participant_names: Vec<&str> = participants.iter().map(|r| r.as_str()).collect();
        for role in &participants {
            let notice = Message::builder(
                AgentRole::Orchestrator,
                *role,
                MessageKind::Negotiation,
                format!("Negotiation started: {}", topic),
            )
            .priority(Priority::High)
            .metadata(meta::NEGOTIATION_ID, id.clone())
            .metadata(meta::ACTION, "start")
            .metadata(meta::PARTICIPANTS, serde_json::json!(participant_names))
            .build();
            self.send(notice).await?;
        }

        info!(negotiation = %id, participants = participants.len(), "Started negotiation");
        Ok(id)
    }

    /// Look up a conversation thread by id.
    pub async fn conversation(&self, id: &str) -> Option<ConversationThread> {
        self.inner.conversations.read().await.get(id).cloned()
    }

    /// The last `limit` messages exchanged between two roles, in either
    /// direction, oldest first.
    pub async fn conversation_history(
        &self,
        a: AgentRole,
        b: AgentRole,
        limit: usize,
    ) -> Vec<Message> {
        let history = self.inner.history.read().await;
        let matching: Vec<&Message> = history
            .iter()
            .filter(|m| {
                (m.sender == a && m.recipient == b) || (m.sender == b && m.recipient == a)
            })
            .collect();
        let start = matching.len().saturating_sub(limit);
        matching[start..].iter().map(|m| (*m).clone()).collect()
    }

    /// Update a conversation thread's status. Returns `false` when the
    /// thread is unknown. Threads never leave `Active` on their own;
    /// collaborators mark them completed or archived through this.
    pub async fn set_conversation_status(&self, id: &str, status: ThreadStatus) -> bool {
        match self.inner.conversations.write().await.get_mut(id) {
            Some(thread) => {
                thread.status = status;
                true
            }
            None => false,
        }
    }

    /// Look up a negotiation session by id.
    pub async fn negotiation(&self, id: &str) -> Option<NegotiationSession> {
        self.inner.negotiations.read().await.get(id).cloned()
    }

    /// Snapshot current hub activity.
    pub async fn stats(&self) -> HubStats {
        HubStats {
            messages_sent: self.inner.stats.sent(),
            messages_delivered: self.inner.stats.delivered(),
            messages_failed: self.inner.stats.failed(),
            messages_dropped: self.inner.stats.dropped(),
            total_messages: self.inner.history.read().await.len() as u64,
            queue_depth: self.inner.queue.len().await,
            active_conversations: self
                .inner
                .conversations
                .read()
                .await
                .values()
                .filter(|t| t.status == ThreadStatus::Active)
                .count(),
            active_negotiations: self.inner.negotiations.read().await.len(),
            subscribed_roles: self.inner.roles.read().await.len(),
            observers: self.inner.observers.read().await.len(),
            uptime_secs: self.inner.created.elapsed().as_secs_f64(),
        }
    }

    async fn record(&self, message: &Message) {
        {
            let mut conversations = self.inner.conversations.write().await;
            let thread = conversations
                .entry(message.conversation_id.as_str().to_string())
                .or_insert_with(|| {
                    ConversationThread::with_id(
                        message.conversation_id.clone(),
                        vec![message.sender, message.recipient],
                    )
                });
            thread.add_participant(message.sender);
            thread.add_participant(message.recipient);
            thread.add_message(message.clone());
        }
        self.inner.history.write().await.push(message.clone());
    }
}

/// Handle for a role registration; unsubscribes only its own generation.
pub struct RoleSubscription {
    hub: CommunicationHub,
    role: AgentRole,
    generation: u64,
}

impl RoleSubscription {
    /// The role this handle registered.
    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Remove this registration if it is still the live one.
    ///
    /// A handle made stale by a later `subscribe` for the same role is a
    /// no-op here; the successor keeps running.
    pub async fn unsubscribe(self) {
        let mut roles = self.hub.inner.roles.write().await;
        let live = roles
            .get(&self.role)
            .is_some_and(|entry| entry.generation == self.generation);
        if live {
            roles.remove(&self.role);
            info!(role = %self.role, "Unregistered handler for role");
        }
    }
}

/// Handle for a broadcast observer registration.
pub struct ObserverSubscription {
    hub: CommunicationHub,
    id: u64,
}

impl ObserverSubscription {
    /// Detach this observer from the hub.
    pub async fn remove(self) {
        self.hub
            .inner
            .observers
            .write()
            .await
            .retain(|(id, _)| *id != self.id);
        debug!(observer = self.id, "Removed broadcast observer");
    }
}

async fn dispatch_loop(inner: Arc<HubInner>) {
    debug!("Dispatch loop running");
    while inner.running.load(Ordering::SeqCst) {
        let Some(message) = inner.queue.pop_timeout(inner.config.poll_interval).await else {
            continue;
        };
        deliver(&inner, message).await;
    }
    debug!("Dispatch loop exited");
}

async fn deliver(inner: &Arc<HubInner>, message: Message) {
    // 1. Request/response correlation: resolve a pending request when the
    //    response references it and comes from the awaited responder.
    if let Some(response_to) = message.response_to() {
        let mut pending = inner.pending.lock().await;
        let matches = pending
            .get(response_to)
            .is_some_and(|p| p.responder == message.sender);
        if matches && let Some(p) = pending.remove(response_to) {
            if p.tx.send(message.clone()).is_err() {
                debug!(request = response_to, "Requester gave up before response arrived");
            }
        }
    }

    // 2. Point-to-point: hand to the recipient's bounded role queue.
    {
        let roles = inner.roles.read().await;
        match roles.get(&message.recipient) {
            Some(entry) => match entry.tx.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(m)) => {
                    inner.stats.record_failed();
                    let fault = HubError::RoleQueueFull {
                        role: m.recipient.to_string(),
                        capacity: inner.config.role_queue_capacity,
                    };
                    warn!(id = %m.id, error = %fault, "Delivery failed");
                }
                Err(TrySendError::Closed(m)) => {
                    inner.stats.record_failed();
                    warn!(role = %m.recipient, id = %m.id, "Role worker gone, delivery failed");
                }
            },
            None => {
                inner.stats.record_dropped();
                debug!(role = %message.recipient, id = %message.id, "No handler for role, dropped");
            }
        }
    }

    // 3. Observers, in registration order, each failure isolated.
    let observers: Vec<(u64, Arc<dyn MessageHandler>)> =
        inner.observers.read().await.iter().cloned().collect();
    for (id, observer) in observers {
        if let Err(e) = observer.handle(message.clone()).await {
            warn!(observer = id, error = %e, "Broadcast observer failed");
        }
    }
}

async fn role_worker(
    role: AgentRole,
    mut rx: mpsc::Receiver<Message>,
    handler: Arc<dyn MessageHandler>,
    stats: Arc<DeliveryStats>,
) {
    while let Some(message) = rx.recv().await {
        let id = message.id.clone();
        match handler.handle(message).await {
            Ok(()) => {
                stats.record_delivered();
                debug!(role = %role, id = %id, "Delivered message");
            }
            Err(e) => {
                stats.record_failed();
                warn!(role = %role, id = %id, error = %e, "Role handler failed");
            }
        }
    }
    debug!(role = %role, "Role worker wound down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler() -> (Arc<dyn MessageHandler>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handler = handler_fn(move |_message| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        (handler, count)
    }

    #[tokio::test]
    async fn stale_subscription_cannot_evict_successor() {
        let hub = CommunicationHub::new();
        let (first, _) = counting_handler();
        let (second, _) = counting_handler();

        let stale = hub.subscribe(AgentRole::Developer, first).await;
        let _live = hub.subscribe(AgentRole::Developer, second).await;

        stale.unsubscribe().await;
        assert_eq!(hub.stats().await.subscribed_roles, 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_live_registration() {
        let hub = CommunicationHub::new();
        let (handler, _) = counting_handler();
        let sub = hub.subscribe(AgentRole::Tester, handler).await;
        assert_eq!(hub.stats().await.subscribed_roles, 1);

        sub.unsubscribe().await;
        assert_eq!(hub.stats().await.subscribed_roles, 0);
    }

    #[tokio::test]
    async fn request_times_out_without_responder() {
        let hub = CommunicationHub::new();
        hub.start().await;

        let response = hub
            .request(
                AgentRole::ProductManager,
                AgentRole::Developer,
                "anyone there?",
                MessageKind::TaskRequest,
                Some(Duration::from_millis(50)),
            )
            .await;
        assert!(response.is_none());

        hub.stop().await;
    }

    #[tokio::test]
    async fn send_records_history_and_conversation() {
        let hub = CommunicationHub::new();
        let message = Message::builder(
            AgentRole::Developer,
            AgentRole::Reviewer,
            MessageKind::StatusUpdate,
            "build green",
        )
        .build();
        let conversation_id = message.conversation_id.as_str().to_string();
        hub.send(message).await.unwrap();

        let stats = hub.stats().await;
        assert_eq!(stats.messages_sent, 1);
        assert_eq!(stats.total_messages, 1);
        assert_eq!(stats.active_conversations, 1);

        let thread = hub.conversation(&conversation_id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread.messages[0].content, "build green");
    }

    #[tokio::test]
    async fn completed_threads_leave_the_active_count() {
        let hub = CommunicationHub::new();
        let first = Message::builder(
            AgentRole::Developer,
            AgentRole::Reviewer,
            MessageKind::StatusUpdate,
            "one",
        )
        .build();
        let first_thread = first.conversation_id.as_str().to_string();
        hub.send(first).await.unwrap();
        hub.send(
            Message::builder(
                AgentRole::ProductManager,
                AgentRole::Developer,
                MessageKind::StatusUpdate,
                "two",
            )
            .build(),
        )
        .await
        .unwrap();
        assert_eq!(hub.stats().await.active_conversations, 2);

        assert!(
            hub.set_conversation_status(&first_thread, ThreadStatus::Completed)
                .await
        );
        let stats = hub.stats().await;
        assert_eq!(stats.active_conversations, 1);
        assert_eq!(stats.total_messages, 2);

        assert!(
            !hub.set_conversation_status("unknown", ThreadStatus::Archived)
                .await
        );
    }

    #[tokio::test]
    async fn observer_remove_detaches_it() {
        let hub = CommunicationHub::new();
        hub.start().await;
        let (handler, count) = counting_handler();
        let observer = hub.subscribe_to_all(handler).await;

        hub.send(
            Message::builder(
                AgentRole::Developer,
                AgentRole::Tester,
                MessageKind::StatusUpdate,
                "first",
            )
            .build(),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        observer.remove().await;
        hub.send(
            Message::builder(
                AgentRole::Developer,
                AgentRole::Tester,
                MessageKind::StatusUpdate,
                "second",
            )
            .build(),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        hub.stop().await;
    }
}
