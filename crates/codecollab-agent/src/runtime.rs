//! The agent runtime: lifecycle, dispatch, and recovery around a behavior.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use codecollab_core::{AgentRole, Message, MessageKind, meta};
use codecollab_hub::{CommunicationHub, RoleSubscription, handler_fn};
use codecollab_memory::AgentMemory;
use codecollab_tools::{CodeAnalyzer, DocGenerator, TestGenerator, ToolExecutor, ToolRegistry};

use crate::behavior::AgentBehavior;
use crate::config::{AgentConfig, Capability};
use crate::error::{AgentError, AgentResult};
use crate::metrics::AgentMetrics;
use crate::state::AgentState;

/// How one message dispatch ended. The runtime's state machine is driven
/// by this value, never by unwinding.
pub enum DispatchOutcome {
    Completed(Option<String>),
    Failed(AgentError),
}

type KindHandler =
    Box<dyn Fn(Message) -> BoxFuture<'static, AgentResult<Option<String>>> + Send + Sync>;

struct AgentInner {
    id: String,
    config: AgentConfig,
    hub: CommunicationHub,
    behavior: Mutex<Box<dyn AgentBehavior>>,
    kind_handlers: RwLock<HashMap<MessageKind, KindHandler>>,
    state_tx: watch::Sender<AgentState>,
    history: Mutex<VecDeque<Message>>,
    metrics: Mutex<AgentMetrics>,
    memory: AgentMemory,
    tools: ToolExecutor,
    error_count: AtomicU32,
    last_error: Mutex<Option<String>>,
    subscription: Mutex<Option<RoleSubscription>>,
    started: Mutex<Option<Instant>>,
}

/// Serializable snapshot of an agent's condition.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    pub state: AgentState,
    pub capabilities: Vec<Capability>,
    /// Free-form summary from the behavior itself.
    pub behavior_summary: String,
    pub uptime_secs: f64,
    pub metrics: AgentMetrics,
    pub history_len: usize,
    pub error_count: u32,
    pub last_error: Option<String>,
}

/// Runs one behavior as a live agent on a hub.
///
/// Cheaply clonable; clones share all runtime state. The runtime owns the
/// hub subscription, the bounded message history, metrics, memory, tools,
/// and the recovery state machine, so behaviors stay small.
#[derive(Clone)]
pub struct AgentRuntime {
    inner: Arc<AgentInner>,
}

impl AgentRuntime {
    /// Create a runtime around a behavior. Nothing runs until `start`.
    pub fn new(config: AgentConfig, hub: CommunicationHub, behavior: Box<dyn AgentBehavior>) -> Self {
        let (state_tx, _) = watch::channel(AgentState::Initializing);
        let memory = AgentMemory::in_memory(config.memory_capacity);
        let tools = ToolExecutor::new(
            Arc::new(ToolRegistry::new()),
            config.response_timeout,
            100,
        );
        Self {
            inner: Arc::new(AgentInner {
                id: Uuid::new_v4().to_string(),
                config,
                hub,
                behavior: Mutex::new(behavior),
                kind_handlers: RwLock::new(HashMap::new()),
                state_tx,
                history: Mutex::new(VecDeque::new()),
                metrics: Mutex::new(AgentMetrics::default()),
                memory,
                tools,
                error_count: AtomicU32::new(0),
                last_error: Mutex::new(None),
                subscription: Mutex::new(None),
                started: Mutex::new(None),
            }),
        }
    }

    /// Unique instance id (distinct from the role).
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The agent's configured name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The role this agent handles.
    pub fn role(&self) -> AgentRole {
        self.inner.config.role
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AgentState {
        *self.inner.state_tx.borrow()
    }

    /// Watch channel over state transitions, for supervisors.
    pub fn state_watch(&self) -> watch::Receiver<AgentState> {
        self.inner.state_tx.subscribe()
    }

    /// This agent's memory.
    pub fn memory(&self) -> &AgentMemory {
        &self.inner.memory
    }

    /// This agent's tool executor.
    pub fn tools(&self) -> &ToolExecutor {
        &self.inner.tools
    }

    /// Bring the agent up: register tools, run behavior initialization,
    /// subscribe its role on the hub, go idle.
    ///
    /// # Errors
    ///
    /// An initialization failure is recorded, leaves the agent in the
    /// error state, and is returned to the caller. Shutdown is terminal;
    /// starting a stopped agent fails.
    pub async fn start(&self) -> AgentResult<()> {
        if self.state() == AgentState::Shutdown {
            return Err(AgentError::ShutDown);
        }
        self.set_state(AgentState::Initializing);

        let registry = self.inner.tools.registry();
        registry.register(Arc::new(CodeAnalyzer)).await;
        registry.register(Arc::new(DocGenerator)).await;
        registry.register(Arc::new(TestGenerator)).await;

        if let Err(e) = self.inner.behavior.lock().await.initialize().await {
            *self.inner.last_error.lock().await = Some(e.to_string());
            self.set_state(AgentState::Error);
            error!(agent = %self.inner.config.name, error = %e, "Agent initialization failed");
            return Err(AgentError::InitializationFailed(e.to_string()));
        }

        let runtime = self.clone();
        let handler = handler_fn(move |message| {
            let runtime = runtime.clone();
            async move {
                runtime.dispatch(message).await;
                Ok(())
            }
        });
        let subscription = self.inner.hub.subscribe(self.inner.config.role, handler).await;
        *self.inner.subscription.lock().await = Some(subscription);
        *self.inner.started.lock().await = Some(Instant::now());

        self.set_state(AgentState::Idle);
        info!(agent = %self.inner.config.name, role = %self.inner.config.role, "Agent started");
        Ok(())
    }

    /// Shut the agent down. Idempotent; cleanup failures are logged, the
    /// hub subscription is released, and the history is cleared.
    pub async fn stop(&self) {
        if self.state() == AgentState::Shutdown {
            return;
        }
        self.set_state(AgentState::Shutdown);

        if let Err(e) = self.inner.behavior.lock().await.cleanup().await {
            warn!(agent = %self.inner.config.name, error = %e, "Behavior cleanup failed");
        }
        if let Some(subscription) = self.inner.subscription.lock().await.take() {
            subscription.unsubscribe().await;
        }
        self.inner.history.lock().await.clear();
        info!(agent = %self.inner.config.name, "Agent stopped");
    }

    /// Externally restart an agent parked in the error state: the error
    /// counter resets and the agent goes idle.
    pub async fn restart(&self) {
        self.inner.error_count.store(0, Ordering::SeqCst);
        *self.inner.last_error.lock().await = None;
        self.set_state(AgentState::Idle);
        info!(agent = %self.inner.config.name, "Agent restarted after error park");
    }

    /// Override handling for one message kind, bypassing the behavior.
    pub async fn register_kind_handler<F, Fut>(&self, kind: MessageKind, f: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Option<String>>> + Send + 'static,
    {
        self.inner
            .kind_handlers
            .write()
            .await
            .insert(kind, Box::new(move |message| f(message).boxed()));
    }

    /// Ask another role for something and wait for the correlated
    /// response, parking in the waiting state meanwhile.
    pub async fn ask(
        &self,
        recipient: AgentRole,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Option<Message> {
        self.set_state(AgentState::WaitingForResponse);
        let response = self
            .inner
            .hub
            .request(
                self.inner.config.role,
                recipient,
                content,
                kind,
                Some(self.inner.config.response_timeout),
            )
            .await;
        self.inner.metrics.lock().await.messages_sent += 1;
        self.set_state(AgentState::Idle);
        response
    }

    /// Open a collaboration with another role and wait for its answer.
    pub async fn collaborate(
        &self,
        recipient: AgentRole,
        topic: impl Into<String>,
    ) -> Option<Message> {
        self.set_state(AgentState::Collaborating);
        let response = self
            .inner
            .hub
            .request(
                self.inner.config.role,
                recipient,
                topic,
                MessageKind::CollaborationRequest,
                Some(self.inner.config.response_timeout),
            )
            .await;
        self.inner.metrics.lock().await.messages_sent += 1;
        self.set_state(AgentState::Idle);
        response
    }

    /// Broadcast a status update to every other subscribed role.
    pub async fn announce(&self, content: impl Into<String>) -> AgentResult<usize> {
        let count = self
            .inner
            .hub
            .broadcast(self.inner.config.role, content, MessageKind::StatusUpdate)
            .await?;
        self.inner.metrics.lock().await.messages_sent += count as u64;
        Ok(count)
    }

    /// Snapshot the agent's condition.
    pub async fn status(&self) -> AgentStatus {
        let mut capabilities: Vec<Capability> =
            self.inner.config.capabilities.iter().copied().collect();
        capabilities.sort_by_key(|c| format!("{:?}", c));
        AgentStatus {
            id: self.inner.id.clone(),
            name: self.inner.config.name.clone(),
            role: self.inner.config.role,
            state: self.state(),
            capabilities,
            behavior_summary: self.inner.behavior.lock().await.capabilities(),
            uptime_secs: self
                .inner
                .started
                .lock()
                .await
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0),
            metrics: self.inner.metrics.lock().await.clone(),
            history_len: self.inner.history.lock().await.len(),
            error_count: self.inner.error_count.load(Ordering::SeqCst),
            last_error: self.inner.last_error.lock().await.clone(),
        }
    }

    /// Process one delivered message. Never lets a failure escape; the
    /// recovery path decides the final state instead.
    async fn dispatch(&self, message: Message) {
        let state = self.state();
        if state == AgentState::Shutdown {
            debug!(agent = %self.inner.config.name, "Dropping message after shutdown");
            return;
        }
        if state == AgentState::Error
            && self.inner.error_count.load(Ordering::SeqCst) > self.inner.config.retry_budget
        {
            warn!(agent = %self.inner.config.name, "Parked in error state, dropping message");
            return;
        }

        let received = Instant::now();
        self.inner.metrics.lock().await.record_received();
        {
            let mut history = self.inner.history.lock().await;
            history.push_back(message.clone());
            while history.len() > self.inner.config.max_history {
                history.pop_front();
            }
        }
        if let Err(e) = self
            .inner
            .memory
            .remember_conversation(message.sender.as_str(), &message.content)
            .await
        {
            debug!(error = %e, "Could not record conversation memory");
        }

        let prior = state;
        self.set_state(AgentState::Processing);

        match self.run_handler(&message).await {
            DispatchOutcome::Completed(reply) => {
                let elapsed = received.elapsed().as_secs_f64();
                if message.requires_response && let Some(content) = reply {
                    self.send_response(&message, content, elapsed).await;
                }
                self.inner.metrics.lock().await.record_completed(elapsed);
                let restore = match prior {
                    AgentState::WaitingForResponse | AgentState::Collaborating => prior,
                    _ => AgentState::Idle,
                };
                self.set_state(restore);
            }
            DispatchOutcome::Failed(e) => {
                self.inner.metrics.lock().await.tasks_failed += 1;
                if message.requires_response {
                    self.send_error_report(&message, &e).await;
                }
                self.recover(e).await;
            }
        }
    }

    async fn run_handler(&self, message: &Message) -> DispatchOutcome {
        // Build the future under the read guard but await it after the
        // guard is released, so a handler may itself register handlers.
        let pending = {
            let handlers = self.inner.kind_handlers.read().await;
            handlers
                .get(&message.kind)
                .map(|handler| handler(message.clone()))
        };
        let result = match pending {
            Some(future) => future.await,
            None => {
                self.inner
                    .behavior
                    .lock()
                    .await
                    .handle_message(message)
                    .await
            }
        };
        match result {
            Ok(reply) => DispatchOutcome::Completed(reply),
            Err(e) => DispatchOutcome::Failed(e),
        }
    }

    async fn send_response(&self, original: &Message, content: String, elapsed: f64) {
        let reply = Message::reply(original, MessageKind::TaskResponse, content)
            .metadata(meta::AGENT_ID, self.inner.id.clone())
            .metadata(meta::PROCESSING_TIME, elapsed)
            .build();
        if self.inner.hub.send(reply).await.is_err() {
            warn!(agent = %self.inner.config.name, "Failed to send response");
        } else {
            self.inner.metrics.lock().await.messages_sent += 1;
        }
    }

    async fn send_error_report(&self, original: &Message, fault: &AgentError) {
        let report = Message::reply(
            original,
            MessageKind::ErrorReport,
            format!("Error processing message: {}", fault),
        )
        .metadata(meta::AGENT_ID, self.inner.id.clone())
        .build();
        if self.inner.hub.send(report).await.is_err() {
            warn!(agent = %self.inner.config.name, "Failed to send error report");
        } else {
            self.inner.metrics.lock().await.messages_sent += 1;
        }
    }

    /// Capture a fault: park in error, then recover to idle after a
    /// linearly growing backoff while the budget lasts.
    async fn recover(&self, fault: AgentError) {
        let count = self.inner.error_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.inner.last_error.lock().await = Some(fault.to_string());
        self.set_state(AgentState::Error);
        error!(
            agent = %self.inner.config.name,
            error = %fault,
            count,
            "Agent fault captured"
        );

        if count <= self.inner.config.retry_budget {
            let backoff = self.inner.config.backoff_base * count;
            warn!(agent = %self.inner.config.name, ?backoff, "Backing off before recovery");
            tokio::time::sleep(backoff).await;
            self.set_state(AgentState::Idle);
        } else {
            error!(
                agent = %self.inner.config.name,
                budget = self.inner.config.retry_budget,
                "Retry budget exhausted, agent parked in error state"
            );
        }
    }

    fn set_state(&self, state: AgentState) {
        let previous = self.inner.state_tx.send_replace(state);
        if previous != state {
            debug!(
                agent = %self.inner.config.name,
                from = %previous,
                to = %state,
                "State transition"
            );
        }
    }
}
