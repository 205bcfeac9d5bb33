//! The behavior seam concrete agents implement.

use async_trait::async_trait;

use codecollab_core::Message;

use crate::error::AgentResult;

/// What makes one agent different from another.
///
/// Exactly four operations; the runtime owns everything else (state,
/// history, metrics, recovery, responses). Implementations are plain
/// structs, not a hierarchy.
#[async_trait]
pub trait AgentBehavior: Send + Sync {
    /// One-time setup before the agent goes idle. A failure here is fatal
    /// to `start`.
    async fn initialize(&mut self) -> AgentResult<()>;

    /// Teardown during shutdown. Failures are logged, never propagated.
    async fn cleanup(&mut self) -> AgentResult<()>;

    /// Process one message; `Some(text)` becomes the correlated response
    /// when the sender asked for one.
    async fn handle_message(&mut self, message: &Message) -> AgentResult<Option<String>>;

    /// Human-readable summary of what this behavior can do.
    fn capabilities(&self) -> String;
}

/// A behavior that acknowledges everything. Useful for wiring tests and
/// as a starting point for real agents.
pub struct EchoBehavior;

#[async_trait]
impl AgentBehavior for EchoBehavior {
    async fn initialize(&mut self) -> AgentResult<()> {
        Ok(())
    }

    async fn cleanup(&mut self) -> AgentResult<()> {
        Ok(())
    }

    async fn handle_message(&mut self, message: &Message) -> AgentResult<Option<String>> {
        Ok(Some(format!("ack: {}", message.content)))
    }

    fn capabilities(&self) -> String {
        "echoes every message back".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codecollab_core::{AgentRole, MessageKind};

    #[tokio::test]
    async fn echo_acknowledges_content() {
        let mut behavior = EchoBehavior;
        behavior.initialize().await.unwrap();

        let message = Message::builder(
            AgentRole::ProductManager,
            AgentRole::Developer,
            MessageKind::TaskRequest,
            "ping",
        )
        .build();
        let reply = behavior.handle_message(&message).await.unwrap();
        assert_eq!(reply.as_deref(), Some("ack: ping"));
    }
}
