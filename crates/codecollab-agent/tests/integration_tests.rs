//! Integration tests: agents living on a real hub.

use async_trait::async_trait;
use std::time::Duration;

use codecollab_agent::{
    AgentBehavior, AgentConfig, AgentResult, AgentRuntime, AgentState, EchoBehavior,
};
use codecollab_core::{AgentRole, Message, MessageKind, meta};
use codecollab_hub::{CommunicationHub, HubConfig};

/// Route agent and hub tracing through the test harness, honoring `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_hub() -> CommunicationHub {
    CommunicationHub::with_config(HubConfig {
        poll_interval: Duration::from_millis(10),
        ..HubConfig::default()
    })
}

/// Poll until `check` passes or the deadline elapses.
async fn wait_until<F>(deadline: Duration, what: &str, mut check: F)
where
    F: AsyncFnMut() -> bool,
{
    let reached = tokio::time::timeout(deadline, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {}", what);
}

#[tokio::test]
async fn request_round_trips_through_a_live_agent() {
    init_tracing();
    let hub = fast_hub();
    hub.start().await;

    let agent = AgentRuntime::new(
        AgentConfig::new("dev-1", AgentRole::Developer),
        hub.clone(),
        Box::new(EchoBehavior),
    );
    agent.start().await.unwrap();

    let response = hub
        .request(
            AgentRole::ProductManager,
            AgentRole::Developer,
            "ping",
            MessageKind::TaskRequest,
            Some(Duration::from_secs(2)),
        )
        .await
        .expect("agent should answer");

    assert_eq!(response.content, "ack: ping");
    assert_eq!(response.kind, MessageKind::TaskResponse);
    assert_eq!(response.sender, AgentRole::Developer);
    assert!(response.get_metadata(meta::AGENT_ID).is_some());
    assert!(response.get_metadata(meta::PROCESSING_TIME).is_some());

    let status = agent.status().await;
    assert_eq!(status.metrics.messages_received, 1);
    assert_eq!(status.metrics.tasks_completed, 1);
    assert_eq!(status.metrics.messages_sent, 1);
    assert!(status.metrics.average_response_time >= 0.0);

    agent.stop().await;
    hub.stop().await;
}

struct AlwaysFails;

#[async_trait]
impl AgentBehavior for AlwaysFails {
    async fn initialize(&mut self) -> AgentResult<()> {
        Ok(())
    }
    async fn cleanup(&mut self) -> AgentResult<()> {
        Ok(())
    }
    async fn handle_message(&mut self, _message: &Message) -> AgentResult<Option<String>> {
        Err(codecollab_agent::AgentError::HandlerFailed(
            "always fails".to_string(),
        ))
    }
    fn capabilities(&self) -> String {
        "fails on purpose".to_string()
    }
}

#[tokio::test]
async fn retry_budget_recovers_then_parks() {
    init_tracing();
    let hub = fast_hub();
    hub.start().await;

    let agent = AgentRuntime::new(
        AgentConfig::new("fragile", AgentRole::Developer)
            .with_retry_budget(3)
            .with_backoff_base(Duration::from_millis(20)),
        hub.clone(),
        Box::new(AlwaysFails),
    );
    agent.start().await.unwrap();

    let poke = |n: u32| {
        Message::builder(
            AgentRole::Tester,
            AgentRole::Developer,
            MessageKind::StatusUpdate,
            format!("poke {}", n),
        )
        .build()
    };

    // Within budget: each fault parks the agent briefly, then it recovers.
    for n in 1..=3 {
        hub.send(poke(n)).await.unwrap();
        wait_until(Duration::from_secs(2), "fault to be captured", async || {
            agent.status().await.error_count == n
        })
        .await;
        wait_until(Duration::from_secs(2), "recovery to idle", async || {
            agent.state() == AgentState::Idle
        })
        .await;
        let status = agent.status().await;
        assert_eq!(status.metrics.tasks_failed, n as u64);
        assert!(status.last_error.as_deref().unwrap().contains("always fails"));
    }

    // The fourth fault exhausts the budget; the agent stays parked.
    hub.send(poke(4)).await.unwrap();
    wait_until(Duration::from_secs(2), "budget exhaustion", async || {
        agent.status().await.error_count == 4
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(agent.state(), AgentState::Error);

    // Parked agents drop further traffic.
    hub.send(poke(5)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(agent.status().await.metrics.messages_received, 4);

    // An external restart unparks it.
    agent.restart().await;
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(agent.status().await.error_count, 0);

    agent.stop().await;
    hub.stop().await;
}

#[tokio::test]
async fn failed_request_yields_an_error_report() {
    init_tracing();
    let hub = fast_hub();
    hub.start().await;

    let agent = AgentRuntime::new(
        AgentConfig::new("fragile", AgentRole::Developer)
            .with_backoff_base(Duration::from_millis(10)),
        hub.clone(),
        Box::new(AlwaysFails),
    );
    agent.start().await.unwrap();

    // The error report references the request id, so it correlates as
    // the requester's answer.
    let request_id = {
        let response = hub
            .request(
                AgentRole::ProductManager,
                AgentRole::Developer,
                "do the thing",
                MessageKind::TaskRequest,
                Some(Duration::from_millis(500)),
            )
            .await;
        assert!(response.is_some(), "error report correlates as the response");
        let report = response.unwrap();
        assert_eq!(report.kind, MessageKind::ErrorReport);
        assert!(report.content.contains("always fails"));
        report.response_to().unwrap().to_string()
    };
    assert!(!request_id.is_empty());

    agent.stop().await;
    hub.stop().await;
}

#[tokio::test]
async fn stopped_agent_releases_its_role() {
    init_tracing();
    let hub = fast_hub();
    hub.start().await;

    let agent = AgentRuntime::new(
        AgentConfig::new("dev-1", AgentRole::Developer),
        hub.clone(),
        Box::new(EchoBehavior),
    );
    agent.start().await.unwrap();
    assert_eq!(hub.stats().await.subscribed_roles, 1);

    agent.stop().await;
    assert_eq!(hub.stats().await.subscribed_roles, 0);

    // Traffic to the vacated role is silently dropped.
    hub.send(
        Message::builder(
            AgentRole::Tester,
            AgentRole::Developer,
            MessageKind::StatusUpdate,
            "anyone?",
        )
        .build(),
    )
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(hub.stats().await.messages_dropped, 1);

    hub.stop().await;
}

#[tokio::test]
async fn collaboration_between_two_agents() {
    init_tracing();
    let hub = fast_hub();
    hub.start().await;

    let dev = AgentRuntime::new(
        AgentConfig::new("dev-1", AgentRole::Developer),
        hub.clone(),
        Box::new(EchoBehavior),
    );
    dev.start().await.unwrap();

    let reviewer = AgentRuntime::new(
        AgentConfig::new("rev-1", AgentRole::Reviewer),
        hub.clone(),
        Box::new(EchoBehavior),
    );
    reviewer.start().await.unwrap();

    let answer = reviewer
        .collaborate(AgentRole::Developer, "pairing on the parser?")
        .await
        .expect("developer should answer");
    assert_eq!(answer.content, "ack: pairing on the parser?");
    assert_eq!(reviewer.state(), AgentState::Idle);

    dev.stop().await;
    reviewer.stop().await;
    hub.stop().await;
}
