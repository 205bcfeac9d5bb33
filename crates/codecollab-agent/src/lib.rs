//! # CodeCollab Agent
//!
//! Agent runtime for the CodeCollab collaboration substrate. A runtime
//! wraps one [`AgentBehavior`] and gives it a lifecycle on the hub:
//! state machine, bounded history, metrics, memory, tools, and a
//! failure-isolating dispatch path with linear-backoff recovery.
//!
//! ## Example
//!
//! ```rust,no_run
//! use codecollab_agent::{AgentConfig, AgentRuntime, Capability, EchoBehavior};
//! use codecollab_core::AgentRole;
//! use codecollab_hub::CommunicationHub;
//!
//! # async fn example() {
//! let hub = CommunicationHub::new();
//! hub.start().await;
//!
//! let config = AgentConfig::new("dev-1", AgentRole::Developer)
//!     .with_capability(Capability::CodeGeneration);
//! let agent = AgentRuntime::new(config, hub.clone(), Box::new(EchoBehavior));
//! agent.start().await.unwrap();
//!
//! // ... agents exchange messages through the hub ...
//!
//! agent.stop().await;
//! hub.stop().await;
//! # }
//! ```

pub mod behavior;
pub mod config;
pub mod error;
pub mod metrics;
pub mod runtime;
pub mod state;

pub use behavior::{AgentBehavior, EchoBehavior};
pub use config::{AgentConfig, Capability};
pub use error::{AgentError, AgentResult};
pub use metrics::AgentMetrics;
pub use runtime::{AgentRuntime, AgentStatus, DispatchOutcome};
pub use state::AgentState;
