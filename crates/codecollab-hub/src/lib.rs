//! # CodeCollab Hub
//!
//! In-process priority message bus for CodeCollab agents: role
//! subscriptions with per-role bounded queues, broadcast observers,
//! request/response correlation, broadcast fan-out, and negotiation
//! session bookkeeping.
//!
//! ## Example
//!
//! ```rust,no_run
//! use codecollab_hub::{CommunicationHub, handler_fn};
//! use codecollab_core::{AgentRole, Message, MessageKind};
//!
//! # async fn example() {
//! let hub = CommunicationHub::new();
//! hub.start().await;
//!
//! let sub = hub
//!     .subscribe(
//!         AgentRole::Developer,
//!         handler_fn(|message: Message| async move {
//!             println!("dev got: {}", message.content);
//!             Ok(())
//!         }),
//!     )
//!     .await;
//!
//! hub.send(
//!     Message::builder(
//!         AgentRole::ProductManager,
//!         AgentRole::Developer,
//!         MessageKind::TaskRequest,
//!         "ship it",
//!     )
//!     .build(),
//! )
//! .await
//! .unwrap();
//!
//! sub.unsubscribe().await;
//! hub.stop().await;
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod hub;
mod queue;
mod stats;

pub use error::{HubError, HubResult};
pub use handler::{MessageHandler, handler_fn};
pub use hub::{CommunicationHub, HubConfig, ObserverSubscription, RoleSubscription};
pub use stats::HubStats;
