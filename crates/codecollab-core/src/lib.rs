//! # CodeCollab Core
//!
//! Value types shared by the CodeCollab collaboration substrate: messages,
//! conversation threads, negotiation sessions, and the closed role set.
//! The routing and lifecycle layers live in `codecollab-hub` and
//! `codecollab-agent`.

pub mod clock;
pub mod conversation;
pub mod message;
pub mod negotiation;
pub mod role;

pub use clock::now_ts;
pub use conversation::{ConversationThread, ThreadStatus};
pub use message::{
    ConversationId, InvalidPriority, Message, MessageBuilder, MessageId, MessageKind,
    MessageMetadata, Priority, meta,
};
pub use negotiation::{NegotiationSession, NegotiationStatus};
pub use role::AgentRole;
