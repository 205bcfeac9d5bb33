//! # CodeCollab Memory
//!
//! Storage layer for CodeCollab agents: a narrow five-operation
//! [`MemoryStore`] contract, a process-local [`InMemoryStore`] backend,
//! and the per-agent [`AgentMemory`] façade that enforces a bounded
//! footprint on top of the contract.

pub mod agent_memory;
pub mod entry;
pub mod error;
pub mod store;

pub use agent_memory::AgentMemory;
pub use entry::{InvalidMemoryPriority, MemoryEntry, MemoryPriority, MemoryType};
pub use error::{MemoryError, MemoryResult};
pub use store::{InMemoryStore, MemoryStore};
