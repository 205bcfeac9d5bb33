//! # CodeCollab Tools
//!
//! Tooling layer for CodeCollab agents: the [`Tool`] contract with
//! declared parameters, a name-keyed [`ToolRegistry`], the
//! outcome-reporting [`ToolExecutor`], and a few built-in tools.

pub mod builtin;
pub mod error;
pub mod executor;
pub mod registry;
pub mod tool;

pub use builtin::{CodeAnalyzer, DocGenerator, TestGenerator};
pub use error::{ToolError, ToolResult};
pub use executor::{ToolExecutor, ToolUsage};
pub use registry::ToolRegistry;
pub use tool::{ParamKind, Tool, ToolOutcome, ToolParameter, ToolStatus, validate_args};
