//! Tool contract: parameters, outcomes, and the `Tool` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use codecollab_core::now_ts;

use crate::error::{ToolError, ToolResult};

/// How a tool invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Failure,
    Timeout,
    Cancelled,
    Partial,
}

/// Record of one tool invocation.
///
/// The executor reports every ending as an outcome value; callers never
/// see an `Err` for a missing tool, bad arguments, or a blown deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool_name: String,
    pub status: ToolStatus,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub duration_secs: f64,
    pub timestamp: f64,
}

impl ToolOutcome {
    pub fn success(tool_name: impl Into<String>, output: serde_json::Value, duration_secs: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Success,
            output: Some(output),
            error: None,
            duration_secs,
            timestamp: now_ts(),
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Failure,
            output: None,
            error: Some(error.into()),
            duration_secs,
            timestamp: now_ts(),
        }
    }

    pub fn timeout(tool_name: impl Into<String>, error: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Timeout,
            output: None,
            error: Some(error.into()),
            duration_secs,
            timestamp: now_ts(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

/// JSON value shapes a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    Array,
}

impl ParamKind {
    fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Float => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Object => value.is_object(),
            ParamKind::Array => value.is_array(),
        }
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ToolParameter {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }
}

/// Check `args` against a declared parameter list.
pub fn validate_args(
    parameters: &[ToolParameter],
    args: &serde_json::Map<String, serde_json::Value>,
) -> ToolResult<()> {
    for param in parameters {
        match args.get(&param.name) {
            Some(value) => {
                if !param.kind.matches(value) {
                    return Err(ToolError::InvalidParameters(format!(
                        "'{}' expects {:?}",
                        param.name, param.kind
                    )));
                }
            }
            None if param.required => {
                return Err(ToolError::InvalidParameters(format!(
                    "missing required parameter '{}'",
                    param.name
                )));
            }
            None => {}
        }
    }
    Ok(())
}

/// A capability an agent can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Grouping category (e.g. "analysis", "generation").
    fn category(&self) -> &str;

    /// Declared parameters, used by the executor for validation.
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Run the tool against validated arguments.
    ///
    /// # Errors
    ///
    /// Returns `ToolError` when execution fails; the executor converts it
    /// into a failure outcome.
    async fn execute(
        &self,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> ToolResult<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_catches_missing_and_mistyped() {
        let params = vec![
            ToolParameter::required("code", ParamKind::String, "source text"),
            ToolParameter::optional("depth", ParamKind::Integer, "analysis depth"),
        ];

        let mut args = serde_json::Map::new();
        assert!(validate_args(&params, &args).is_err());

        args.insert("code".into(), serde_json::json!("fn main() {}"));
        assert!(validate_args(&params, &args).is_ok());

        args.insert("depth".into(), serde_json::json!("three"));
        assert!(validate_args(&params, &args).is_err());

        args.insert("depth".into(), serde_json::json!(3));
        assert!(validate_args(&params, &args).is_ok());
    }

    #[test]
    fn outcome_constructors_set_status() {
        assert!(ToolOutcome::success("t", serde_json::json!(1), 0.1).is_success());
        assert!(!ToolOutcome::failure("t", "boom", 0.1).is_success());
        assert_eq!(
            ToolOutcome::timeout("t", "too slow", 1.0).status,
            ToolStatus::Timeout
        );
    }
}
