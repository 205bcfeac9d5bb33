//! Built-in tools: code analysis, documentation and test skeletons.

use async_trait::async_trait;

use crate::error::{ToolError, ToolResult};
use crate::tool::{ParamKind, Tool, ToolParameter};

fn required_str<'a>(
    args: &'a serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> ToolResult<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing required parameter '{}'", key)))
}

/// Counts lines, comments, and a naive branching complexity for a source
/// snippet.
pub struct CodeAnalyzer;

#[async_trait]
impl Tool for CodeAnalyzer {
    fn name(&self) -> &str {
        "code_analyzer"
    }

    fn description(&self) -> &str {
        "Analyze a source snippet: line counts, comment density, naive complexity"
    }

    fn category(&self) -> &str {
        "analysis"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required(
            "code",
            ParamKind::String,
            "Source text to analyze",
        )]
    }

    async fn execute(
        &self,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> ToolResult<serde_json::Value> {
        let code = required_str(&args, "code")?;

        let total_lines = code.lines().count();
        let code_lines = code
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count();
        let comment_lines = code
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("//") || l.starts_with('#') || l.starts_with("/*"))
            .count();
        // Branch keywords as a stand-in for cyclomatic complexity.
        let complexity = 1 + ["if ", "for ", "while ", "match ", "else "]
            .iter()
            .map(|kw| code.matches(kw).count())
            .sum::<usize>();

        Ok(serde_json::json!({
            "total_lines": total_lines,
            "code_lines": code_lines,
            "comment_lines": comment_lines,
            "comment_ratio": if code_lines > 0 {
                comment_lines as f64 / code_lines as f64
            } else {
                0.0
            },
            "complexity": complexity,
        }))
    }
}

/// Produces a markdown documentation skeleton for a named item.
pub struct DocGenerator;

#[async_trait]
impl Tool for DocGenerator {
    fn name(&self) -> &str {
        "doc_generator"
    }

    fn description(&self) -> &str {
        "Generate a markdown documentation skeleton for a code item"
    }

    fn category(&self) -> &str {
        "generation"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required("name", ParamKind::String, "Item to document"),
            ToolParameter::optional("summary", ParamKind::String, "One-line summary"),
        ]
    }

    async fn execute(
        &self,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> ToolResult<serde_json::Value> {
        let name = required_str(&args, "name")?;
        let summary = args
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or("TBD");

        let doc = format!(
            "# `{name}`\n\n{summary}\n\n## Usage\n\nTBD\n\n## Parameters\n\nTBD\n\n## Returns\n\nTBD\n",
        );
        Ok(serde_json::json!({ "markdown": doc }))
    }
}

/// Produces a unit-test skeleton for a named function.
pub struct TestGenerator;

#[async_trait]
impl Tool for TestGenerator {
    fn name(&self) -> &str {
        "test_generator"
    }

    fn description(&self) -> &str {
        "Generate a unit-test skeleton for a function"
    }

    fn category(&self) -> &str {
        "generation"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required(
            "function_name",
            ParamKind::String,
            "Function to cover",
        )]
    }

    async fn execute(
        &self,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> ToolResult<serde_json::Value> {
        let function = required_str(&args, "function_name")?;

        let skeleton = format!(
            "#[test]\nfn {function}_happy_path() {{\n    todo!(\"arrange, act, assert for {function}\");\n}}\n\n#[test]\nfn {function}_edge_cases() {{\n    todo!(\"empty input, boundary values\");\n}}\n",
        );
        Ok(serde_json::json!({ "test_code": skeleton }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn analyzer_counts_comments_and_branches() {
        let mut args = serde_json::Map::new();
        args.insert(
            "code".into(),
            serde_json::json!("// doc\nfn f(x: u32) -> u32 {\n    if x > 1 {\n        x\n    } else {\n        1\n    }\n}\n"),
        );
        let output = CodeAnalyzer.execute(args).await.unwrap();
        assert_eq!(output["comment_lines"], serde_json::json!(1));
        assert!(output["complexity"].as_u64().unwrap() >= 3);
    }

    #[tokio::test]
    async fn doc_generator_includes_the_name() {
        let mut args = serde_json::Map::new();
        args.insert("name".into(), serde_json::json!("CommunicationHub"));
        let output = DocGenerator.execute(args).await.unwrap();
        assert!(output["markdown"]
            .as_str()
            .unwrap()
            .contains("CommunicationHub"));
    }

    #[tokio::test]
    async fn test_generator_emits_two_cases() {
        let mut args = serde_json::Map::new();
        args.insert("function_name".into(), serde_json::json!("parse_config"));
        let output = TestGenerator.execute(args).await.unwrap();
        let code = output["test_code"].as_str().unwrap();
        assert_eq!(code.matches("#[test]").count(), 2);
        assert!(code.contains("parse_config_happy_path"));
    }
}
