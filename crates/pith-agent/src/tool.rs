//! Tool trait and execution results

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Outcome of executing one tool call.
///
/// `payload` and `error` are mutually exclusive; the constructors are the only
/// way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(payload: serde_json::Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create a failed result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(message.into()),
        }
    }

    /// Serialize for transport back into a tool-role message
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":"unserializable tool result: {}"}}"#, e)
        })
    }

    /// Short human-readable summary for events and logs
    pub fn summary(&self) -> String {
        match (&self.payload, &self.error) {
            (_, Some(err)) => err.clone(),
            (Some(serde_json::Value::Array(items)), None) => format!("{} results", items.len()),
            (Some(_), None) => "ok".to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Faults a tool can report
#[derive(Error, Debug)]
pub enum ToolError {
    /// Arguments were well-formed JSON but unusable
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The underlying work failed
    #[error("{0}")]
    Failed(String),
}

/// Trait for executable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the LLM
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// What a call is about, for logs and timeout messages (e.g. the search query)
    fn subject(&self, arguments: &serde_json::Value) -> String {
        arguments.to_string()
    }

    /// Execute the tool with already validated arguments.
    ///
    /// An empty array or `null` payload counts as "no results".
    async fn execute(
        &self,
        arguments: serde_json::Value,
        cancel: CancellationToken,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Type alias for a shared tool
pub type BoxedTool = Arc<dyn Tool>;

/// Convert a Tool to a catalog entry for API calls
pub fn to_api_tool(tool: &dyn Tool) -> pith_ai::Tool {
    pith_ai::Tool {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters_schema(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool that echoes its arguments.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                }
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
            _cancel: CancellationToken,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(arguments)
        }
    }

    #[test]
    fn test_tool_result_ok_serialization() {
        let r = ToolResult::ok(serde_json::json!([{"title": "t", "body": "b"}]));
        let json: serde_json::Value = serde_json::from_str(&r.to_content()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["payload"][0]["title"], "t");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_tool_result_error_serialization() {
        let r = ToolResult::error("no results for query 'x'");
        let json: serde_json::Value = serde_json::from_str(&r.to_content()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "no results for query 'x'");
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_summary() {
        assert_eq!(ToolResult::ok(serde_json::json!([1, 2])).summary(), "2 results");
        assert_eq!(ToolResult::error("bad").summary(), "bad");
    }

    #[test]
    fn test_default_subject_is_arguments_json() {
        let args = serde_json::json!({"text": "hi"});
        assert_eq!(EchoTool.subject(&args), r#"{"text":"hi"}"#);
    }

    #[test]
    fn test_to_api_tool() {
        let api_tool = to_api_tool(&EchoTool);
        assert_eq!(api_tool.name, "echo");
        assert_eq!(api_tool.description, "Echoes input");
        assert_eq!(api_tool.parameters["type"], "object");
    }
}
