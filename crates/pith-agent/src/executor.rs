//! Tool executor: runs one named tool under a hard wall-clock timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::registry::ToolRegistry;
use crate::tool::ToolResult;

/// Default per-call timeout
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs registered tools on their own task so a hung tool cannot stall the caller.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `tool_name` with parsed arguments. Never fails: every fault becomes a
    /// `ToolResult` with `success == false`.
    ///
    /// On timeout the spawned task is detached, so it may finish in the background;
    /// its result is dropped.
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
        cancel: CancellationToken,
    ) -> ToolResult {
        let Some(tool) = self.registry.get(tool_name) else {
            tracing::warn!(tool = tool_name, "unknown tool requested");
            return ToolResult::error(format!("unknown tool: {}", tool_name));
        };

        let subject = tool.subject(&arguments);

        if let Some(err) = self.registry.validate(tool_name, &arguments) {
            tracing::warn!(tool = tool_name, subject = %subject, "{}", err);
            return ToolResult::error(err);
        }

        tracing::info!(tool = tool_name, subject = %subject, "tool call started");

        let task = tokio::spawn(async move { tool.execute(arguments, cancel).await });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(payload))) if is_empty_payload(&payload) => {
                tracing::info!(tool = tool_name, subject = %subject, "tool returned no results");
                ToolResult::error(format!("no results for {}", subject))
            }
            Ok(Ok(Ok(payload))) => {
                let result = ToolResult::ok(payload);
                tracing::info!(
                    tool = tool_name,
                    subject = %subject,
                    "tool call succeeded: {}",
                    result.summary()
                );
                result
            }
            Ok(Ok(Err(e))) => {
                tracing::error!(tool = tool_name, subject = %subject, "tool call failed: {}", e);
                ToolResult::error(e.to_string())
            }
            Ok(Err(join_error)) => {
                tracing::error!(
                    tool = tool_name,
                    subject = %subject,
                    "tool task aborted: {}",
                    join_error
                );
                ToolResult::error(format!("{} crashed: {}", tool_name, join_error))
            }
            Err(_) => {
                tracing::warn!(
                    tool = tool_name,
                    subject = %subject,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "tool call timed out"
                );
                ToolResult::error(format!(
                    "{} timed out after {} for {}",
                    tool_name,
                    format_duration(self.timeout),
                    subject
                ))
            }
        }
    }
}

fn is_empty_payload(payload: &serde_json::Value) -> bool {
    match payload {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    enum Behavior {
        Hits(usize),
        Sleep(Duration),
        Fail,
        Panic,
    }

    struct FakeSearch {
        behavior: Behavior,
        finished: Arc<AtomicBool>,
    }

    impl FakeSearch {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                finished: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl Tool for FakeSearch {
        fn name(&self) -> &str {
            "web_search"
        }
        fn description(&self) -> &str {
            "fake search"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            })
        }
        fn subject(&self, arguments: &serde_json::Value) -> String {
            format!("query '{}'", arguments["query"].as_str().unwrap_or_default())
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _cancel: CancellationToken,
        ) -> Result<serde_json::Value, ToolError> {
            let out = match self.behavior {
                Behavior::Hits(n) => Ok(serde_json::Value::Array(
                    (0..n)
                        .map(|i| serde_json::json!({"title": format!("t{}", i), "body": "b"}))
                        .collect(),
                )),
                Behavior::Sleep(d) => {
                    tokio::time::sleep(d).await;
                    Ok(serde_json::json!([{"title": "late", "body": "late"}]))
                }
                Behavior::Fail => Err(ToolError::Failed("connection refused".into())),
                Behavior::Panic => panic!("search backend exploded"),
            };
            self.finished.store(true, Ordering::SeqCst);
            out
        }
    }

    fn executor(tool: FakeSearch) -> ToolExecutor {
        ToolExecutor::new(Arc::new(ToolRegistry::new().with_tool(Arc::new(tool))))
    }

    fn query(q: &str) -> serde_json::Value {
        serde_json::json!({ "query": q })
    }

    #[tokio::test]
    async fn test_success_returns_payload() {
        let result = executor(FakeSearch::new(Behavior::Hits(3)))
            .execute("web_search", query("rust"), CancellationToken::new())
            .await;
        assert!(result.success);
        assert_eq!(result.payload.unwrap().as_array().unwrap().len(), 3);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_zero_results_is_failure() {
        let result = executor(FakeSearch::new(Behavior::Hits(0)))
            .execute("web_search", query("xyzzy"), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert!(result.payload.is_none());
        assert_eq!(result.error.as_deref(), Some("no results for query 'xyzzy'"));
    }

    #[tokio::test]
    async fn test_tool_error_is_captured() {
        let result = executor(FakeSearch::new(Behavior::Fail))
            .execute("web_search", query("rust"), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_panic_does_not_propagate() {
        let result = executor(FakeSearch::new(Behavior::Panic))
            .execute("web_search", query("rust"), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("crashed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_at_deadline_not_at_completion() {
        let tool = FakeSearch::new(Behavior::Sleep(Duration::from_secs(15)));
        let finished = Arc::clone(&tool.finished);
        let executor = executor(tool);

        let started = tokio::time::Instant::now();
        let result = executor
            .execute("web_search", query("slow"), CancellationToken::new())
            .await;
        let elapsed = started.elapsed();

        assert!(!result.success);
        let err = result.error.unwrap();
        assert!(err.contains("timed out after 10s"), "got: {}", err);
        assert!(err.contains("query 'slow'"), "got: {}", err);
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(11), "took {:?}", elapsed);
        assert!(!finished.load(Ordering::SeqCst));

        // The detached task is allowed to finish; its result is simply discarded.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timeout() {
        let executor = executor(FakeSearch::new(Behavior::Sleep(Duration::from_secs(3))))
            .with_timeout(Duration::from_millis(1500));
        let result = executor
            .execute("web_search", query("slow"), CancellationToken::new())
            .await;
        assert!(result.error.unwrap().contains("timed out after 1.5s"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = executor(FakeSearch::new(Behavior::Hits(1)))
            .execute("calculator", serde_json::json!({}), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("unknown tool: calculator"));
    }

    #[tokio::test]
    async fn test_schema_violation_skips_execution() {
        let tool = FakeSearch::new(Behavior::Hits(1));
        let finished = Arc::clone(&tool.finished);
        let result = executor(tool)
            .execute("web_search", serde_json::json!({"q": 1}), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("validation failed"));
        assert!(!finished.load(Ordering::SeqCst));
    }
}
