//! Tool dispatch
//!
//! Resolves the tool calls from one model reply against the registry, runs
//! them, and collects the non-empty outputs in request order. A call that
//! cannot be resolved or fails is dropped from the results and reported to
//! a [`DispatchObserver`]; it never aborts the turn.

use crate::config::{AgentConfig, ToolsConfig};
use crate::providers::ToolCall;
use crate::tools::{ToolEntry, ToolRegistry};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Output of one successful tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Name of the tool that produced the output
    pub tool_name: String,
    /// Correlation id copied from the request, if the model sent one
    pub call_id: Option<String>,
    /// Text fed back to the model
    pub output: String,
}

/// Why a tool call produced no output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No tool with that name is registered
    UnknownTool,
    /// Arguments were not a JSON object or missed a required parameter
    InvalidArguments(String),
    /// The tool returned an error or an unsuccessful result
    Failed(String),
    /// The tool did not finish within the per-call timeout
    TimedOut(Duration),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::UnknownTool => write!(f, "unknown tool"),
            FailureReason::InvalidArguments(msg) => write!(f, "invalid arguments: {}", msg),
            FailureReason::Failed(msg) => write!(f, "failed: {}", msg),
            FailureReason::TimedOut(after) => write!(f, "timed out after {:?}", after),
        }
    }
}

/// A tool call that was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    /// Name the model asked for
    pub tool_name: String,
    /// Correlation id from the request
    pub call_id: Option<String>,
    /// What went wrong
    pub reason: FailureReason,
}

/// Receives tool failures that the dispatcher swallows
pub trait DispatchObserver: Send + Sync {
    /// Called once for every dropped tool call
    fn on_tool_failure(&self, failure: &ToolFailure);
}

/// Logs failures at `warn`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_tool_failure(&self, failure: &ToolFailure) {
        tracing::warn!(
            tool = %failure.tool_name,
            call_id = ?failure.call_id,
            "Tool call dropped: {}",
            failure.reason
        );
    }
}

/// Runs tool calls against a shared registry
///
/// # Examples
///
/// ```
/// use melissa::agent::ToolDispatcher;
/// use melissa::providers::{FunctionCall, ToolCall};
/// use melissa::tools::{DateTimeTool, ToolRegistry};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut registry = ToolRegistry::new();
/// registry.register("get_date_time", Arc::new(DateTimeTool::new())).unwrap();
/// let dispatcher = ToolDispatcher::new(Arc::new(registry));
///
/// let outputs = dispatcher
///     .dispatch(&[ToolCall {
///         id: None,
///         function: FunctionCall {
///             name: "get_date_time".to_string(),
///             arguments: r#"{"query": "what time is it"}"#.to_string(),
///         },
///     }])
///     .await;
/// assert_eq!(outputs.len(), 1);
/// assert!(outputs[0].output.starts_with("The current time"));
/// # });
/// ```
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    max_output_size: usize,
    parallel: bool,
    observer: Arc<dyn DispatchObserver>,
}

impl ToolDispatcher {
    /// Create a dispatcher with default limits and a [`TracingObserver`]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        let tools = ToolsConfig::default();
        Self {
            registry,
            timeout: Duration::from_secs(tools.timeout_seconds),
            max_output_size: tools.max_output_size,
            parallel: AgentConfig::default().parallel_tools,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Create a dispatcher configured from the tools and agent sections
    pub fn from_config(
        registry: Arc<ToolRegistry>,
        tools: &ToolsConfig,
        agent: &AgentConfig,
    ) -> Self {
        Self::new(registry)
            .with_timeout(Duration::from_secs(tools.timeout_seconds))
            .with_max_output_size(tools.max_output_size)
            .with_parallel(agent.parallel_tools)
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the output truncation limit in bytes
    pub fn with_max_output_size(mut self, max_output_size: usize) -> Self {
        self.max_output_size = max_output_size;
        self
    }

    /// Run calls concurrently (`true`) or one after another
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Replace the failure observer
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The tool catalog offered to the model
    pub fn catalog(&self) -> Vec<Value> {
        self.registry.all_definitions()
    }

    /// The shared registry
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run every call and return the non-empty outputs in request order
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        tracing::debug!(
            "Dispatching {} tool call(s), parallel={}",
            calls.len(),
            self.parallel
        );

        let results = if self.parallel {
            join_all(calls.iter().map(|call| self.run_one(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.run_one(call).await);
            }
            results
        };

        results
            .into_iter()
            .zip(calls)
            .filter_map(|(result, call)| match result {
                Ok(output) if output.is_empty() => {
                    tracing::debug!("Tool {} returned no output", call.function.name);
                    None
                }
                Ok(output) => Some(ToolOutput {
                    tool_name: call.function.name.clone(),
                    call_id: call.id.clone(),
                    output,
                }),
                Err(reason) => {
                    self.observer.on_tool_failure(&ToolFailure {
                        tool_name: call.function.name.clone(),
                        call_id: call.id.clone(),
                        reason,
                    });
                    None
                }
            })
            .collect()
    }

    async fn run_one(&self, call: &ToolCall) -> std::result::Result<String, FailureReason> {
        let name = &call.function.name;
        let entry = self
            .registry
            .resolve(name)
            .ok_or(FailureReason::UnknownTool)?;
        let args = prepare_arguments(entry, &call.function.arguments)?;

        tracing::debug!("Executing tool {} with {}", name, args);
        let result = tokio::time::timeout(self.timeout, entry.executor.execute(args))
            .await
            .map_err(|_| FailureReason::TimedOut(self.timeout))?
            .map_err(|e| FailureReason::Failed(e.to_string()))?;

        if !result.success {
            return Err(FailureReason::Failed(
                result
                    .error
                    .unwrap_or_else(|| "tool reported failure".to_string()),
            ));
        }

        let result = result.truncate_if_needed(self.max_output_size);
        if result.truncated {
            tracing::debug!(
                "Tool {} output truncated to {} bytes",
                name,
                self.max_output_size
            );
        }
        Ok(result.output)
    }
}

/// Parse the argument string and coerce it against the tool's schema
///
/// An empty string means no arguments. Numbers and booleans given for a
/// `string` parameter are stringified.
fn prepare_arguments(entry: &ToolEntry, raw: &str) -> std::result::Result<Value, FailureReason> {
    let parsed: Value = if raw.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).map_err(|e| FailureReason::InvalidArguments(e.to_string()))?
    };

    let Value::Object(mut args) = parsed else {
        return Err(FailureReason::InvalidArguments(
            "arguments must be a JSON object".to_string(),
        ));
    };

    let Some(schema) = entry.parameters() else {
        return Ok(Value::Object(args));
    };

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, spec) in properties {
            if spec.get("type").and_then(Value::as_str) != Some("string") {
                continue;
            }
            if let Some(value) = args.get_mut(key) {
                match value {
                    Value::Number(n) => *value = Value::String(n.to_string()),
                    Value::Bool(b) => *value = Value::String(b.to_string()),
                    _ => {}
                }
            }
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if args.get(key).map_or(true, Value::is_null) {
                return Err(FailureReason::InvalidArguments(format!(
                    "missing required parameter '{}'",
                    key
                )));
            }
        }
    }

    Ok(Value::Object(args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MelissaError, Result};
    use crate::providers::FunctionCall;
    use crate::tools::{ToolExecutor, ToolResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes its query after an optional delay
    struct EchoTool {
        name: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl ToolExecutor for EchoTool {
        fn tool_definition(&self) -> Value {
            serde_json::json!({
                "name": self.name,
                "description": "Echo",
                "parameters": crate::tools::query_parameters("text")
            })
        }

        async fn execute(&self, args: Value) -> Result<ToolResult> {
            tokio::time::sleep(self.delay).await;
            let query = args["query"].as_str().unwrap_or_default();
            match query {
                "boom" => Err(MelissaError::Tool("boom".to_string()).into()),
                "refuse" => Ok(ToolResult::error("refused")),
                "silent" => Ok(ToolResult::success("")),
                _ => Ok(ToolResult::success(format!("{}:{}", self.name, query))),
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        failures: Mutex<Vec<ToolFailure>>,
    }

    impl DispatchObserver for RecordingObserver {
        fn on_tool_failure(&self, failure: &ToolFailure) {
            self.failures.lock().unwrap().push(failure.clone());
        }
    }

    fn registry(tools: &[(&'static str, u64)]) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for (name, delay_ms) in tools {
            registry
                .register(
                    *name,
                    Arc::new(EchoTool {
                        name: *name,
                        delay: Duration::from_millis(*delay_ms),
                    }),
                )
                .unwrap();
        }
        Arc::new(registry)
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: None,
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn observed(dispatcher: ToolDispatcher) -> (ToolDispatcher, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (dispatcher.with_observer(observer.clone()), observer)
    }

    #[tokio::test]
    async fn test_dispatch_single_call() {
        let dispatcher = ToolDispatcher::new(registry(&[("echo", 0)]));
        let mut request = call("echo", r#"{"query": "hi"}"#);
        request.id = Some("call_7".to_string());

        let outputs = dispatcher.dispatch(&[request]).await;
        assert_eq!(
            outputs,
            vec![ToolOutput {
                tool_name: "echo".to_string(),
                call_id: Some("call_7".to_string()),
                output: "echo:hi".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_skipped_and_observed() {
        let (dispatcher, observer) = observed(ToolDispatcher::new(registry(&[("echo", 0)])));
        let outputs = dispatcher
            .dispatch(&[call("missing", "{}"), call("echo", r#"{"query": "x"}"#)])
            .await;

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].output, "echo:x");
        let failures = observer.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].tool_name, "missing");
        assert_eq!(failures[0].reason, FailureReason::UnknownTool);
    }

    #[tokio::test]
    async fn test_numeric_query_is_coerced_to_string() {
        let dispatcher = ToolDispatcher::new(registry(&[("echo", 0)]));
        let outputs = dispatcher.dispatch(&[call("echo", r#"{"query": 42}"#)]).await;
        assert_eq!(outputs[0].output, "echo:42");
    }

    #[tokio::test]
    async fn test_missing_required_and_malformed_arguments_fail() {
        let (dispatcher, observer) = observed(ToolDispatcher::new(registry(&[("echo", 0)])));
        let outputs = dispatcher
            .dispatch(&[
                call("echo", ""),
                call("echo", "{not json"),
                call("echo", r#"["query"]"#),
            ])
            .await;

        assert!(outputs.is_empty());
        let failures = observer.failures.lock().unwrap();
        assert_eq!(failures.len(), 3);
        assert!(failures
            .iter()
            .all(|f| matches!(f.reason, FailureReason::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_tool_errors_are_swallowed() {
        let (dispatcher, observer) = observed(ToolDispatcher::new(registry(&[("echo", 0)])));
        let outputs = dispatcher
            .dispatch(&[
                call("echo", r#"{"query": "boom"}"#),
                call("echo", r#"{"query": "refuse"}"#),
            ])
            .await;

        assert!(outputs.is_empty());
        let failures = observer.failures.lock().unwrap();
        assert_eq!(
            failures[0].reason,
            FailureReason::Failed("Tool execution error: boom".to_string())
        );
        assert_eq!(failures[1].reason, FailureReason::Failed("refused".to_string()));
    }

    #[tokio::test]
    async fn test_empty_output_is_dropped_without_failure() {
        let (dispatcher, observer) = observed(ToolDispatcher::new(registry(&[("echo", 0)])));
        let outputs = dispatcher
            .dispatch(&[call("echo", r#"{"query": "silent"}"#)])
            .await;
        assert!(outputs.is_empty());
        assert!(observer.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_observed() {
        let (dispatcher, observer) = observed(
            ToolDispatcher::new(registry(&[("slow", 500)]))
                .with_timeout(Duration::from_millis(20)),
        );
        let outputs = dispatcher.dispatch(&[call("slow", r#"{"query": "x"}"#)]).await;

        assert!(outputs.is_empty());
        assert_eq!(
            observer.failures.lock().unwrap()[0].reason,
            FailureReason::TimedOut(Duration::from_millis(20))
        );
    }

    #[tokio::test]
    async fn test_parallel_output_keeps_request_order() {
        let dispatcher = ToolDispatcher::new(registry(&[("slow", 80), ("fast", 0)]));
        let outputs = dispatcher
            .dispatch(&[
                call("slow", r#"{"query": "1"}"#),
                call("fast", r#"{"query": "2"}"#),
            ])
            .await;

        let texts: Vec<&str> = outputs.iter().map(|o| o.output.as_str()).collect();
        assert_eq!(texts, vec!["slow:1", "fast:2"]);
    }

    #[tokio::test]
    async fn test_parallel_calls_overlap() {
        let dispatcher = ToolDispatcher::new(registry(&[("a", 150), ("b", 150)]));
        let start = std::time::Instant::now();
        let outputs = dispatcher
            .dispatch(&[call("a", r#"{"query": "x"}"#), call("b", r#"{"query": "y"}"#)])
            .await;
        assert_eq!(outputs.len(), 2);
        assert!(start.elapsed() < Duration::from_millis(290));
    }

    #[tokio::test]
    async fn test_sequential_mode_keeps_request_order() {
        let dispatcher =
            ToolDispatcher::new(registry(&[("slow", 30), ("fast", 0)])).with_parallel(false);
        let outputs = dispatcher
            .dispatch(&[
                call("fast", r#"{"query": "1"}"#),
                call("slow", r#"{"query": "2"}"#),
            ])
            .await;
        assert_eq!(outputs[0].output, "fast:1");
        assert_eq!(outputs[1].output, "slow:2");
    }

    #[tokio::test]
    async fn test_output_is_truncated() {
        let dispatcher =
            ToolDispatcher::new(registry(&[("echo", 0)])).with_max_output_size(6);
        let outputs = dispatcher
            .dispatch(&[call("echo", r#"{"query": "abcdefgh"}"#)])
            .await;
        assert!(outputs[0].output.starts_with("echo:a"));
        assert!(outputs[0].output.ends_with("(truncated)"));
    }
}
