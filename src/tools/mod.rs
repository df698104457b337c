//! Tools module for Melissa
//!
//! This module contains the tool executor trait, the tool registry, and the
//! built-in tools: date/time, weather, news, and notes.

pub mod date_time;
pub mod news;
pub mod notes;
pub mod registry_builder;
pub mod weather;

pub use date_time::DateTimeTool;
pub use news::NewsTool;
pub use notes::{NoteCommandInterpreter, NotesTool};
pub use weather::WeatherTool;

use crate::error::{MelissaError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Tool result structure
///
/// Represents the result of a tool execution with truncation support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Whether the tool execution succeeded
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Error message if execution failed
    pub error: Option<String>,
    /// Whether the output was truncated
    pub truncated: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            truncated: false,
        }
    }

    /// Create a failed tool result
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            truncated: false,
        }
    }

    /// Truncate output if it exceeds `max_size` bytes
    ///
    /// The cut is moved back to the nearest character boundary.
    pub fn truncate_if_needed(mut self, max_size: usize) -> Self {
        if self.output.len() > max_size {
            let mut cut = max_size;
            while !self.output.is_char_boundary(cut) {
                cut -= 1;
            }
            self.output.truncate(cut);
            self.output.push_str("\n... (truncated)");
            self.truncated = true;
        }
        self
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// # Examples
///
/// ```no_run
/// use melissa::tools::{ToolExecutor, ToolResult};
/// use melissa::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct CoinFlip;
///
/// #[async_trait]
/// impl ToolExecutor for CoinFlip {
///     fn tool_definition(&self) -> Value {
///         serde_json::json!({
///             "name": "coin_flip",
///             "description": "Flip a coin",
///             "parameters": {"type": "object", "properties": {}}
///         })
///     }
///
///     async fn execute(&self, _args: Value) -> Result<ToolResult> {
///         Ok(ToolResult::success("heads"))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the catalog entry: `{name, description, parameters}`
    ///
    /// `parameters` is a JSON schema object:
    /// ```json
    /// {
    ///   "type": "object",
    ///   "properties": {"query": {"type": "string", "description": "..."}},
    ///   "required": ["query"]
    /// }
    /// ```
    fn tool_definition(&self) -> serde_json::Value;

    /// Executes the tool with already-validated arguments
    ///
    /// # Errors
    ///
    /// Returns error if the tool backend fails
    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult>;
}

/// Registered tool: its catalog entry plus executor
#[derive(Clone)]
pub struct ToolEntry {
    /// Unique tool name
    pub name: String,
    /// Catalog entry as returned by `tool_definition`
    pub definition: serde_json::Value,
    /// Executor invoked by the dispatcher
    pub executor: Arc<dyn ToolExecutor>,
}

impl ToolEntry {
    /// The JSON schema of this tool's parameters
    pub fn parameters(&self) -> Option<&serde_json::Value> {
        self.definition.get("parameters")
    }
}

/// Tool registry
///
/// Populated once at startup, then shared read-only. The catalog keeps
/// registration order.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool executor
    ///
    /// # Errors
    ///
    /// Returns `MelissaError::Tool` if `name` is already registered
    pub fn register(
        &mut self,
        name: impl Into<String>,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(MelissaError::Tool(format!("Tool already registered: {}", name)).into());
        }

        let definition = executor.tool_definition();
        tracing::debug!("Registered tool: {}", name);
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(ToolEntry {
            name,
            definition,
            executor,
        });
        Ok(())
    }

    /// Resolve a tool by name
    pub fn resolve(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    /// Get a tool executor by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.resolve(name).map(|entry| entry.executor.clone())
    }

    /// Catalog of all tools in registration order
    pub fn all_definitions(&self) -> Vec<serde_json::Value> {
        self.entries.iter().map(|e| e.definition.clone()).collect()
    }

    /// Registered tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schema for tools that take a single free-text `query`
pub(crate) fn query_parameters(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        },
        "required": ["query"]
    })
}

/// Extract the `query` argument; the dispatcher has already coerced it to a string
pub(crate) fn query_arg(args: &serde_json::Value) -> &str {
    args.get("query").and_then(|v| v.as_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockToolExecutor {
        name: String,
    }

    #[async_trait]
    impl ToolExecutor for MockToolExecutor {
        fn tool_definition(&self) -> serde_json::Value {
            serde_json::json!({
                "name": self.name,
                "description": "Mock tool",
                "parameters": {"type": "object", "properties": {}}
            })
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult> {
            Ok(ToolResult::success("mock output"))
        }
    }

    fn mock(name: &str) -> Arc<dyn ToolExecutor> {
        Arc::new(MockToolExecutor {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("output");
        assert!(result.success);
        assert_eq!(result.output, "output");
        assert!(result.error.is_none());
        assert!(!result.truncated);
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("failed");
        assert!(!result.success);
        assert_eq!(result.error, Some("failed".to_string()));
        assert!(result.output.is_empty());
    }

    #[test]
    fn test_tool_result_truncation() {
        let result = ToolResult::success("a".repeat(1000)).truncate_if_needed(100);
        assert!(result.truncated);
        assert!(result.output.starts_with(&"a".repeat(100)));
        assert!(result.output.ends_with("(truncated)"));
    }

    #[test]
    fn test_tool_result_truncation_respects_char_boundary() {
        let result = ToolResult::success("ééé").truncate_if_needed(3);
        assert!(result.truncated);
        assert!(result.output.starts_with('é'));
        assert!(!result.output.starts_with("éé"));
    }

    #[test]
    fn test_tool_result_no_truncation() {
        let result = ToolResult::success("short").truncate_if_needed(100);
        assert!(!result.truncated);
        assert_eq!(result.output, "short");
    }

    #[test]
    fn test_tool_registry_new() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tool_registry_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register("test", mock("test")).unwrap();
        assert_eq!(registry.len(), 1);

        let entry = registry.resolve("test").expect("registered");
        assert_eq!(entry.name, "test");
        assert_eq!(
            entry.parameters(),
            Some(&serde_json::json!({"type": "object", "properties": {}}))
        );
        assert!(registry.get("test").is_some());
    }

    #[test]
    fn test_tool_registry_rejects_duplicate() {
        let mut registry = ToolRegistry::new();
        registry.register("dup", mock("dup")).unwrap();
        let err = registry.register("dup", mock("dup")).unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_tool_registry_get_nonexistent() {
        let registry = ToolRegistry::new();
        assert!(registry.resolve("nonexistent").is_none());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_tool_registry_catalog_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(name, mock(name)).unwrap();
        }

        let names: Vec<String> = registry
            .all_definitions()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_query_arg_defaults_to_empty() {
        assert_eq!(query_arg(&serde_json::json!({})), "");
        assert_eq!(query_arg(&serde_json::json!({"query": "hi"})), "hi");
    }
}
