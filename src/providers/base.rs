//! Base provider trait and common types for Melissa
//!
//! This module defines the Provider trait that chat endpoints implement,
//! along with the transcript message types and completion responses.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for conversation
///
/// Represents a message in the conversation with the chat endpoint.
/// Messages can be from the user, assistant, system, or tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: String,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by an assistant message, replayed verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Correlation id of the call a tool message answers, when the model sent one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced a tool message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    fn with_role(role: &str, content: Option<String>) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::providers::Message;
    ///
    /// let msg = Message::user("What's the weather in Paris?");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", Some(content.into()))
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", Some(content.into()))
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", Some(content.into()))
    }

    /// Creates a new tool result message
    ///
    /// # Arguments
    ///
    /// * `tool_name` - Name of the tool that produced the output
    /// * `tool_call_id` - Correlation id from the originating call, if any
    /// * `content` - The tool output
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::providers::Message;
    ///
    /// let msg = Message::tool_result("get_date_time", None, "It is 14:05");
    /// assert_eq!(msg.role, "tool");
    /// assert_eq!(msg.tool_name.as_deref(), Some("get_date_time"));
    /// assert!(msg.tool_call_id.is_none());
    /// ```
    pub fn tool_result(
        tool_name: impl Into<String>,
        tool_call_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id,
            tool_name: Some(tool_name.into()),
        }
    }

    /// Creates an assistant message carrying tool calls
    ///
    /// `content` is whatever text the model sent alongside the calls,
    /// reasoning markup included.
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::providers::{FunctionCall, Message, ToolCall};
    ///
    /// let call = ToolCall {
    ///     id: None,
    ///     function: FunctionCall {
    ///         name: "manage_notes".to_string(),
    ///         arguments: r#"{"query":"list notes"}"#.to_string(),
    ///     },
    /// };
    /// let draft = Some("<think>notes</think>".to_string());
    /// let msg = Message::assistant_with_tools(draft, vec![call]);
    /// assert_eq!(msg.role, "assistant");
    /// assert_eq!(msg.tool_calls.as_ref().map(Vec::len), Some(1));
    /// ```
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Returns the tool calls of this message, or an empty slice
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

/// Function call information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function/tool to call
    pub name: String,
    /// Arguments for the function (as a JSON object string)
    pub arguments: String,
}

/// Tool call structure
///
/// Represents a request from the model to execute a tool with specific arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation token; many local models never send one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Function call details
    pub function: FunctionCall,
}

/// Token usage reported by the endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: usize,
    /// Tokens in the completion
    pub completion_tokens: usize,
    /// Sum of both
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage from prompt and completion counts
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Completion response with message and optional token usage
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The response message from the model
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// Provider trait for chat endpoints
///
/// # Examples
///
/// ```no_run
/// use melissa::providers::{Provider, Message, CompletionResponse};
/// use melissa::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         _tools: &[serde_json::Value],
///     ) -> Result<CompletionResponse> {
///         let last = messages.last().and_then(|m| m.content.clone()).unwrap_or_default();
///         Ok(CompletionResponse::new(Message::assistant(last)))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation with the given messages and available tools
    ///
    /// # Arguments
    ///
    /// * `messages` - Conversation history
    /// * `tools` - Tool catalog entries (`{name, description, parameters}`)
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint call fails or the reply cannot be decoded
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse>;
}

/// Drops tool messages that do not answer a preceding assistant tool call
///
/// A tool message is kept when an earlier assistant message requested a call
/// with the same id, or, for calls without ids, with the same tool name.
///
/// # Examples
///
/// ```
/// use melissa::providers::{Message, validate_message_sequence};
///
/// let messages = vec![
///     Message::user("Do something"),
///     Message::tool_result("get_weather", None, "Sunny"),
/// ];
/// let validated = validate_message_sequence(&messages);
/// assert_eq!(validated.len(), 1);
/// ```
pub fn validate_message_sequence(messages: &[Message]) -> Vec<Message> {
    use std::collections::HashSet;

    let mut requested_ids: HashSet<&str> = HashSet::new();
    let mut requested_names: HashSet<&str> = HashSet::new();
    let mut validated = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role == "assistant" {
            for call in message.requested_tool_calls() {
                match &call.id {
                    Some(id) => {
                        requested_ids.insert(id.as_str());
                    }
                    None => {
                        requested_names.insert(call.function.name.as_str());
                    }
                }
            }
        }

        if message.role == "tool" {
            let answered = match (&message.tool_call_id, &message.tool_name) {
                (Some(id), _) => requested_ids.contains(id.as_str()),
                (None, Some(name)) => requested_names.contains(name.as_str()),
                (None, None) => false,
            };
            if !answered {
                tracing::warn!(
                    "Dropping orphan tool message (id={:?}, tool={:?})",
                    message.tool_call_id,
                    message.tool_name
                );
                continue;
            }
        }

        validated.push(message.clone());
    }

    validated
}
