//! Ollama provider implementation for Melissa
//!
//! This module implements the Provider trait for Ollama, connecting to a local
//! or remote Ollama server to generate chat completions with tool calling.

use crate::config::OllamaConfig;
use crate::error::{MelissaError, Result};
use crate::providers::{
    CompletionResponse, FunctionCall, Message, Provider, TokenUsage, ToolCall,
};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```no_run
/// use melissa::config::OllamaConfig;
/// use melissa::providers::{OllamaProvider, Provider, Message};
///
/// # async fn example() -> melissa::error::Result<()> {
/// let provider = OllamaProvider::new(OllamaConfig::default())?;
/// let completion = provider.complete(&[Message::user("Hello!")], &[]).await?;
/// println!("{:?}", completion.message.content);
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
    timeout: Duration,
}

/// HTTP timeout used by [`OllamaProvider::new`]
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Request structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    stream: bool,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

/// Tool definition for Ollama API
#[derive(Debug, Serialize)]
struct OllamaTool {
    r#type: String,
    function: OllamaFunction,
}

/// Function definition for Ollama tools
#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Tool call in Ollama format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: OllamaFunctionCall,
}

/// Function call details in Ollama format; arguments are a JSON object
#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Response structure from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::config::OllamaConfig;
    /// use melissa::providers::OllamaProvider;
    ///
    /// let provider = OllamaProvider::new(OllamaConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: OllamaConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a provider whose HTTP requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn with_timeout(config: OllamaConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("melissa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MelissaError::Http)
            .context("Failed to create HTTP client for Ollama")?;

        tracing::info!(
            "Initialized Ollama provider: host={}, model={}, timeout={:?}",
            config.host,
            config.model,
            timeout
        );

        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    /// Per-request HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Convert transcript messages to Ollama format
    fn convert_messages(&self, messages: &[Message]) -> Vec<OllamaMessage> {
        crate::providers::validate_message_sequence(messages)
            .into_iter()
            .filter_map(|m| {
                if m.content.is_none() && m.tool_calls.is_none() {
                    return None;
                }

                let tool_calls = m.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .map(|tc| OllamaToolCall {
                            id: tc.id,
                            function: OllamaFunctionCall {
                                arguments: serde_json::from_str(&tc.function.arguments)
                                    .unwrap_or_else(|_| {
                                        serde_json::Value::Object(serde_json::Map::new())
                                    }),
                                name: tc.function.name,
                            },
                        })
                        .collect()
                });

                Some(OllamaMessage {
                    role: m.role,
                    content: m.content.unwrap_or_default(),
                    tool_calls,
                    tool_name: m.tool_name,
                })
            })
            .collect()
    }

    /// Convert tool catalog entries to Ollama format
    fn convert_tools(&self, tools: &[serde_json::Value]) -> Vec<OllamaTool> {
        tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                let name = obj.get("name")?.as_str()?.to_string();
                let description = obj.get("description")?.as_str()?.to_string();
                let parameters = obj.get("parameters")?.clone();

                Some(OllamaTool {
                    r#type: "function".to_string(),
                    function: OllamaFunction {
                        name,
                        description,
                        parameters,
                    },
                })
            })
            .collect()
    }

    /// Convert an Ollama reply back to a transcript message
    ///
    /// Text sent alongside tool calls is kept, and call ids are passed
    /// through unchanged (absent stays absent).
    fn convert_response_message(&self, ollama_msg: OllamaMessage) -> Message {
        match ollama_msg.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => {
                let converted_calls: Vec<ToolCall> = tool_calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id.filter(|id| !id.is_empty()),
                        function: FunctionCall {
                            name: tc.function.name,
                            arguments: encode_arguments(&tc.function.arguments),
                        },
                    })
                    .collect();

                let content = Some(ollama_msg.content).filter(|c| !c.is_empty());
                Message::assistant_with_tools(content, converted_calls)
            }
            _ => Message::assistant(ollama_msg.content),
        }
    }
}

/// Encode wire arguments as a JSON object string
///
/// Some models send the arguments object pre-encoded as a string; that
/// string is used as-is. Null becomes `{}`.
fn encode_arguments(arguments: &serde_json::Value) -> String {
    match arguments {
        serde_json::Value::Null => "{}".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "{}".to_string()),
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let ollama_request = OllamaRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(messages),
            tools: self.convert_tools(tools),
            stream: false,
        };

        tracing::debug!(
            "Sending Ollama request: {} messages, {} tools",
            ollama_request.messages.len(),
            ollama_request.tools.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Ollama request failed: {}", e);
                MelissaError::Http(e)
            })
            .with_context(|| format!("Ollama request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(MelissaError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            MelissaError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::debug!(
            "Ollama response: done={}, prompt_tokens={}, completion_tokens={}",
            ollama_response.done,
            ollama_response.prompt_eval_count,
            ollama_response.eval_count
        );

        let message = self.convert_response_message(ollama_response.message);

        let response = if ollama_response.prompt_eval_count > 0 || ollama_response.eval_count > 0 {
            let usage = TokenUsage::new(
                ollama_response.prompt_eval_count,
                ollama_response.eval_count,
            );
            CompletionResponse::with_usage(message, usage)
        } else {
            CompletionResponse::new(message)
        };

        Ok(response)
    }
}
