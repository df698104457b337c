//! Provider module for Melissa
//!
//! This module contains the chat endpoint abstraction and the Ollama
//! implementation.

pub mod base;
pub mod ollama;

pub use base::{
    validate_message_sequence, CompletionResponse, FunctionCall, Message, Provider, TokenUsage,
    ToolCall,
};
pub use ollama::OllamaProvider;

use crate::config::ProviderConfig;
use crate::error::{MelissaError, Result};
use std::time::Duration;

/// Create a provider instance based on configuration
///
/// `timeout` bounds each HTTP request; pass the agent's turn timeout so the
/// client never gives up before the agent does.
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
pub fn create_provider(config: &ProviderConfig, timeout: Duration) -> Result<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        "ollama" => Ok(Box::new(OllamaProvider::with_timeout(
            config.ollama.clone(),
            timeout,
        )?)),
        other => Err(MelissaError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
