//! Conversation orchestrator
//!
//! One call to [`Agent::execute`] is one user turn:
//! - send the transcript and tool catalog to the chat endpoint
//! - if the reply requests tools, dispatch them and resubmit once
//! - strip reasoning markup and return the final answer
//!
//! Only chat endpoint failures escalate; tool failures are absorbed by the
//! dispatcher.

use crate::config::AgentConfig;
use crate::error::{MelissaError, Result};
use crate::providers::{Message, Provider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::reasoning::ReasoningStripper;
use super::{Conversation, ToolDispatcher};

/// The assistant: a chat endpoint, a tool dispatcher, and a transcript
///
/// # Examples
///
/// ```no_run
/// use melissa::agent::{Agent, ToolDispatcher};
/// use melissa::config::Config;
/// use melissa::providers::create_provider;
/// use melissa::tools::ToolRegistry;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> melissa::error::Result<()> {
/// let config = Config::default();
/// let timeout = Duration::from_secs(config.agent.timeout_seconds);
/// let provider = create_provider(&config.provider, timeout)?;
/// let dispatcher = ToolDispatcher::new(Arc::new(ToolRegistry::new()));
///
/// let mut agent = Agent::new_boxed(provider, dispatcher, config.agent)?;
/// let answer = agent.execute("What time is it?").await?;
/// println!("{}", answer);
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    provider: Arc<dyn Provider>,
    dispatcher: ToolDispatcher,
    conversation: Conversation,
    stripper: ReasoningStripper,
    config: AgentConfig,
}

impl Agent {
    /// Creates a new agent with the configured system prompt
    ///
    /// # Errors
    ///
    /// Returns `MelissaError::Config` if the timeout is zero or a reasoning
    /// delimiter is empty
    pub fn new(
        provider: impl Provider + 'static,
        dispatcher: ToolDispatcher,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::build(Arc::new(provider), dispatcher, config)
    }

    /// Creates a new agent from a boxed provider
    ///
    /// # Errors
    ///
    /// Same as [`Agent::new`]
    pub fn new_boxed(
        provider: Box<dyn Provider>,
        dispatcher: ToolDispatcher,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::build(Arc::from(provider), dispatcher, config)
    }

    fn build(
        provider: Arc<dyn Provider>,
        dispatcher: ToolDispatcher,
        config: AgentConfig,
    ) -> Result<Self> {
        if config.timeout_seconds == 0 {
            return Err(
                MelissaError::Config("timeout_seconds must be greater than 0".to_string()).into(),
            );
        }

        let stripper = ReasoningStripper::from_config(&config.reasoning)?;

        let mut conversation = Conversation::new();
        if !config.system_prompt.trim().is_empty() {
            conversation.add_system_message(config.system_prompt.clone());
        }

        debug!("Created agent with {} tools", dispatcher.registry().len());

        Ok(Self {
            provider,
            dispatcher,
            conversation,
            stripper,
            config,
        })
    }

    /// Runs one user turn and returns the spoken answer
    ///
    /// At most two chat endpoint calls are made. When the model requests
    /// tools but none of them produce output, the first reply's content is
    /// the answer and no second call is made.
    ///
    /// # Errors
    ///
    /// Returns `MelissaError::Provider` if a chat endpoint call fails or
    /// exceeds `agent.timeout_seconds`
    pub async fn execute(&mut self, user_prompt: impl Into<String>) -> Result<String> {
        let started = Instant::now();
        self.conversation.add_user_message(user_prompt);

        let first = self.request().await?;
        let draft = self.visible_text(&first);
        let calls = first.requested_tool_calls().to_vec();

        let answer = if calls.is_empty() {
            draft
        } else {
            self.conversation
                .add_assistant_tool_request(first.content.clone(), calls.clone());

            let outputs = self.dispatcher.dispatch(&calls).await;
            if outputs.is_empty() {
                warn!(
                    "None of {} requested tool call(s) produced output, using first reply",
                    calls.len()
                );
                draft
            } else {
                debug!("Resubmitting with {} tool output(s)", outputs.len());
                for output in outputs {
                    self.conversation
                        .add_tool_result(output.tool_name, output.call_id, output.output);
                }

                let second = self.request().await?;
                if !second.requested_tool_calls().is_empty() {
                    debug!("Ignoring tool calls in follow-up reply");
                }
                self.visible_text(&second)
            }
        };

        self.conversation.add_assistant_message(answer.clone());

        info!(
            "Turn completed in {} ms, transcript has {} messages (~{} tokens)",
            started.elapsed().as_millis(),
            self.conversation.len(),
            self.conversation.token_count()
        );

        Ok(answer)
    }

    /// Opens the session with the user introducing themselves by name
    ///
    /// # Errors
    ///
    /// Same as [`Agent::execute`]
    pub async fn greet(&mut self, user_name: &str) -> Result<String> {
        self.execute(format!("Hello, my name is {}", user_name)).await
    }

    async fn request(&mut self) -> Result<Message> {
        let messages = self.conversation.window(self.config.max_history_turns);
        let catalog = self.dispatcher.catalog();
        let limit = Duration::from_secs(self.config.timeout_seconds);

        debug!(
            "Sending {} messages and {} tools to chat endpoint",
            messages.len(),
            catalog.len()
        );

        let response = tokio::time::timeout(limit, self.provider.complete(&messages, &catalog))
            .await
            .map_err(|_| {
                MelissaError::Provider(format!(
                    "Chat request timed out after {} seconds",
                    self.config.timeout_seconds
                ))
            })??;

        if let Some(usage) = &response.usage {
            self.conversation.update_from_provider_usage(usage);
        }

        Ok(response.message)
    }

    fn visible_text(&self, message: &Message) -> String {
        message
            .content
            .as_deref()
            .map(|content| self.stripper.strip(content))
            .unwrap_or_default()
    }

    /// The full transcript
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Number of tools offered to the model
    pub fn num_tools(&self) -> usize {
        self.dispatcher.registry().len()
    }
}
