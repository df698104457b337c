//! Session transcript
//!
//! The transcript is append-only and never pruned. What gets sent to the
//! model can optionally be limited to the most recent turns with
//! [`Conversation::window`].

use crate::providers::{Message, TokenUsage, ToolCall};

/// Ordered record of every message in a session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    token_count: usize,
    provider_token_usage: Option<TokenUsage>,
}

impl Conversation {
    /// Creates an empty conversation
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::agent::Conversation;
    ///
    /// let mut conversation = Conversation::new();
    /// conversation.add_system_message("You are a helpful virtual assistant named Melissa.");
    /// conversation.add_user_message("What time is it?");
    /// assert_eq!(conversation.len(), 2);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user message
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Adds a plain assistant reply
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Adds an assistant message that requested tools
    ///
    /// The content and tool calls are stored exactly as the model sent them
    /// so the follow-up request replays them verbatim.
    pub fn add_assistant_tool_request(&mut self, content: Option<String>, calls: Vec<ToolCall>) {
        self.push(Message::assistant_with_tools(content, calls));
    }

    /// Adds a tool result message
    pub fn add_tool_result(
        &mut self,
        tool_name: impl Into<String>,
        tool_call_id: Option<String>,
        content: impl Into<String>,
    ) {
        self.push(Message::tool_result(tool_name, tool_call_id, content));
    }

    /// Adds a system message
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.push(Message::system(content));
    }

    fn push(&mut self, message: Message) {
        self.token_count += estimate_message_tokens(&message);
        self.messages.push(message);
    }

    /// Every message, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages to send to the model
    ///
    /// With `Some(n)`, keeps all system messages plus everything from the
    /// n-th most recent user message onward. With `None`, the whole
    /// transcript.
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::agent::Conversation;
    ///
    /// let mut conversation = Conversation::new();
    /// conversation.add_system_message("system");
    /// for turn in ["one", "two", "three"] {
    ///     conversation.add_user_message(turn);
    ///     conversation.add_assistant_message("ok");
    /// }
    ///
    /// let window = conversation.window(Some(1));
    /// assert_eq!(window.len(), 3);
    /// assert_eq!(window[1].content.as_deref(), Some("three"));
    /// assert_eq!(conversation.len(), 7);
    /// ```
    pub fn window(&self, max_turns: Option<usize>) -> Vec<Message> {
        let Some(max_turns) = max_turns else {
            return self.messages.clone();
        };

        let start = self
            .messages
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, m)| m.role == "user")
            .nth(max_turns.saturating_sub(1))
            .map(|(idx, _)| idx)
            .unwrap_or(0);

        self.messages
            .iter()
            .enumerate()
            .filter(|(idx, m)| *idx >= start || m.role == "system")
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Estimated token count of the whole transcript
    ///
    /// Prefers the provider's last reported prompt size when available.
    pub fn token_count(&self) -> usize {
        self.provider_token_usage
            .map(|usage| usage.total_tokens)
            .unwrap_or(self.token_count)
    }

    /// Record token usage reported by the provider
    pub fn update_from_provider_usage(&mut self, usage: &TokenUsage) {
        self.provider_token_usage = Some(*usage);
    }
}

/// Characters / 4, the usual rough approximation for English text
fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

fn estimate_message_tokens(message: &Message) -> usize {
    let content = message.content.as_deref().map(estimate_tokens).unwrap_or(0);
    let calls: usize = message
        .requested_tool_calls()
        .iter()
        .map(|call| {
            estimate_tokens(&call.function.name) + estimate_tokens(&call.function.arguments)
        })
        .sum();
    content + calls
}
