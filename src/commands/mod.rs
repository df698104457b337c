/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`  - Spoken session with the assistant
- `ask`   - One question, answer printed
- `notes` - Run a note command directly, without the model
*/

use crate::agent::{Agent, ToolDispatcher};
use crate::config::Config;
use crate::error::Result;
use crate::providers::create_provider;
use crate::storage::NoteStore;
use crate::tools::registry_builder::ToolRegistryBuilder;
use std::sync::Arc;
use std::time::Duration;

/// Assemble the note store, tools, provider, and agent from configuration
///
/// # Errors
///
/// Returns error if the note store cannot be opened, a tool or the
/// provider cannot be created, or the agent configuration is invalid
pub fn build_agent(config: &Config) -> Result<Agent> {
    let store = NoteStore::from_config(&config.notes)?;
    tracing::debug!("Using note store at {}", store.db_path().display());

    let registry = ToolRegistryBuilder::new(config.tools.clone(), store).build()?;
    let dispatcher = ToolDispatcher::from_config(Arc::new(registry), &config.tools, &config.agent);
    let provider = create_provider(
        &config.provider,
        Duration::from_secs(config.agent.timeout_seconds),
    )?;

    Agent::new_boxed(provider, dispatcher, config.agent.clone())
}

// Chat command handler
pub mod chat {
    //! Spoken session handler.
    //!
    //! Greets the user, then alternates between listening for an utterance
    //! and speaking the agent's answer until the user says nothing.

    use super::*;
    use crate::config::{Profile, ASSISTANT_NAME};
    use crate::voice::{speaker_from_config, LineInput, SpeechInput, SpeechOutput};
    use colored::Colorize;

    /// Start a session
    ///
    /// # Errors
    ///
    /// Returns error if the profile is malformed or the agent cannot be built
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::commands::chat;
    /// use melissa::config::Config;
    ///
    /// // In application code:
    /// // chat::run_chat(Config::default()).await?;
    /// ```
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting chat session");

        let profile = Profile::load(&config.profile.path)?;
        let mut agent = build_agent(&config)?;
        let mut input = LineInput::new()?;
        let output = speaker_from_config(&config.voice);

        print_welcome_banner(&profile.name);
        run_session(&mut agent, &mut input, output.as_ref(), &profile.name).await
    }

    /// Drive a session over arbitrary input and output adapters
    ///
    /// The session opens with the user introducing themselves by
    /// `user_name`. An empty utterance ends the session. A chat endpoint
    /// failure is reported to the user and also ends it.
    ///
    /// # Errors
    ///
    /// Returns error only if the input adapter fails
    pub async fn run_session(
        agent: &mut Agent,
        input: &mut dyn SpeechInput,
        output: &dyn SpeechOutput,
        user_name: &str,
    ) -> Result<()> {
        match agent.greet(user_name).await {
            Ok(greeting) => output.speak(&greeting).await,
            Err(e) => {
                report_error(&e);
                return Ok(());
            }
        }

        while let Some(utterance) = input.listen().await? {
            tracing::debug!("Heard: {}", utterance);
            match agent.execute(utterance).await {
                Ok(answer) => output.speak(&answer).await,
                Err(e) => {
                    report_error(&e);
                    break;
                }
            }
        }

        tracing::info!("Chat session ended");
        Ok(())
    }

    fn report_error(error: &anyhow::Error) {
        tracing::error!("Chat turn failed: {:#}", error);
        eprintln!("{}", format!("An error occurred: {}", error).red());
    }

    fn print_welcome_banner(user_name: &str) {
        println!(
            "\n{}",
            format!("Hi {}, {} is listening.", user_name, ASSISTANT_NAME).bold()
        );
        println!("Press Enter on an empty line to finish.\n");
    }
}

// Single question handler
pub mod ask {
    //! One-shot question handler.

    use super::*;

    /// Ask one question and print the answer
    ///
    /// # Errors
    ///
    /// Returns error if the agent cannot be built or the chat endpoint fails
    pub async fn run_ask(config: Config, prompt: String) -> Result<()> {
        tracing::info!("Answering a single prompt");
        let mut agent = build_agent(&config)?;
        let answer = agent.execute(prompt).await?;
        println!("{}", answer);
        Ok(())
    }
}

// Direct note command handler
pub mod notes {
    //! Runs the note interpreter without involving the model.

    use super::*;
    use crate::tools::NoteCommandInterpreter;

    /// Run one note command and print the reply
    ///
    /// # Errors
    ///
    /// Returns error if the note store fails
    pub fn run_notes(config: &Config, query: &[String]) -> Result<()> {
        let store = NoteStore::from_config(&config.notes)?;
        let interpreter = NoteCommandInterpreter::new(store);
        let reply = interpreter.handle(&query.join(" "))?;
        println!("{}", reply);
        Ok(())
    }
}
