//! Speech input and output adapters
//!
//! Recognition and synthesis are kept behind two small traits so the
//! session loop does not care whether it talks to a terminal or a speaker.
//! The shipped input reads typed lines; the shipped output prints and can
//! shell out to the platform's text-to-speech command.

use crate::config::{VoiceConfig, ASSISTANT_NAME};
use crate::error::{MelissaError, Result};
use async_trait::async_trait;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::process::Command;

/// Source of user utterances
#[async_trait(?Send)]
pub trait SpeechInput {
    /// Wait for the next utterance
    ///
    /// `None` ends the session.
    ///
    /// # Errors
    ///
    /// Returns `MelissaError::Voice` if the input device fails
    async fn listen(&mut self) -> Result<Option<String>>;
}

/// Sink for assistant replies
#[async_trait(?Send)]
pub trait SpeechOutput {
    /// Deliver `text` to the user; failures are logged, never returned
    async fn speak(&self, text: &str);
}

/// Reads utterances as lines from the terminal
pub struct LineInput {
    editor: DefaultEditor,
    prompt: String,
}

impl LineInput {
    /// Create a line reader
    ///
    /// # Errors
    ///
    /// Returns `MelissaError::Voice` if the terminal cannot be opened
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| MelissaError::Voice(format!("Failed to open terminal: {}", e)))?;
        Ok(Self {
            editor,
            prompt: format!("{} ", "You:".green().bold()),
        })
    }
}

#[async_trait(?Send)]
impl SpeechInput for LineInput {
    async fn listen(&mut self) -> Result<Option<String>> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                if let Err(e) = self.editor.add_history_entry(trimmed) {
                    tracing::debug!("Failed to record history entry: {}", e);
                }
                Ok(Some(trimmed.to_string()))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(MelissaError::Voice(format!("Failed to read input: {}", e)).into()),
        }
    }
}

/// Prints replies to the terminal
#[derive(Debug, Clone)]
pub struct ConsoleSpeaker {
    name: String,
}

impl ConsoleSpeaker {
    /// Create a speaker that labels replies with `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Label printed in front of every reply
    pub fn name(&self) -> &str {
        &self.name
    }

    fn print(&self, text: &str) {
        println!("{} {}\n", format!("{}:", self.name).cyan().bold(), text);
    }
}

impl Default for ConsoleSpeaker {
    fn default() -> Self {
        Self::new(ASSISTANT_NAME)
    }
}

#[async_trait(?Send)]
impl SpeechOutput for ConsoleSpeaker {
    async fn speak(&self, text: &str) {
        self.print(text);
    }
}

/// Prints replies, then reads them aloud with a text-to-speech command
///
/// The text is passed as a single argument; no shell is involved.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    console: ConsoleSpeaker,
    program: String,
}

impl CommandSpeaker {
    /// Create a speaker using `program`
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            console: ConsoleSpeaker::new(name),
            program: program.into(),
        }
    }

    /// The text-to-speech program this speaker runs
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Label printed in front of every reply
    pub fn name(&self) -> &str {
        self.console.name()
    }
}

/// Text-to-speech command for the current platform
pub fn default_engine() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}

#[async_trait(?Send)]
impl SpeechOutput for CommandSpeaker {
    async fn speak(&self, text: &str) {
        self.console.print(text);
        if text.trim().is_empty() {
            return;
        }

        match Command::new(&self.program).arg(text).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!("{} exited with {}", self.program, status),
            Err(e) => tracing::warn!("Failed to run {}: {}", self.program, e),
        }
    }
}

/// Pick the output adapter for the voice configuration
///
/// Replies are labelled with the assistant's name.
pub fn speaker_from_config(config: &VoiceConfig) -> Box<dyn SpeechOutput> {
    if config.enabled {
        Box::new(command_speaker(config))
    } else {
        Box::new(ConsoleSpeaker::default())
    }
}

fn command_speaker(config: &VoiceConfig) -> CommandSpeaker {
    let program = config
        .engine
        .clone()
        .unwrap_or_else(|| default_engine().to_string());
    tracing::debug!("Speaking replies with {}", program);
    CommandSpeaker::new(ASSISTANT_NAME, program)
}
