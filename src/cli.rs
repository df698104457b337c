//! Command-line interface definition for Melissa
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for a voice session, a single question, and
//! direct note management.

use clap::{Parser, Subcommand};

/// Melissa - voice assistant with tools and a local note store
#[derive(Parser, Debug, Clone)]
#[command(name = "melissa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the note database path
    #[arg(long, env = "MELISSA_NOTES_DB")]
    pub notes_db: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Melissa
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a voice session
    Chat {
        /// Override the provider from config
        #[arg(short, long)]
        provider: Option<String>,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,

        /// Print replies instead of speaking them
        #[arg(long)]
        no_voice: bool,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        prompt: String,

        /// Override the provider from config
        #[arg(short, long)]
        provider: Option<String>,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run a note command directly, e.g. `melissa notes save note Todo: milk`
    Notes {
        /// The note command words
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        query: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["melissa", "chat"]).unwrap();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(matches!(
            cli.command,
            Commands::Chat {
                provider: None,
                model: None,
                no_voice: false
            }
        ));
    }

    #[test]
    fn test_cli_parse_chat_with_overrides() {
        let cli = Cli::try_parse_from([
            "melissa",
            "chat",
            "--provider",
            "ollama",
            "--model",
            "qwen3",
            "--no-voice",
        ])
        .unwrap();
        if let Commands::Chat {
            provider,
            model,
            no_voice,
        } = cli.command
        {
            assert_eq!(provider, Some("ollama".to_string()));
            assert_eq!(model, Some("qwen3".to_string()));
            assert!(no_voice);
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_ask() {
        let cli = Cli::try_parse_from(["melissa", "ask", "what time is it"]).unwrap();
        if let Commands::Ask { prompt, .. } = cli.command {
            assert_eq!(prompt, "what time is it");
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_cli_parse_notes_collects_words() {
        let cli =
            Cli::try_parse_from(["melissa", "notes", "save", "note", "Todo:", "buy", "milk"])
                .unwrap();
        if let Commands::Notes { query } = cli.command {
            assert_eq!(query.join(" "), "save note Todo: buy milk");
        } else {
            panic!("Expected Notes command");
        }
    }

    #[test]
    fn test_cli_parse_notes_requires_query() {
        assert!(Cli::try_parse_from(["melissa", "notes"]).is_err());
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "melissa",
            "--verbose",
            "--notes-db",
            "/tmp/n.db",
            "--config",
            "alt.yaml",
            "notes",
            "list",
            "notes",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.notes_db, Some("/tmp/n.db".to_string()));
        assert_eq!(cli.config, Some("alt.yaml".to_string()));
    }

    #[test]
    fn test_cli_parse_invalid_command() {
        assert!(Cli::try_parse_from(["melissa", "invalid"]).is_err());
    }
}
