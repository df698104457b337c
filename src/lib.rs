//! Melissa - voice assistant library
//!
//! This library provides the core functionality for the Melissa assistant:
//! a tool-calling conversation loop over a local chat endpoint, the tools it
//! can call, and a persistent note store driven by plain-language commands.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Conversation orchestrator, transcript, tool dispatch
//! - `providers`: Chat endpoint abstraction and the Ollama implementation
//! - `tools`: Tool registry and the date/time, weather, news, and notes tools
//! - `storage`: SQLite note store
//! - `voice`: Speech input and output adapters
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use melissa::{Config, Agent};
//! use melissa::cli::Cli;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_from(["melissa", "ask", "What time is it?"]);
//!     let config = Config::load("config/config.yaml", &cli)?;
//!     config.validate()?;
//!
//!     let mut agent: Agent = melissa::commands::build_agent(&config)?;
//!     println!("{}", agent.execute("What time is it?").await?);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod storage;
pub mod tools;
pub mod voice;

// Re-export commonly used types
pub use agent::Agent;
pub use config::Config;
pub use error::{MelissaError, Result};
pub use storage::NoteStore;

#[cfg(test)]
pub mod test_utils;
