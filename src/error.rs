//! Error types for Melissa
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Melissa operations
///
/// Covers configuration loading, chat endpoint calls, tool execution,
/// note storage, and the voice adapters.
#[derive(Error, Debug)]
pub enum MelissaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat endpoint errors (transport, status, decoding, timeouts)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool registration and execution errors
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Note storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Speech input/output adapter errors
    #[error("Voice error: {0}")]
    Voice(String),

    /// User profile loading errors
    #[error("Profile error: {0}")]
    Profile(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite errors surfaced without extra context
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for Melissa operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
