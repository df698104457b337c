//! Configuration management for Melissa
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! It also loads the user profile (`profile.json`).

use crate::error::{MelissaError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Melissa
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat endpoint configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Orchestrator behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Tool execution and backend configuration
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Note store configuration
    #[serde(default)]
    pub notes: NotesConfig,
    /// Speech output configuration
    #[serde(default)]
    pub voice: VoiceConfig,
    /// User profile location
    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Provider configuration
///
/// Specifies which chat endpoint to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_provider_type() -> String {
    "ollama".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Orchestrator behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// System prompt seeded at the start of every session
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Hard timeout for a single chat endpoint call (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of most recent user turns sent to the model
    ///
    /// `None` sends the whole transcript. The stored transcript is never
    /// truncated either way.
    #[serde(default)]
    pub max_history_turns: Option<usize>,

    /// Execute the tool calls of one reply concurrently
    #[serde(default = "default_parallel_tools")]
    pub parallel_tools: bool,

    /// Reasoning markup delimiters
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

/// Name the assistant answers to, used in the system prompt and reply labels
pub const ASSISTANT_NAME: &str = "Melissa";

fn default_system_prompt() -> String {
    format!(
        "You are a helpful virtual assistant named {}. Give concise replies.",
        ASSISTANT_NAME
    )
}

fn default_timeout() -> u64 {
    120
}

fn default_parallel_tools() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            timeout_seconds: default_timeout(),
            max_history_turns: None,
            parallel_tools: default_parallel_tools(),
            reasoning: ReasoningConfig::default(),
        }
    }
}

/// Delimiters enclosing model deliberation that must never be spoken
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Opening delimiter
    #[serde(default = "default_open_tag")]
    pub open_tag: String,

    /// Closing delimiter
    #[serde(default = "default_close_tag")]
    pub close_tag: String,
}

fn default_open_tag() -> String {
    "<think>".to_string()
}

fn default_close_tag() -> String {
    "</think>".to_string()
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            open_tag: default_open_tag(),
            close_tag: default_close_tag(),
        }
    }
}

/// Tool execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Hard timeout for a single tool call (seconds)
    #[serde(default = "default_tool_timeout")]
    pub timeout_seconds: u64,

    /// Maximum tool output size in bytes before truncation
    #[serde(default = "default_max_output")]
    pub max_output_size: usize,

    /// Weather backend settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// News backend settings
    #[serde(default)]
    pub news: NewsConfig,
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_max_output() -> usize {
    64 * 1024
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_tool_timeout(),
            max_output_size: default_max_output(),
            weather: WeatherConfig::default(),
            news: NewsConfig::default(),
        }
    }
}

/// OpenWeatherMap current-weather backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key; the weather tool is not registered without one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint URL
    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

fn default_weather_url() -> String {
    "http://api.openweathermap.org/data/2.5/weather".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_url(),
        }
    }
}

/// NewsAPI top-headlines backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// API key; the news tool is not registered without one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint URL
    #[serde(default = "default_news_url")]
    pub base_url: String,

    /// Two-letter country code for headlines
    #[serde(default = "default_news_country")]
    pub country: String,

    /// Number of headlines to read out
    #[serde(default = "default_news_page_size")]
    pub page_size: u32,
}

fn default_news_url() -> String {
    "https://newsapi.org/v2/top-headlines".to_string()
}

fn default_news_country() -> String {
    "us".to_string()
}

fn default_news_page_size() -> u32 {
    5
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_news_url(),
            country: default_news_country(),
            page_size: default_news_page_size(),
        }
    }
}

/// Note store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Explicit database path; the platform data directory is used otherwise
    #[serde(default)]
    pub db_path: Option<String>,
}

/// Speech output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Speak replies aloud
    #[serde(default = "default_voice_enabled")]
    pub enabled: bool,

    /// Speech command override (`say`, `espeak`, ...)
    #[serde(default)]
    pub engine: Option<String>,
}

fn default_voice_enabled() -> bool {
    true
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: default_voice_enabled(),
            engine: None,
        }
    }
}

/// Where to find the user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Path to `profile.json`
    #[serde(default = "default_profile_path")]
    pub path: String,
}

fn default_profile_path() -> String {
    "profile.json".to_string()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            path: default_profile_path(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(MelissaError::Io)
            .with_context(|| format!("Failed to read config file {}", path))?;
        serde_yaml::from_str(&contents)
            .map_err(MelissaError::Yaml)
            .with_context(|| format!("Failed to parse config file {}", path))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("MELISSA_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(ollama_host) = std::env::var("MELISSA_OLLAMA_HOST") {
            self.provider.ollama.host = ollama_host;
        }

        if let Ok(ollama_model) = std::env::var("MELISSA_OLLAMA_MODEL") {
            self.provider.ollama.model = ollama_model;
        }

        if let Ok(timeout) = std::env::var("MELISSA_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.agent.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MELISSA_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(key) = std::env::var("WEATHER_API_KEY") {
            if !key.trim().is_empty() {
                self.tools.weather.api_key = Some(key);
            }
        }

        if let Ok(key) = std::env::var("NEWS_API_KEY") {
            if !key.trim().is_empty() {
                self.tools.news.api_key = Some(key);
            }
        }

        if let Ok(db_path) = std::env::var("MELISSA_NOTES_DB") {
            self.notes.db_path = Some(db_path);
        }

        if let Ok(enabled) = std::env::var("MELISSA_VOICE_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.voice.enabled = true,
                "0" | "false" | "no" | "off" => self.voice.enabled = false,
                _ => tracing::warn!("Invalid MELISSA_VOICE_ENABLED: {}", enabled),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        use crate::cli::Commands;

        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(db_path) = &cli.notes_db {
            self.notes.db_path = Some(db_path.clone());
        }

        match &cli.command {
            Commands::Chat {
                provider,
                model,
                no_voice,
            } => {
                if let Some(p) = provider {
                    self.provider.provider_type = p.clone();
                }
                if let Some(m) = model {
                    self.provider.ollama.model = m.clone();
                }
                if *no_voice {
                    self.voice.enabled = false;
                }
            }
            Commands::Ask {
                provider, model, ..
            } => {
                if let Some(p) = provider {
                    self.provider.provider_type = p.clone();
                }
                if let Some(m) = model {
                    self.provider.ollama.model = m.clone();
                }
            }
            Commands::Notes { .. } => {}
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a `Config` error naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(MelissaError::Config("Provider type cannot be empty".to_string()).into());
        }

        let valid_providers = ["ollama"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(MelissaError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.ollama.model.trim().is_empty() {
            return Err(MelissaError::Config("ollama.model cannot be empty".to_string()).into());
        }

        validate_url("provider.ollama.host", &self.provider.ollama.host)?;
        validate_url("tools.weather.base_url", &self.tools.weather.base_url)?;
        validate_url("tools.news.base_url", &self.tools.news.base_url)?;

        if self.agent.timeout_seconds == 0 {
            return Err(MelissaError::Config(
                "agent.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.agent.max_history_turns == Some(0) {
            return Err(MelissaError::Config(
                "agent.max_history_turns must be greater than 0 when set".to_string(),
            )
            .into());
        }

        if self.agent.reasoning.open_tag.is_empty() || self.agent.reasoning.close_tag.is_empty()
        {
            return Err(MelissaError::Config(
                "agent.reasoning delimiters cannot be empty".to_string(),
            )
            .into());
        }

        if self.tools.timeout_seconds == 0 {
            return Err(MelissaError::Config(
                "tools.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.tools.max_output_size == 0 {
            return Err(MelissaError::Config(
                "tools.max_output_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.tools.news.page_size == 0 || self.tools.news.page_size > 100 {
            return Err(MelissaError::Config(
                "tools.news.page_size must be between 1 and 100".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| MelissaError::Config(format!("{} is not a valid URL: {}", field, e)).into())
}

/// User profile
///
/// Describes the person talking to the assistant. Only `name` is used today;
/// unknown fields in `profile.json` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Name the user introduces themselves with at the start of a session
    pub name: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
        }
    }
}

impl Profile {
    /// Load the profile from a JSON file
    ///
    /// A missing file yields the default profile. A present but malformed
    /// file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                "Profile not found at {}, using default profile",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(MelissaError::Io)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        let profile: Profile = serde_json::from_str(&contents)
            .map_err(MelissaError::Serialization)
            .with_context(|| format!("Failed to parse profile {}", path.display()))?;

        if profile.name.trim().is_empty() {
            return Err(MelissaError::Profile("Profile name cannot be empty".to_string()).into());
        }

        Ok(profile)
    }
}
