//! Tool registry builder
//!
//! Assembles the tools Melissa offers the model. Tools that need an API key
//! are left out (with a warning) when no key is configured, so the model is
//! never offered something that can only fail.

use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::error::Result;
use crate::storage::NoteStore;
use crate::tools::{DateTimeTool, NewsTool, NotesTool, ToolExecutor, ToolRegistry, WeatherTool};

/// Builder for the assistant's tool registry
///
/// Registration order, which is also catalog order:
/// `get_date_time`, `get_weather`, `get_news`, `manage_notes`.
///
/// # Examples
///
/// ```no_run
/// use melissa::config::ToolsConfig;
/// use melissa::storage::NoteStore;
/// use melissa::tools::registry_builder::ToolRegistryBuilder;
///
/// let store = NoteStore::new().expect("note store");
/// let registry = ToolRegistryBuilder::new(ToolsConfig::default(), store)
///     .build()
///     .expect("Failed to build registry");
/// assert!(registry.get("manage_notes").is_some());
/// ```
pub struct ToolRegistryBuilder {
    /// Tools configuration
    tools_config: ToolsConfig,
    /// Store backing `manage_notes`
    store: NoteStore,
}

impl ToolRegistryBuilder {
    /// Create a new tool registry builder
    pub fn new(tools_config: ToolsConfig, store: NoteStore) -> Self {
        Self {
            tools_config,
            store,
        }
    }

    /// Build the registry
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn build(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();

        let date_time: Arc<dyn ToolExecutor> = Arc::new(DateTimeTool::new());
        registry.register("get_date_time", date_time)?;

        match &self.tools_config.weather.api_key {
            Some(key) => {
                let weather: Arc<dyn ToolExecutor> =
                    Arc::new(WeatherTool::new(key.clone(), &self.tools_config.weather)?);
                registry.register("get_weather", weather)?;
            }
            None => tracing::warn!("WEATHER_API_KEY not set, get_weather disabled"),
        }

        match &self.tools_config.news.api_key {
            Some(key) => {
                let news: Arc<dyn ToolExecutor> =
                    Arc::new(NewsTool::new(key.clone(), &self.tools_config.news)?);
                registry.register("get_news", news)?;
            }
            None => tracing::warn!("NEWS_API_KEY not set, get_news disabled"),
        }

        let notes: Arc<dyn ToolExecutor> = Arc::new(NotesTool::new(self.store.clone()));
        registry.register("manage_notes", notes)?;

        tracing::info!("Registered {} tools: {:?}", registry.len(), registry.names());
        Ok(registry)
    }

    /// The tools configuration
    pub fn tools_config(&self) -> &ToolsConfig {
        &self.tools_config
    }
}
