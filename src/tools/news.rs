//! Headline lookup via NewsAPI

use super::{query_arg, query_parameters, ToolExecutor, ToolResult};
use crate::config::NewsConfig;
use crate::error::{MelissaError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// News tool backed by the NewsAPI top-headlines endpoint
pub struct NewsTool {
    client: Client,
    api_key: String,
    config: NewsConfig,
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    #[serde(default)]
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

impl NewsTool {
    /// Create the tool
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>, config: &NewsConfig) -> Result<Self> {
        // NewsAPI rejects requests without a user agent
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("melissa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MelissaError::Http)
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config: config.clone(),
        })
    }

    async fn fetch(&self, topic: Option<&str>) -> Result<Vec<String>> {
        let page_size = self.config.page_size.to_string();
        let mut params = vec![
            ("apiKey", self.api_key.as_str()),
            ("country", self.config.country.as_str()),
            ("pageSize", page_size.as_str()),
        ];
        if let Some(topic) = topic {
            params.push(("q", topic));
        }

        let response: HeadlinesResponse = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .articles
            .into_iter()
            .filter_map(|a| {
                let title = a.title.filter(|t| !t.trim().is_empty())?;
                match a.source.and_then(|s| s.name) {
                    Some(source) if !title.ends_with(&source) => {
                        Some(format!("{} ({})", title, source))
                    }
                    _ => Some(title),
                }
            })
            .collect())
    }
}

/// Topic named after "about", "on" or "regarding", if any
fn topic_from_query(query: &str) -> Option<String> {
    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let pos = words
        .iter()
        .position(|w| matches!(*w, "about" | "on" | "regarding"))?;

    let topic = words[pos + 1..]
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '?' | '.' | '!' | ','))
        .trim()
        .to_string();
    Some(topic).filter(|t| !t.is_empty() && t != "today")
}

fn format_headlines(topic: Option<&str>, headlines: &[String]) -> String {
    if headlines.is_empty() {
        return match topic {
            Some(t) => format!("I couldn't find any headlines about {}.", t),
            None => "I couldn't find any headlines right now.".to_string(),
        };
    }

    let heading = match topic {
        Some(t) => format!("Top headlines about {}:", t),
        None => "Top headlines:".to_string(),
    };
    let items: Vec<String> = headlines
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{}. {}", i + 1, h))
        .collect();
    format!("{}\n{}", heading, items.join("\n"))
}

#[async_trait]
impl ToolExecutor for NewsTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "get_news",
            "description": "Get today's top news headlines, optionally about a topic.",
            "parameters": query_parameters(
                "The user's request, e.g. 'latest news' or 'news about technology'"
            )
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let topic = topic_from_query(query_arg(&args));

        match self.fetch(topic.as_deref()).await {
            Ok(headlines) => Ok(ToolResult::success(format_headlines(
                topic.as_deref(),
                &headlines,
            ))),
            Err(e) => {
                tracing::warn!("News lookup failed: {}", e);
                Ok(ToolResult::success(
                    "Sorry, I couldn't fetch the news right now.",
                ))
            }
        }
    }
}
