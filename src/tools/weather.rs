//! Current weather lookup via OpenWeatherMap

use super::{query_arg, query_parameters, ToolExecutor, ToolResult};
use crate::config::WeatherConfig;
use crate::error::{MelissaError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Weather tool backed by the OpenWeatherMap current-weather API
pub struct WeatherTool {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

/// Outcome of pulling a city out of a free-text query
#[derive(Debug, PartialEq, Eq)]
enum CityQuery {
    City(String),
    MissingIn,
    Empty,
}

impl WeatherTool {
    /// Create the tool
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>, config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(MelissaError::Http)
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.clone(),
        })
    }

    async fn fetch(&self, city: &str) -> Result<WeatherResponse> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// The words after the first standalone "in", lowercased
fn city_from_query(query: &str) -> CityQuery {
    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let Some(pos) = words.iter().position(|w| *w == "in") else {
        return CityQuery::MissingIn;
    };

    let city = words[pos + 1..]
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '?' | '.' | '!' | ','))
        .trim()
        .to_string();

    if city.is_empty() {
        CityQuery::Empty
    } else {
        CityQuery::City(city)
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_report(city: &str, data: &WeatherResponse) -> String {
    let conditions = data
        .weather
        .first()
        .map(|c| capitalize(&c.description))
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        "Current weather in {}:\n\
         Temperature: {}°C\n\
         Conditions: {}\n\
         Humidity: {}%\n\
         Min Temp: {}°C\n\
         Max Temp: {}°C\n\
         Feels Like: {}°C",
        title_case(city),
        data.main.temp,
        conditions,
        data.main.humidity,
        data.main.temp_min,
        data.main.temp_max,
        data.main.feels_like
    )
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "get_weather",
            "description": "Get the current weather for a city.",
            "parameters": query_parameters(
                "The user's question naming the city after 'in', e.g. 'weather in London'"
            )
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let city = match city_from_query(query_arg(&args)) {
            CityQuery::City(city) => city,
            CityQuery::MissingIn => {
                return Ok(ToolResult::success(
                    "Please specify a city using 'in'. For example: 'weather in London'",
                ))
            }
            CityQuery::Empty => return Ok(ToolResult::success("Please specify a city name")),
        };

        match self.fetch(&city).await {
            Ok(data) => Ok(ToolResult::success(format_report(&city, &data))),
            Err(e) => {
                tracing::warn!("Weather lookup for {} failed: {}", city, e);
                Ok(ToolResult::success(format!(
                    "Sorry, I couldn't fetch weather information for {}",
                    city
                )))
            }
        }
    }
}
