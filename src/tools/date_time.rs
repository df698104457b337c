//! Local clock lookup

use super::{query_arg, query_parameters, ToolExecutor, ToolResult};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

/// Answers "what time is it" and "what's the date" from the local clock
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeTool;

impl DateTimeTool {
    /// Create the tool
    pub fn new() -> Self {
        Self
    }
}

/// Build the reply for `query` at instant `now`
///
/// Time keywords win over date keywords when both are present.
pub fn describe(query: &str, now: NaiveDateTime) -> String {
    let query = query.to_lowercase();

    if ["time", "hour"].iter().any(|w| query.contains(w)) {
        format!(
            "The current time in 24 hour format is {}",
            now.format("%H:%M")
        )
    } else if ["date", "day", "today"].iter().any(|w| query.contains(w)) {
        format!(
            "Today's date in DD MMM YYYY format is {}",
            now.format("%d %b %Y")
        )
    } else {
        "You either didn't ask for date or time, or I wasn't able to understand it. \
         Please be more specific."
            .to_string()
    }
}

#[async_trait]
impl ToolExecutor for DateTimeTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "get_date_time",
            "description": "Get the current local time or today's date.",
            "parameters": query_parameters(
                "The user's question, e.g. 'what time is it' or 'what is today's date'"
            )
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let query = query_arg(&args);
        tracing::debug!("get_date_time query: {}", query);
        Ok(ToolResult::success(describe(query, Local::now().naive_local())))
    }
}
