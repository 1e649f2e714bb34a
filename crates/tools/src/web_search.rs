//! Web search via the DuckDuckGo Instant Answer API.
//!
//! Keyless endpoint. Returns the abstract text when DuckDuckGo has one,
//! plus a handful of related-topic snippets. Thin results are normal for
//! this API; the tool reports whatever it got and lets the model decide.

use async_trait::async_trait;
use chatloom_core::error::ToolError;
use chatloom_core::tool::{Tool, ToolResult};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.duckduckgo.com";
const MAX_RELATED_TOPICS: usize = 5;

pub struct WebSearchTool {
    base_url: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the tool at a different endpoint (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for a topic. Returns a short abstract and related snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        debug!(query = %query, "Running web search");

        let url = format!("{}/?format=json&no_html=1", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "web_search".into(),
                reason: e.to_string(),
            })?;

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "web_search".into(),
                    reason: format!("malformed response: {e}"),
                })?;

        let abstract_text = body["AbstractText"].as_str().unwrap_or("").to_string();

        let related: Vec<String> = body["RelatedTopics"]
            .as_array()
            .map(|topics| {
                topics
                    .iter()
                    .filter_map(|t| t["Text"].as_str())
                    .take(MAX_RELATED_TOPICS)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let payload = serde_json::json!({
            "query": query,
            "abstract": abstract_text,
            "related": related,
        });

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: payload.to_string(),
            data: Some(payload),
        })
    }
}
