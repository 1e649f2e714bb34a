//! Bridges one remote MCP tool into the local `Tool` trait.

use async_trait::async_trait;
use chatloom_core::error::ToolError;
use chatloom_core::tool::{Tool, ToolResult};
use rmcp::model::{CallToolRequestParams, CallToolResult, Content, JsonObject};
use rmcp::service::{Peer, RoleClient};
use std::sync::Arc;
use std::time::Duration;

/// A remote tool exposed by an MCP server, callable like any local tool.
///
/// All tools from one server share the same `Peer` handle; the underlying
/// session lives in [`McpConnections`] and must outlive the registry.
///
/// [`McpConnections`]: crate::loader::McpConnections
pub struct McpTool {
    server: String,
    name: String,
    description: String,
    input_schema: serde_json::Value,
    peer: Arc<Peer<RoleClient>>,
    timeout: Duration,
}

impl McpTool {
    pub fn new(
        server: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        input_schema: serde_json::Value,
        peer: Arc<Peer<RoleClient>>,
        timeout: Duration,
    ) -> Self {
        Self {
            server: server.into(),
            name: name.into(),
            description: description.unwrap_or_default(),
            input_schema,
            peer,
            timeout,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.input_schema.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let arguments = coerce_arguments(arguments)?;

        let call = self.peer.call_tool(CallToolRequestParams {
            meta: None,
            name: self.name.clone().into(),
            arguments,
            task: None,
        });

        let result = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: format!(
                    "MCP server '{}' did not answer within {:?}",
                    self.server, self.timeout
                ),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: format!("MCP server '{}': {e}", self.server),
            })?;

        Ok(call_result_to_tool_result(result))
    }
}

/// MCP tool arguments must be a JSON object (or absent). The model
/// sometimes produces a JSON string wrapping the object; unwrap it.
fn coerce_arguments(value: serde_json::Value) -> Result<Option<JsonObject>, ToolError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                ToolError::InvalidArguments(format!("arguments must be valid JSON: {e}"))
            })?;
            coerce_arguments(parsed)
        }
        other => Err(ToolError::InvalidArguments(format!(
            "arguments must be a JSON object, got {other}"
        ))),
    }
}

fn extract_text(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(|item| item.as_text().map(|t| t.text.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn call_result_to_tool_result(result: CallToolResult) -> ToolResult {
    let is_error = result.is_error.unwrap_or(false);
    let text = extract_text(&result.content);

    let output = if !text.is_empty() {
        text
    } else if let Some(ref structured) = result.structured_content {
        structured.to_string()
    } else if is_error {
        "MCP tool returned an error result".to_string()
    } else {
        String::new()
    };

    ToolResult {
        call_id: String::new(),
        success: !is_error,
        output,
        data: result.structured_content,
    }
}
