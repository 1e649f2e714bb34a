//! Tool trait, registry, and dispatch.
//!
//! Tools are what give the agent the ability to act in the world: do math,
//! look up a stock price, search the web, or call out to a remote MCP
//! server. Local tools and remote bridges all implement the same async
//! `Tool` trait, so their shape is resolved once at registration time and
//! the dispatch path never has to re-inspect what kind of tool it holds.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

/// A request to execute a tool, with arguments already parsed.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
///
/// On failure `success` is false and `output` is an error descriptor
/// string; the model sees the error content and can narrate or recover.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// The call ID this result answers
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    pub data: Option<serde_json::Value>,
}

/// The core Tool trait.
///
/// Each tool (calculator, get_stock_price, web_search, MCP bridges)
/// implements this trait. Tools are registered in the ToolRegistry and
/// exposed to the model as descriptors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The conversation graph uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Dispatch tool calls when the model requests them
///
/// Read-only after startup; registration happens while the application is
/// assembling its tool set.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name
    /// (last write wins, keeping the original registration position).
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&pos| self.tools[pos].as_ref())
    }

    /// Get all tool definitions in registration order (for the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a tool call, absorbing every failure mode into the result.
    ///
    /// An unknown tool name invokes nothing and yields an error result
    /// tagged with the original call id. An execution failure is converted
    /// into an error-content result. This method never returns an error:
    /// the model is the intended consumer of failures.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, "Requested tool not found");
            return ToolResult {
                call_id: call.id.clone(),
                success: false,
                output: format!("Error: requested tool '{}' not found.", call.name),
                data: None,
            };
        };

        match tool.execute(call.arguments.clone()).await {
            Ok(mut result) => {
                result.call_id = call.id.clone();
                result
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult {
                    call_id: call.id.clone(),
                    success: false,
                    output: format!("Tool execution failed: {e}"),
                    data: None,
                }
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
