//! The Provider trait and its request/response types.
//!
//! A provider is an OpenAI-compatible chat completion backend. The
//! conversation graph talks to it through one method, `complete`, passing
//! the trimmed history and the registered tool definitions. The provider
//! answers with either plain text or a list of tool call requests.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool definition as presented to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (e.g. "calculator")
    pub name: String,

    /// What the tool does
    pub description: String,

    /// JSON Schema for the tool's parameters
    pub parameters: serde_json::Value,
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model identifier (e.g. "openai/gpt-oss-120b")
    pub model: String,

    /// The conversation history, oldest first
    pub messages: Vec<Message>,

    /// Tools the model may call; empty disables tool calling
    pub tools: Vec<ToolDefinition>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A completion response: the assistant message plus usage accounting.
///
/// When the model wants to act, `message.tool_calls` is non-empty and
/// `message.content` may be empty. The graph decides what happens next.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// The assistant message the model produced
    pub message: Message,

    /// Token usage, if the backend reported it
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// Whether the model requested any tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.message.tool_calls.is_empty()
    }
}

/// An LLM completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider name for logging (e.g. "groq").
    fn name(&self) -> &str;

    /// Run one chat completion.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;
}
