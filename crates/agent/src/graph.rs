//! The two-state conversation graph.
//!
//! Model-Turn: trim the history, ask the provider, persist its answer.
//! Tool-Turn: execute the first requested tool call, persist the result,
//! hand control back to Model-Turn. A turn ends when the model answers
//! with plain text, or when the iteration cap trips.
//!
//! Only one tool call is acted on per Tool-Turn. This is deliberate: the
//! model sees each result before deciding on the next call, and the
//! stored history never contains unanswered call ids.

use crate::trim::trim_history;
use chatloom_core::message::{Message, ThreadId};
use chatloom_core::provider::{Provider, ProviderRequest};
use chatloom_core::store::ThreadStore;
use chatloom_core::tool::{ToolCall, ToolRegistry};
use chatloom_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_MAX_ITERATIONS: u32 = 25;

/// Orchestrates one conversation thread against a provider, a tool
/// registry, and a store.
pub struct ConversationGraph {
    provider: Arc<dyn Provider>,
    store: Arc<dyn ThreadStore>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: Option<f32>,
    history_max_chars: usize,
    max_iterations: u32,
}

impl ConversationGraph {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ThreadStore>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
        history_max_chars: usize,
    ) -> Self {
        Self {
            provider,
            store,
            tools,
            model: model.into(),
            temperature: None,
            history_max_chars,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Process one user message and return the final assistant text.
    ///
    /// `history` is the in-memory working copy of the thread; the durable
    /// copy advances with it, one append at a time.
    pub async fn send_message(
        &self,
        thread_id: &ThreadId,
        history: &mut Vec<Message>,
        user_text: impl Into<String>,
    ) -> Result<String> {
        let user_message = Message::user(user_text);
        self.append(thread_id, history, user_message).await?;

        info!(
            thread = %thread_id,
            messages = history.len(),
            "Processing user message"
        );

        let tool_definitions = self.tools.definitions();
        let mut iteration = 0;

        loop {
            iteration += 1;
            if iteration > self.max_iterations {
                warn!(
                    thread = %thread_id,
                    iterations = iteration,
                    "Iteration cap reached, ending turn"
                );
                let notice = Message::assistant(
                    "Reached the tool call limit for this message. Please rephrase or continue.",
                );
                let text = notice.content.clone();
                self.append(thread_id, history, notice).await?;
                return Ok(text);
            }

            // Model-Turn
            let trimmed = trim_history(history, self.history_max_chars);
            debug!(
                thread = %thread_id,
                iteration,
                sent = trimmed.len(),
                total = history.len(),
                "Model turn"
            );

            let mut request =
                ProviderRequest::new(&self.model, trimmed).with_tools(tool_definitions.clone());
            if let Some(temperature) = self.temperature {
                request = request.with_temperature(temperature);
            }

            let response = self.provider.complete(request).await?;
            let assistant = response.message;
            self.append(thread_id, history, assistant).await?;

            // Terminal when the model answered with plain text
            let newest = history.last().ok_or_else(|| {
                Error::Internal("history empty after append".into())
            })?;
            if newest.tool_calls.is_empty() {
                return Ok(newest.content.clone());
            }

            // Tool-Turn: act on the first call only
            if newest.tool_calls.len() > 1 {
                warn!(
                    thread = %thread_id,
                    requested = newest.tool_calls.len(),
                    "Multiple tool calls requested, executing the first only"
                );
            }
            let first = newest.tool_calls[0].clone();

            // An absent argument payload means a no-argument call; anything
            // else must parse. A parse failure becomes an error result the
            // model can read, and nothing is invoked.
            let parsed = if first.arguments.trim().is_empty() {
                Ok(serde_json::Value::Null)
            } else {
                serde_json::from_str(&first.arguments)
            };
            let arguments = match parsed {
                Ok(arguments) => arguments,
                Err(e) => {
                    warn!(
                        thread = %thread_id,
                        tool = %first.name,
                        "Tool call arguments are not valid JSON: {e}"
                    );
                    let tool_message = Message::tool_result(
                        &first.id,
                        format!("Error: tool call arguments are not valid JSON: {e}"),
                    );
                    self.append(thread_id, history, tool_message).await?;
                    continue;
                }
            };

            let call = ToolCall {
                id: first.id.clone(),
                name: first.name.clone(),
                arguments,
            };

            debug!(thread = %thread_id, tool = %call.name, "Tool turn");
            let result = self.tools.dispatch(&call).await;

            let tool_message = Message::tool_result(&result.call_id, &result.output);
            self.append(thread_id, history, tool_message).await?;
        }
    }

    /// Append to the working history and the store in lockstep.
    async fn append(
        &self,
        thread_id: &ThreadId,
        history: &mut Vec<Message>,
        message: Message,
    ) -> Result<()> {
        self.store.append(thread_id, &message).await?;
        history.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatloom_core::error::{ProviderError, ToolError};
    use chatloom_core::message::{Role, ToolCallRequest};
    use chatloom_core::provider::ProviderResponse;
    use chatloom_core::tool::{Tool, ToolResult};
    use chatloom_store::InMemoryStore;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a scripted sequence of responses.
    struct MockProvider {
        responses: Mutex<Vec<ProviderResponse>>,
    }

    impl MockProvider {
        fn scripted(responses: Vec<ProviderResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }

        fn text(content: &str) -> ProviderResponse {
            ProviderResponse {
                message: Message::assistant(content),
                usage: None,
            }
        }

        fn tool_call(id: &str, name: &str, arguments: &str) -> ProviderResponse {
            let mut message = Message::assistant("");
            message.tool_calls.push(ToolCallRequest {
                id: id.into(),
                name: name.into(),
                arguments: arguments.into(),
            });
            ProviderResponse {
                message,
                usage: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(ProviderResponse {
                    message: Message::assistant("(script exhausted)"),
                    usage: None,
                });
            }
            Ok(responses.remove(0))
        }
    }

    /// A two-operand arithmetic tool mirroring the production calculator.
    struct MulTool {
        executions: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Tool for MulTool {
        fn name(&self) -> &str {
            "calculator"
        }
        fn description(&self) -> &str {
            "Multiply two numbers"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<ToolResult, ToolError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            let a = arguments["a"].as_f64().unwrap_or(0.0);
            let b = arguments["b"].as_f64().unwrap_or(0.0);
            let product = (a * b) as i64;
            Ok(ToolResult {
                call_id: String::new(),
                success: true,
                output: format!(r#"{{"result":{product}}}"#),
                data: None,
            })
        }
    }

    fn graph_with(
        provider: Arc<MockProvider>,
        tools: ToolRegistry,
    ) -> (ConversationGraph, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let graph = ConversationGraph::new(
            provider,
            store.clone(),
            Arc::new(tools),
            "test-model",
            3000,
        );
        (graph, store)
    }

    #[tokio::test]
    async fn plain_text_turn_persists_two_messages() {
        let provider = MockProvider::scripted(vec![MockProvider::text("Hi! How can I help?")]);
        let (graph, store) = graph_with(provider, ToolRegistry::new());

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        let reply = graph
            .send_message(&thread, &mut history, "hello")
            .await
            .unwrap();

        assert_eq!(reply, "Hi! How can I help?");
        let persisted = store.load(&thread).await.unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].role, Role::User);
        assert_eq!(persisted[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn tool_turn_end_to_end() {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(MulTool {
            executions: executions.clone(),
        }));

        let provider = MockProvider::scripted(vec![
            MockProvider::tool_call(
                "call_1",
                "calculator",
                r#"{"a":12,"b":4,"operation":"mul"}"#,
            ),
            MockProvider::text("12 times 4 is 48."),
        ]);
        let (graph, store) = graph_with(provider, tools);

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        let reply = graph
            .send_message(&thread, &mut history, "what is 12 times 4")
            .await
            .unwrap();

        assert_eq!(reply, "12 times 4 is 48.");
        assert_eq!(executions.load(Ordering::SeqCst), 1);

        // Exactly four messages, in order: user, assistant w/ tool call,
        // tool result answering that call, final assistant text.
        let persisted = store.load(&thread).await.unwrap();
        assert_eq!(persisted.len(), 4);
        assert_eq!(persisted[0].role, Role::User);
        assert_eq!(persisted[0].content, "what is 12 times 4");
        assert_eq!(persisted[1].role, Role::Assistant);
        assert_eq!(persisted[1].tool_calls[0].name, "calculator");
        assert_eq!(persisted[2].role, Role::Tool);
        assert_eq!(persisted[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(persisted[2].content, r#"{"result":48}"#);
        assert_eq!(persisted[3].role, Role::Assistant);
        assert_eq!(persisted[3].content, "12 times 4 is 48.");
    }

    #[tokio::test]
    async fn only_first_of_multiple_tool_calls_executes() {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(MulTool {
            executions: executions.clone(),
        }));

        let mut multi = Message::assistant("");
        multi.tool_calls.push(ToolCallRequest {
            id: "call_1".into(),
            name: "calculator".into(),
            arguments: r#"{"a":2,"b":3}"#.into(),
        });
        multi.tool_calls.push(ToolCallRequest {
            id: "call_2".into(),
            name: "calculator".into(),
            arguments: r#"{"a":4,"b":5}"#.into(),
        });

        let provider = MockProvider::scripted(vec![
            ProviderResponse {
                message: multi,
                usage: None,
            },
            MockProvider::text("done"),
        ]);
        let (graph, store) = graph_with(provider, tools);

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        graph
            .send_message(&thread, &mut history, "multiply things")
            .await
            .unwrap();

        assert_eq!(executions.load(Ordering::SeqCst), 1);
        let persisted = store.load(&thread).await.unwrap();
        let tool_messages: Vec<_> = persisted.iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(tool_messages.len(), 1);
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn malformed_arguments_yield_error_result_without_executing() {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(MulTool {
            executions: executions.clone(),
        }));

        let provider = MockProvider::scripted(vec![
            MockProvider::tool_call("call_7", "calculator", "{this is not json"),
            MockProvider::text("That request did not work out."),
        ]);
        let (graph, store) = graph_with(provider, tools);

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        let reply = graph
            .send_message(&thread, &mut history, "multiply something")
            .await
            .unwrap();

        assert_eq!(reply, "That request did not work out.");
        assert_eq!(executions.load(Ordering::SeqCst), 0);

        let persisted = store.load(&thread).await.unwrap();
        assert_eq!(persisted[2].role, Role::Tool);
        assert_eq!(persisted[2].tool_call_id.as_deref(), Some("call_7"));
        assert!(persisted[2].content.contains("not valid JSON"));
    }

    #[tokio::test]
    async fn empty_arguments_dispatch_as_a_no_argument_call() {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(MulTool {
            executions: executions.clone(),
        }));

        let provider = MockProvider::scripted(vec![
            MockProvider::tool_call("call_8", "calculator", ""),
            MockProvider::text("done"),
        ]);
        let (graph, _store) = graph_with(provider, tools);

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        graph
            .send_message(&thread, &mut history, "go")
            .await
            .unwrap();

        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_result_and_recovers() {
        let provider = MockProvider::scripted(vec![
            MockProvider::tool_call("call_9", "no_such_tool", "{}"),
            MockProvider::text("Sorry, that tool is unavailable."),
        ]);
        let (graph, store) = graph_with(provider, ToolRegistry::new());

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        let reply = graph
            .send_message(&thread, &mut history, "use the magic tool")
            .await
            .unwrap();

        assert_eq!(reply, "Sorry, that tool is unavailable.");
        let persisted = store.load(&thread).await.unwrap();
        assert_eq!(persisted[2].role, Role::Tool);
        assert_eq!(persisted[2].tool_call_id.as_deref(), Some("call_9"));
        assert!(persisted[2].content.contains("not found"));
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        struct FailingProvider;

        #[async_trait::async_trait]
        impl Provider for FailingProvider {
            fn name(&self) -> &str {
                "failing"
            }
            async fn complete(
                &self,
                _request: ProviderRequest,
            ) -> std::result::Result<ProviderResponse, ProviderError> {
                Err(ProviderError::RateLimited {
                    retry_after_secs: 5,
                })
            }
        }

        let store = Arc::new(InMemoryStore::new());
        let graph = ConversationGraph::new(
            Arc::new(FailingProvider),
            store.clone(),
            Arc::new(ToolRegistry::new()),
            "test-model",
            3000,
        );

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        let err = graph
            .send_message(&thread, &mut history, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));

        // User message was persisted before the failure
        assert_eq!(store.load(&thread).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn iteration_cap_ends_looping_turn() {
        // A provider that always requests another tool call
        struct LoopingProvider;

        #[async_trait::async_trait]
        impl Provider for LoopingProvider {
            fn name(&self) -> &str {
                "looping"
            }
            async fn complete(
                &self,
                _request: ProviderRequest,
            ) -> std::result::Result<ProviderResponse, ProviderError> {
                let mut message = Message::assistant("");
                message.tool_calls.push(ToolCallRequest {
                    id: "call_loop".into(),
                    name: "calculator".into(),
                    arguments: r#"{"a":1,"b":1}"#.into(),
                });
                Ok(ProviderResponse {
                    message,
                    usage: None,
                })
            }
        }

        let mut tools = ToolRegistry::new();
        tools.register(Box::new(MulTool {
            executions: Arc::new(AtomicUsize::new(0)),
        }));

        let store = Arc::new(InMemoryStore::new());
        let graph = ConversationGraph::new(
            Arc::new(LoopingProvider),
            store,
            Arc::new(tools),
            "test-model",
            3000,
        )
        .with_max_iterations(3);

        let thread = ThreadId::from("t1");
        let mut history = Vec::new();
        let reply = graph
            .send_message(&thread, &mut history, "loop forever")
            .await
            .unwrap();

        assert!(reply.contains("limit"));
    }

    #[tokio::test]
    async fn trimming_limits_what_the_model_sees() {
        // Capture how many messages the provider receives
        struct CountingProvider {
            seen: Mutex<usize>,
        }

        #[async_trait::async_trait]
        impl Provider for CountingProvider {
            fn name(&self) -> &str {
                "counting"
            }
            async fn complete(
                &self,
                request: ProviderRequest,
            ) -> std::result::Result<ProviderResponse, ProviderError> {
                *self.seen.lock().unwrap() = request.messages.len();
                Ok(ProviderResponse {
                    message: Message::assistant("ok"),
                    usage: None,
                })
            }
        }

        let provider = Arc::new(CountingProvider {
            seen: Mutex::new(0),
        });
        let store = Arc::new(InMemoryStore::new());
        let graph = ConversationGraph::new(
            provider.clone(),
            store,
            Arc::new(ToolRegistry::new()),
            "test-model",
            20,
        );

        let thread = ThreadId::from("t1");
        let mut history = vec![
            Message::user(&"x".repeat(50)),
            Message::assistant(&"y".repeat(50)),
        ];
        graph
            .send_message(&thread, &mut history, "hi")
            .await
            .unwrap();

        // Budget of 20 chars only fits the new 2-char user message
        assert_eq!(*provider.seen.lock().unwrap(), 1);
    }
}
