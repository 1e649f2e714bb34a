//! Interactive chat session.
//!
//! A session owns the active thread and its working history. New threads
//! start under a generated uuid name; the first user message triggers
//! title generation, and the thread is renamed before anything is
//! persisted under it, so the uuid name never reaches the store.

use anyhow::Context;
use chatloom_agent::{ConversationGraph, generate_title};
use chatloom_config::AppConfig;
use chatloom_core::message::{Message, ThreadId};
use chatloom_core::provider::Provider;
use chatloom_core::store::ThreadStore;
use chatloom_core::tool::ToolRegistry;
use chatloom_providers::OpenAiCompatProvider;
use chatloom_store::SqliteStore;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub struct Session {
    graph: ConversationGraph,
    provider: Arc<dyn Provider>,
    store: Arc<dyn ThreadStore>,
    model: String,
    active: ThreadId,
    history: Vec<Message>,
}

impl Session {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ThreadStore>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
        temperature: f32,
        history_max_chars: usize,
    ) -> Self {
        let model = model.into();
        let graph = ConversationGraph::new(
            provider.clone(),
            store.clone(),
            tools,
            &model,
            history_max_chars,
        )
        .with_temperature(temperature);

        Self {
            graph,
            provider,
            store,
            model,
            active: ThreadId::new(),
            history: Vec::new(),
        }
    }

    pub fn active_thread(&self) -> &ThreadId {
        &self.active
    }

    /// Send one user message on the active thread and return the reply.
    ///
    /// The first message on a fresh thread renames it from the generated
    /// uuid to a model-produced title. Title generation failing is not
    /// fatal; the thread just keeps its uuid name.
    pub async fn send(&mut self, text: &str) -> chatloom_core::Result<String> {
        if self.history.is_empty() && self.active.is_generated() {
            match generate_title(self.provider.as_ref(), &self.model, text).await {
                Ok(title) => {
                    info!(from = %self.active, to = %title, "Renamed thread");
                    self.active = ThreadId(title);
                }
                Err(e) => {
                    warn!("Title generation failed, keeping generated thread name: {e}");
                }
            }
        }

        self.graph
            .send_message(&self.active, &mut self.history, text)
            .await
    }

    /// Start a fresh thread with an empty history.
    pub fn new_thread(&mut self) {
        self.active = ThreadId::new();
        self.history.clear();
    }

    /// Switch to an existing thread, loading its history from the store.
    pub async fn switch(&mut self, thread: &str) -> chatloom_core::Result<()> {
        let id = ThreadId::from(thread);
        self.history = self.store.load(&id).await?;
        self.active = id;
        Ok(())
    }

    pub async fn threads(&self) -> Vec<ThreadId> {
        self.store.list_threads().await
    }

    /// Wipe the store and start over.
    pub async fn clear(&mut self) -> chatloom_core::Result<()> {
        self.store.clear().await?;
        self.new_thread();
        Ok(())
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteStore>> {
    if let Some(parent) = config.store.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = SqliteStore::new(&config.store.db_path.to_string_lossy())
        .await
        .context("opening thread store")?;
    Ok(Arc::new(store))
}

fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<OpenAiCompatProvider>> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured. Set GROQ_API_KEY or add api_key to {}",
            AppConfig::config_dir().join("config.toml").display()
        )
    })?;
    let provider = OpenAiCompatProvider::new("groq", &config.api_url, api_key)
        .context("building provider")?;
    Ok(Arc::new(provider))
}

pub async fn run_chat() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let provider = build_provider(&config)?;
    let store = open_store(&config).await?;

    let mut registry = chatloom_tools::default_registry(&config.tools.alpha_vantage_key);
    let (connections, mcp_tools) =
        chatloom_mcp::McpConnections::connect_all(&config.mcp_servers).await;
    for tool in mcp_tools {
        registry.register(tool);
    }

    println!();
    println!("  Chatloom ({})", config.model);
    println!("  Tools: {}", registry.names().join(", "));
    if !connections.server_names().is_empty() {
        println!("  MCP servers: {}", connections.server_names().join(", "));
    }
    println!();
    println!("  Commands: /new /threads /switch <name> /clear /exit");
    println!();

    let mut session = Session::new(
        provider,
        store,
        Arc::new(registry),
        &config.model,
        config.temperature,
        config.history_max_chars,
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let mut parts = command.split_whitespace();
            match parts.next() {
                Some("exit") | Some("quit") => break,
                Some("new") => {
                    session.new_thread();
                    println!("  Started a new thread.");
                }
                Some("threads") => {
                    let threads = session.threads().await;
                    if threads.is_empty() {
                        println!("  No stored threads.");
                    }
                    for thread in threads {
                        println!("  - {thread}");
                    }
                }
                Some("switch") => match parts.next() {
                    Some(name) => match session.switch(name).await {
                        Ok(()) => println!("  Switched to '{name}'."),
                        Err(e) => eprintln!("  [Error] {e}"),
                    },
                    None => eprintln!("  Usage: /switch <name>"),
                },
                Some("clear") => match session.clear().await {
                    Ok(()) => println!("  All threads deleted."),
                    Err(e) => eprintln!("  [Error] {e}"),
                },
                _ => eprintln!("  Unknown command: /{command}"),
            }
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        match session.send(input).await {
            Ok(reply) => {
                println!();
                for line in reply.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => eprintln!("  [Error] {e}"),
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    connections.shutdown().await;
    println!("  Goodbye!");
    Ok(())
}

pub async fn list_threads() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let store = open_store(&config).await?;
    let threads = store.list_threads().await;
    if threads.is_empty() {
        println!("No stored threads.");
    }
    for thread in threads {
        println!("{thread}");
    }
    Ok(())
}

pub async fn clear_threads() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let store = open_store(&config).await?;
    store.clear().await.context("clearing threads")?;
    println!("All threads deleted.");
    Ok(())
}
