//! Connects to configured MCP servers and collects their tools.

use crate::bridge::McpTool;
use chatloom_config::McpServerConfig;
use chatloom_core::error::McpError;
use chatloom_core::tool::Tool;
use rmcp::ServiceExt;
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::StreamableHttpClientTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Holds the live MCP sessions.
///
/// Tools handed out by [`connect_all`] borrow peer handles from these
/// sessions, so this struct must stay alive as long as the tool registry
/// does. Dropping or shutting it down closes the connections.
///
/// [`connect_all`]: McpConnections::connect_all
pub struct McpConnections {
    services: Vec<NamedService>,
}

struct NamedService {
    name: String,
    service: RunningService<RoleClient, ()>,
}

impl McpConnections {
    /// Connect to every configured server and collect the bridged tools.
    ///
    /// Per-server skip-and-log: a server that fails to connect or to list
    /// its tools is logged and skipped, and the remaining servers still
    /// load. With an empty config this is a no-op.
    pub async fn connect_all(servers: &[McpServerConfig]) -> (Self, Vec<Box<dyn Tool>>) {
        let mut connections = Self {
            services: Vec::new(),
        };
        let mut tools: Vec<Box<dyn Tool>> = Vec::new();

        for server in servers {
            match connections.connect(&server.name, &server.url).await {
                Ok(mut server_tools) => tools.append(&mut server_tools),
                Err(e) => warn!("Skipping MCP server '{}': {e}", server.name),
            }
        }

        (connections, tools)
    }

    /// Connect to one server, discover its tools, and keep the session.
    pub async fn connect(
        &mut self,
        name: &str,
        url: &str,
    ) -> Result<Vec<Box<dyn Tool>>, McpError> {
        let transport = StreamableHttpClientTransport::from_uri(url);

        let service = tokio::time::timeout(HANDSHAKE_TIMEOUT, ().serve(transport))
            .await
            .map_err(|_| McpError::Handshake {
                server: name.to_string(),
                reason: format!("timed out after {HANDSHAKE_TIMEOUT:?}"),
            })?
            .map_err(|e| McpError::Handshake {
                server: name.to_string(),
                reason: e.to_string(),
            })?;

        let discovered = service
            .list_all_tools()
            .await
            .map_err(|e| McpError::Discovery {
                server: name.to_string(),
                reason: e.to_string(),
            })?;

        let peer: Arc<Peer<RoleClient>> = Arc::new(service.peer().clone());

        let tools: Vec<Box<dyn Tool>> = discovered
            .into_iter()
            .map(|t| {
                Box::new(McpTool::new(
                    name,
                    t.name.to_string(),
                    t.description.map(|d| d.to_string()),
                    serde_json::to_value(&*t.input_schema).unwrap_or_default(),
                    Arc::clone(&peer),
                    CALL_TIMEOUT,
                )) as Box<dyn Tool>
            })
            .collect();

        info!(
            "MCP server '{name}' connected: {} tool(s) discovered",
            tools.len()
        );
        for tool in &tools {
            info!("  -> {name}.{}", tool.name());
        }

        self.services.push(NamedService {
            name: name.to_string(),
            service,
        });
        Ok(tools)
    }

    /// Names of the servers with a live session.
    pub fn server_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    /// Cancel every session.
    pub async fn shutdown(self) {
        for named in self.services {
            info!("Disconnecting MCP server '{}'", named.name);
            if let Err(e) = named.service.cancel().await {
                warn!("Error cancelling MCP server '{}': {e}", named.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_all_with_no_servers_is_empty() {
        let (connections, tools) = McpConnections::connect_all(&[]).await;
        assert!(tools.is_empty());
        assert!(connections.server_names().is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_skipped() {
        let servers = vec![McpServerConfig {
            name: "Unreachable".into(),
            url: "http://127.0.0.1:1/mcp".into(),
        }];
        let (connections, tools) = McpConnections::connect_all(&servers).await;
        assert!(tools.is_empty());
        assert!(connections.server_names().is_empty());
    }
}
