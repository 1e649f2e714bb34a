//! Remote MCP tool providers for Chatloom.
//!
//! Connects to MCP servers over the Streamable HTTP transport, discovers
//! their tools, and bridges each one into the local `Tool` trait so the
//! registry treats remote tools exactly like built-in ones.
//!
//! Loading is per-server and skip-and-log: one unreachable server never
//! blocks the rest of the startup.

pub mod bridge;
pub mod loader;

pub use bridge::McpTool;
pub use loader::McpConnections;
