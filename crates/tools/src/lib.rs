//! Built-in tool implementations for Chatloom.
//!
//! Tools give the agent the ability to interact with the world:
//! do arithmetic, look up stock prices, and search the web. Remote
//! MCP tools are bridged in separately by chatloom-mcp.

pub mod calculator;
pub mod stock_price;
pub mod web_search;

use chatloom_core::tool::ToolRegistry;

/// Create a tool registry with all built-in tools.
///
/// `alpha_vantage_key` feeds the stock price tool; everything else is
/// keyless.
pub fn default_registry(alpha_vantage_key: impl Into<String>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(calculator::CalculatorTool));
    registry.register(Box::new(stock_price::StockPriceTool::new(
        alpha_vantage_key,
    )));
    registry.register(Box::new(web_search::WebSearchTool::new()));
    registry
}
