//! Stock price lookup via the Alpha Vantage intraday API.
//!
//! Fetches the 5-minute intraday series for a symbol and reports the
//! close of the newest bar. Any failure along the way (network, bad
//! payload, unknown symbol) becomes an error-content result the model
//! can read.

use async_trait::async_trait;
use chatloom_core::error::ToolError;
use chatloom_core::tool::{Tool, ToolResult};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

pub struct StockPriceTool {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl StockPriceTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the tool at a different endpoint (used by tests).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn fetch_latest_close(&self, symbol: &str) -> Result<f64, String> {
        let url = format!(
            "{}/query?function=TIME_SERIES_INTRADAY&symbol={}&interval=5min&apikey={}",
            self.base_url, symbol, self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let body: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;

        let series = body["Time Series (5min)"]
            .as_object()
            .ok_or_else(|| format!("no intraday data for '{symbol}'"))?;

        // Keys are timestamps; lexicographic max is the newest bar
        let newest = series
            .keys()
            .max()
            .ok_or_else(|| format!("empty intraday series for '{symbol}'"))?;

        series[newest]["4. close"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| format!("malformed close price for '{symbol}'"))
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        "get_stock_price"
    }

    fn description(&self) -> &str {
        "Fetch the latest intraday price for a stock ticker symbol (e.g. AAPL, MSFT)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "The stock ticker symbol, e.g. 'AAPL'"
                }
            },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let symbol = arguments["symbol"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'symbol' argument".into()))?
            .to_uppercase();

        debug!(symbol = %symbol, "Fetching stock price");

        match self.fetch_latest_close(&symbol).await {
            Ok(price) => {
                let payload = serde_json::json!({"symbol": symbol, "price": price});
                Ok(ToolResult {
                    call_id: String::new(),
                    success: true,
                    output: payload.to_string(),
                    data: Some(payload),
                })
            }
            Err(reason) => {
                let payload =
                    serde_json::json!({"error": format!("Unable to fetch price: {reason}")});
                Ok(ToolResult {
                    call_id: String::new(),
                    success: false,
                    output: payload.to_string(),
                    data: Some(payload),
                })
            }
        }
    }
}
