//! Configuration loading, validation, and management for Chatloom.
//!
//! Loads configuration from `~/.chatloom/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatloom/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Groq API key. Required for chat; env `GROQ_API_KEY` overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier sent to the completion backend
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// History trimming budget in characters
    #[serde(default = "default_history_max_chars")]
    pub history_max_chars: usize,

    /// Persistence configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Local tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Remote MCP tool servers
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
}

fn default_model() -> String {
    "openai/gpt-oss-120b".into()
}
fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_history_max_chars() -> usize {
    3000
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("history_max_chars", &self.history_max_chars)
            .field("store", &self.store)
            .field("tools", &self.tools)
            .field("mcp_servers", &self.mcp_servers)
            .finish()
    }
}

/// Thread persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    AppConfig::config_dir().join("chatloom.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Settings for the built-in local tools.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Alpha Vantage API key for the stock price tool.
    /// The default is the public demo-tier key.
    #[serde(default = "default_alpha_vantage_key")]
    pub alpha_vantage_key: String,
}

fn default_alpha_vantage_key() -> String {
    "K3K571E7USH1KRBF".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_key: default_alpha_vantage_key(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("alpha_vantage_key", &"[REDACTED]")
            .finish()
    }
}

/// One remote MCP tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Display name used in logs (e.g. "ExpenseTracker")
    pub name: String,

    /// Streamable HTTP endpoint URL
    pub url: String,
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatloom/config.toml).
    ///
    /// Environment variables override file values:
    /// - `GROQ_API_KEY` for the provider key
    /// - `CHATLOOM_MODEL` for the model
    /// - `CHATLOOM_HISTORY_MAX_CHARS` for the trimming budget
    /// - `CHATLOOM_DB_PATH` for the SQLite file
    /// - `ALPHA_VANTAGE_KEY` for the stock tool
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("CHATLOOM_MODEL") {
            config.model = model;
        }
        if let Ok(raw) = std::env::var("CHATLOOM_HISTORY_MAX_CHARS") {
            config.history_max_chars = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CHATLOOM_HISTORY_MAX_CHARS must be a positive integer, got '{raw}'"
                ))
            })?;
        }
        if let Ok(path) = std::env::var("CHATLOOM_DB_PATH") {
            config.store.db_path = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var("ALPHA_VANTAGE_KEY") {
            config.tools.alpha_vantage_key = key;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatloom")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.history_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "history_max_chars must be greater than 0".into(),
            ));
        }

        for server in &self.mcp_servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "mcp_servers entries must have a non-empty name".into(),
                ));
            }
            if !server.url.starts_with("http://") && !server.url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "mcp_servers entry '{}' has invalid url '{}'",
                    server.name, server.url
                )));
            }
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_url: default_api_url(),
            temperature: default_temperature(),
            history_max_chars: default_history_max_chars(),
            store: StoreConfig::default(),
            tools: ToolsConfig::default(),
            mcp_servers: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for chatloom_core::Error {
    fn from(e: ConfigError) -> Self {
        chatloom_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.model, "openai/gpt-oss-120b");
        assert_eq!(config.api_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.history_max_chars, 3000);
        assert!(config.mcp_servers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.history_max_chars, config.history_max_chars);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_history_budget_rejected() {
        let config = AppConfig {
            history_max_chars: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().model, "openai/gpt-oss-120b");
    }

    #[test]
    fn mcp_servers_parsing() {
        let toml_str = r#"
[[mcp_servers]]
name = "ExpenseTracker"
url = "https://expenses.example.com/mcp"

[[mcp_servers]]
name = "Notes"
url = "http://localhost:8787/mcp"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mcp_servers.len(), 2);
        assert_eq!(config.mcp_servers[0].name, "ExpenseTracker");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn mcp_server_with_bad_url_rejected() {
        let toml_str = r#"
[[mcp_servers]]
name = "Broken"
url = "not-a-url"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("gsk_super_secret".into()),
            ..AppConfig::default()
        };
        let dump = format!("{config:?}");
        assert!(!dump.contains("gsk_super_secret"));
        assert!(dump.contains("[REDACTED]"));
    }

    #[test]
    fn config_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "llama-3.3-70b-versatile"
history_max_chars = 5000

[store]
db_path = "/tmp/test-chatbot.db"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.history_max_chars, 5000);
        assert_eq!(config.store.db_path, PathBuf::from("/tmp/test-chatbot.db"));
    }
}
