//! SQLite thread store.
//!
//! One table, `messages`, holds every message of every thread. The
//! `iid` autoincrement column is the append-order key; loading a thread
//! orders by it so history always replays in insertion order.

use async_trait::async_trait;
use chatloom_core::error::StoreError;
use chatloom_core::message::{Message, Role, ThreadId, ToolCallRequest};
use chatloom_core::store::ThreadStore;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// A production SQLite thread store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and schema are created automatically. Pass
    /// `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite thread store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        // iid is the append-order key; id is the message's own uuid
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id    TEXT NOT NULL,
                id           TEXT UNIQUE NOT NULL,
                role         TEXT NOT NULL,
                content      TEXT NOT NULL,
                tool_calls   TEXT NOT NULL DEFAULT '[]',
                tool_call_id TEXT,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_thread_id ON messages(thread_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("thread_id index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StoreError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        let tool_calls_json: String = row
            .try_get("tool_calls")
            .map_err(|e| StoreError::QueryFailed(format!("tool_calls column: {e}")))?;
        let tool_call_id: Option<String> = row
            .try_get("tool_call_id")
            .map_err(|e| StoreError::QueryFailed(format!("tool_call_id column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        let role = match role_str.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "tool" => Role::Tool,
            other => {
                return Err(StoreError::QueryFailed(format!("unknown role '{other}'")));
            }
        };

        let tool_calls: Vec<ToolCallRequest> =
            serde_json::from_str(&tool_calls_json).unwrap_or_default();

        let timestamp = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Message {
            id,
            role,
            content,
            tool_calls,
            tool_call_id,
            timestamp,
        })
    }
}

#[async_trait]
impl ThreadStore for SqliteStore {
    async fn append(&self, thread_id: &ThreadId, message: &Message) -> Result<(), StoreError> {
        let tool_calls_json = serde_json::to_string(&message.tool_calls)
            .map_err(|e| StoreError::Storage(format!("tool_calls serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO messages (thread_id, id, role, content, tool_calls, tool_call_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&thread_id.0)
        .bind(&message.id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&tool_calls_json)
        .bind(&message.tool_call_id)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        debug!(thread = %thread_id, message = %message.id, "Persisted message");
        Ok(())
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, role, content, tool_calls, tool_call_id, created_at
             FROM messages WHERE thread_id = ?1 ORDER BY iid",
        )
        .bind(&thread_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("thread load: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn list_threads(&self) -> Vec<ThreadId> {
        // Fail-open: the thread picker must always render, even when the
        // database is unreadable.
        let result = sqlx::query(
            "SELECT thread_id, MAX(iid) AS latest FROM messages
             GROUP BY thread_id ORDER BY latest DESC",
        )
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| {
                    row.try_get::<String, _>("thread_id")
                        .ok()
                        .map(|s| ThreadId(s))
                })
                .collect(),
            Err(e) => {
                warn!("Failed to list threads: {e}");
                Vec::new()
            }
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM messages")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("CLEAR failed: {e}")))?;

        Ok(())
    }
}
