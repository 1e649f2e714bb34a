//! In-memory thread store. Nothing survives a restart; used by tests
//! across the workspace wherever a real database would only add noise.

use async_trait::async_trait;
use chatloom_core::error::StoreError;
use chatloom_core::message::{Message, ThreadId};
use chatloom_core::store::ThreadStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// An ephemeral thread store backed by a HashMap.
#[derive(Default)]
pub struct InMemoryStore {
    // Insertion order of threads is tracked separately so list_threads can
    // report most recently appended first.
    threads: RwLock<ThreadsState>,
}

#[derive(Default)]
struct ThreadsState {
    messages: HashMap<String, Vec<Message>>,
    recency: Vec<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStore for InMemoryStore {
    async fn append(&self, thread_id: &ThreadId, message: &Message) -> Result<(), StoreError> {
        let mut state = self.threads.write().await;
        state
            .messages
            .entry(thread_id.0.clone())
            .or_default()
            .push(message.clone());
        state.recency.retain(|t| t != &thread_id.0);
        state.recency.push(thread_id.0.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Vec<Message>, StoreError> {
        let state = self.threads.read().await;
        Ok(state.messages.get(&thread_id.0).cloned().unwrap_or_default())
    }

    async fn list_threads(&self) -> Vec<ThreadId> {
        let state = self.threads.read().await;
        state
            .recency
            .iter()
            .rev()
            .map(|t| ThreadId(t.clone()))
            .collect()
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.threads.write().await;
        state.messages.clear();
        state.recency.clear();
        Ok(())
    }
}
