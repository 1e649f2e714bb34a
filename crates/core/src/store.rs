//! The ThreadStore trait.
//!
//! A thread store persists conversation messages keyed by thread id, in
//! append order. The graph appends each message right after it is produced
//! so a crash mid-turn loses at most the message being generated.

use crate::error::StoreError;
use crate::message::{Message, ThreadId};
use async_trait::async_trait;

/// Durable storage for conversation threads.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Append one message to a thread. Creates the thread implicitly if it
    /// does not exist yet.
    async fn append(
        &self,
        thread_id: &ThreadId,
        message: &Message,
    ) -> std::result::Result<(), StoreError>;

    /// Load the full message history of a thread, oldest first. An unknown
    /// thread id yields an empty list, not an error.
    async fn load(&self, thread_id: &ThreadId) -> std::result::Result<Vec<Message>, StoreError>;

    /// List the ids of all threads that have at least one message.
    ///
    /// Fail-open: a storage failure here yields an empty list so that a
    /// sidebar or thread picker can always render.
    async fn list_threads(&self) -> Vec<ThreadId>;

    /// Delete all messages in all threads.
    async fn clear(&self) -> std::result::Result<(), StoreError>;
}
