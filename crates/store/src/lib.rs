//! Thread persistence backends for Chatloom.
//!
//! Implements the `ThreadStore` trait from chatloom-core:
//! - `SqliteStore`: production backend, one SQLite file, WAL mode
//! - `InMemoryStore`: ephemeral backend for tests

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
