//! Conversation orchestration for Chatloom.
//!
//! The heart of the system is a two-state graph: Model-Turn asks the LLM
//! what to do with the (trimmed) history, Tool-Turn executes at most one
//! requested tool call and hands the result back. Every appended message
//! is persisted immediately, so a crash loses at most the message being
//! produced.

pub mod graph;
pub mod title;
pub mod trim;

pub use graph::ConversationGraph;
pub use title::generate_title;
pub use trim::trim_history;
