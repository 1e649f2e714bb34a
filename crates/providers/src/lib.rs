//! LLM provider implementations for Chatloom.
//!
//! One implementation covers every backend the agent talks to:
//! `OpenAiCompatProvider` works with Groq, OpenAI, and any endpoint that
//! speaks the OpenAI `/v1/chat/completions` protocol.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
