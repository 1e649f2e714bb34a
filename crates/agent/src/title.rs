//! Thread title generation.
//!
//! Asks the model for a 2-4 word summary of the first user message, then
//! sanitizes whatever comes back. Models ramble, emit reasoning tags, and
//! decorate with punctuation; the sanitizer reduces all of that to a short
//! plain-text label.

use chatloom_core::error::ProviderError;
use chatloom_core::message::Message;
use chatloom_core::provider::{Provider, ProviderRequest};
use tracing::debug;

const TITLE_SYSTEM_PROMPT: &str = "You are a title generator. Generate a concise title \
(maximum 4 words) summarizing the user's message. Respond with the title only, no \
punctuation, no quotes, no explanation.\n\
Examples:\n\
'what is 2+2' -> Basic Math\n\
'how to debug my python code' -> Python Debugging\n\
'tell me apple stock price' -> Stock Query\n\
'how to create a chatbot using langgraph' -> LangGraph Chatbot\n\
'how can I lose weight' -> Fitness Tips";

const FALLBACK_TITLE: &str = "Conversation";
const MAX_TITLE_CHARS: usize = 40;

/// Generate a short display title for a thread from its first user message.
///
/// Provider failures propagate; the caller decides whether a missing title
/// matters (typically it keeps the generated thread id instead).
pub async fn generate_title(
    provider: &dyn Provider,
    model: &str,
    user_message: &str,
) -> Result<String, ProviderError> {
    let request = ProviderRequest::new(
        model,
        vec![
            Message::system(TITLE_SYSTEM_PROMPT),
            Message::user(user_message),
        ],
    );

    let response = provider.complete(request).await?;
    let title = sanitize_title(&response.message.content);
    debug!(raw = %response.message.content, %title, "Generated thread title");
    Ok(title)
}

/// Reduce raw model output to a clean title.
///
/// Takes the first line, strips reasoning tags, keeps only alphanumerics
/// and spaces, collapses whitespace, caps at 4 words and 40 characters.
/// An empty result becomes "Conversation".
pub fn sanitize_title(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or("");
    let without_tags = first_line.replace("<think>", "").replace("</think>", "");

    let cleaned: String = without_tags
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let words: Vec<&str> = cleaned.split_whitespace().take(4).collect();
    if words.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    let title = words.join(" ");
    title.chars().take(MAX_TITLE_CHARS).collect()
}
