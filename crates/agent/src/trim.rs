//! Character-budget history trimming.

use chatloom_core::message::Message;

/// Return the longest contiguous suffix of `messages` whose total content
/// length fits within `max_chars`.
///
/// Walks newest to oldest, taking whole messages only. The newest message
/// is always kept, even when it alone exceeds the budget: sending the
/// model nothing would be worse than sending it one oversized message.
pub fn trim_history(messages: &[Message], max_chars: usize) -> Vec<Message> {
    let mut total = 0usize;
    let mut start = messages.len();

    for (i, message) in messages.iter().enumerate().rev() {
        let len = message.content.chars().count();
        if total + len > max_chars && start < messages.len() {
            break;
        }
        total += len;
        start = i;
        if total > max_chars {
            // Only possible for the single newest message
            break;
        }
    }

    messages[start..].to_vec()
}
