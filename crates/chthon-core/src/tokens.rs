//! Token estimation and conversation truncation.
//!
//! Estimates are deliberately coarse: four characters per token, plus a
//! fixed per-message and per-conversation overhead.

use crate::message::{ConversationMessage, Role};

/// Overhead charged for every message's role marker.
pub const ROLE_OVERHEAD_TOKENS: usize = 3;

/// Overhead charged once per conversation.
pub const CONVERSATION_OVERHEAD_TOKENS: usize = 10;

/// Default context budget used when the caller has no better figure.
pub const DEFAULT_CONTEXT_TOKENS: usize = 4000;

pub fn estimate_token_count(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

pub fn estimate_conversation_tokens<'a, I>(messages: I) -> usize
where
    I: IntoIterator<Item = &'a ConversationMessage>,
{
    messages
        .into_iter()
        .map(|m| ROLE_OVERHEAD_TOKENS + estimate_token_count(&m.content))
        .sum::<usize>()
        + CONVERSATION_OVERHEAD_TOKENS
}

/// Drop old messages until the conversation fits `max_tokens`.
///
/// With `preserve_system` every system message is kept and moved to the
/// front. The remaining messages are trimmed from the second-oldest
/// onwards (the opening message is kept for context), then from the oldest,
/// but the most recent message always survives. If the pinned messages plus
/// the last message fit, the result fits.
pub fn truncate_conversation(
    messages: &[ConversationMessage],
    max_tokens: usize,
    preserve_system: bool,
) -> Vec<ConversationMessage> {
    if estimate_conversation_tokens(messages) <= max_tokens {
        return messages.to_vec();
    }

    let (pinned, mut rest): (Vec<_>, Vec<_>) = if preserve_system {
        messages.iter().cloned().partition(|m| m.role == Role::System)
    } else {
        (Vec::new(), messages.to_vec())
    };

    let pinned_tokens = pinned
        .iter()
        .map(|m| ROLE_OVERHEAD_TOKENS + estimate_token_count(&m.content))
        .sum::<usize>();
    let mut rest_tokens = rest
        .iter()
        .map(|m| ROLE_OVERHEAD_TOKENS + estimate_token_count(&m.content))
        .sum::<usize>();
    let over = |rest_tokens: usize| pinned_tokens + rest_tokens + CONVERSATION_OVERHEAD_TOKENS > max_tokens;

    while over(rest_tokens) && rest.len() > 2 {
        let dropped = rest.remove(1);
        rest_tokens -= ROLE_OVERHEAD_TOKENS + estimate_token_count(&dropped.content);
    }
    while over(rest_tokens) && rest.len() > 1 {
        let dropped = rest.remove(0);
        rest_tokens -= ROLE_OVERHEAD_TOKENS + estimate_token_count(&dropped.content);
    }

    let mut out = pinned;
    out.extend(rest);
    out
}
