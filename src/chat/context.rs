//! Message context builder for a relay call.
//!
//! Bounds the page content and assembles the ordered turns sent upstream.

use crate::types::*;
use std::borrow::Cow;
use tracing::debug;

/// Appended to page content that was cut to fit the configured limit.
pub const TRUNCATION_MARKER: &str = "...[content truncated]";

/// Keep at most `max_chars` characters of the page, marking the cut.
pub fn truncate_page_content(content: &str, max_chars: usize) -> Cow<'_, str> {
    match content.char_indices().nth(max_chars) {
        None => Cow::Borrowed(content),
        Some((cut, _)) => {
            debug!(
                "Page content truncated to {} chars ({} bytes kept)",
                max_chars, cut
            );
            let mut bounded = String::with_capacity(cut + TRUNCATION_MARKER.len());
            bounded.push_str(&content[..cut]);
            bounded.push_str(TRUNCATION_MARKER);
            Cow::Owned(bounded)
        }
    }
}

/// Build the full message list for an inference call.
///
/// The system turn comes first, then the visitor's history in its original
/// order, then the new message.
pub fn build_messages(
    system_prompt: &str,
    history: &[ChatMessage],
    message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    messages.push(ChatMessage::system(system_prompt));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(message));

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_borrowed_unchanged() {
        let out = truncate_page_content("hello", 10);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "hello");
    }

    #[test]
    fn content_at_limit_is_not_marked() {
        assert_eq!(truncate_page_content("abcde", 5), "abcde");
    }

    #[test]
    fn long_content_keeps_prefix_and_marker() {
        let content = "x".repeat(120);
        let out = truncate_page_content(&content, 100);
        assert_eq!(out, format!("{}{}", "x".repeat(100), TRUNCATION_MARKER));
        assert_eq!(
            out.chars().count(),
            100 + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let content = "éàü".repeat(10);
        let out = truncate_page_content(&content, 4);
        assert_eq!(out, format!("éàüé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn zero_limit_keeps_only_marker() {
        assert_eq!(truncate_page_content("abc", 0), TRUNCATION_MARKER);
        assert_eq!(truncate_page_content("", 0), "");
    }

    #[test]
    fn messages_are_system_history_then_user() {
        let history = vec![
            ChatMessage::user("Qui êtes-vous ?"),
            ChatMessage::assistant("Un cabinet de conseil en data."),
        ];
        let messages = build_messages("rules", &history, "Où sont vos bureaux ?");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::system("rules"));
        assert_eq!(messages[1], history[0]);
        assert_eq!(messages[2], history[1]);
        assert_eq!(messages[3], ChatMessage::user("Où sont vos bureaux ?"));
    }

    #[test]
    fn empty_history_yields_two_turns() {
        let messages = build_messages("rules", &[], "hi");
        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::System, ChatRole::User]);
    }
}
