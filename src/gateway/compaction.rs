//! History compaction: long bot replies are stored with a short digest so
//! they do not crowd the transcript window.

use super::Gateway;
use buddy_core::{
    completion::{ChatMessage, ChatRequest},
    error::BuddyError,
};
use tracing::debug;

/// Bot replies longer than this many characters get a digest.
pub(super) const AGGREGATE_THRESHOLD: usize = 300;

/// Hard ceiling for a digest, in characters.
const MAX_DIGEST_CHARS: usize = 300;

const SUMMARIZER_PROMPT: &str = "You are a summarizer. Create a concise summary of the \
     assistant's reply in 150-300 characters. Keep key facts, names, and numbers. \
     Return plain text without markdown, lists, or introductions.";

/// Whether a reply is long enough to need a digest.
pub(super) fn needs_digest(text: &str) -> bool {
    text.chars().count() > AGGREGATE_THRESHOLD
}

/// First `max` Unicode scalars of `s`.
pub(super) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

impl Gateway {
    /// Summarize a bot reply into at most 300 characters of plain text.
    pub(super) async fn aggregate_bot_message(&self, text: &str) -> Result<String, BuddyError> {
        let request = ChatRequest::new(
            self.openai.chat_model.as_str(),
            vec![
                ChatMessage::system(SUMMARIZER_PROMPT),
                ChatMessage::user(format!("Summarize this reply:\n{text}")),
            ],
        );

        let response = self.provider.complete(&request).await?;
        let summary = response
            .first_text()
            .ok_or_else(|| BuddyError::Provider("no choices in aggregation response".into()))?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(BuddyError::EmptySummary);
        }

        let digest = truncate_chars(summary, MAX_DIGEST_CHARS);
        debug!(
            "aggregated {} chars into {}",
            text.chars().count(),
            digest.chars().count()
        );
        Ok(digest)
    }
}
