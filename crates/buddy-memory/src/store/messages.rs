//! Turn storage and history windows.

use super::Store;
use buddy_core::error::BuddyError;
use chrono::{DateTime, Utc};

/// One persisted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
    /// Short digest of an overlong bot reply, used in place of `text`
    /// when the turn is rendered into a prompt.
    pub aggregated_text: Option<String>,
    pub date: DateTime<Utc>,
}

impl StoredMessage {
    /// The text that represents this turn in a transcript.
    pub fn display_text(&self) -> &str {
        match self.aggregated_text.as_deref() {
            Some(digest) if !digest.is_empty() => digest,
            _ => &self.text,
        }
    }
}

type MessageRow = (i64, i64, i64, String, Option<String>, i64);

impl Store {
    /// Persist a turn. A message id already stored for the chat is ignored.
    pub async fn save_message(&self, message: &StoredMessage) -> Result<(), BuddyError> {
        let aggregated = message
            .aggregated_text
            .as_deref()
            .filter(|s| !s.trim().is_empty());

        sqlx::query(
            "INSERT OR IGNORE INTO messages \
             (message_id, chat_id, user_id, text, aggregated_text, date) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.message_id)
        .bind(message.chat_id)
        .bind(message.user_id)
        .bind(&message.text)
        .bind(aggregated)
        .bind(message.date.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| BuddyError::Memory(format!("insert failed: {e}")))?;

        Ok(())
    }

    /// The newest `limit` turns of a chat, returned in ascending message-id order.
    pub async fn last_messages(
        &self,
        chat_id: i64,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, BuddyError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT message_id, chat_id, user_id, text, aggregated_text, date FROM ( \
                 SELECT message_id, chat_id, user_id, text, aggregated_text, date \
                 FROM messages \
                 WHERE chat_id = ? \
                 ORDER BY date DESC, message_id DESC \
                 LIMIT ? \
             ) ORDER BY message_id ASC",
        )
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BuddyError::Memory(format!("query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(
                |(message_id, chat_id, user_id, text, aggregated_text, date)| StoredMessage {
                    message_id,
                    chat_id,
                    user_id,
                    text,
                    aggregated_text,
                    date: DateTime::from_timestamp(date, 0).unwrap_or_default(),
                },
            )
            .collect())
    }

    /// Number of stored turns in a chat.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn message_count(&self, chat_id: i64) -> Result<i64, BuddyError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BuddyError::Memory(format!("count failed: {e}")))?;
        Ok(count)
    }
}
