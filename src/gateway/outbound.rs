//! Outbound replies: rich send with a plain retry, error notices, and
//! persistence of what the bot said.

use super::{
    compaction::{needs_digest, AGGREGATE_THRESHOLD},
    Gateway,
};
use buddy_core::{
    error::BuddyError,
    message::{OutgoingMessage, SentMessage, TextFormat},
};
use buddy_memory::StoredMessage;
use tracing::{error, info, warn};

impl Gateway {
    /// Send a message. If the transport rejects the markup, retry exactly
    /// once as plain text with the original wording. On final failure an
    /// error notice goes to the chat.
    ///
    /// When `save` is set, the delivered message is stored under the bot's
    /// id with its original (unformatted) text.
    pub(super) async fn send_reply(
        &self,
        message: OutgoingMessage,
        save: bool,
    ) -> Option<SentMessage> {
        let chat_id = message.chat_id;
        let original = message.text.clone();

        let mut result = self.channel.send(message.clone()).await;
        if let Err(BuddyError::SendRejected(ref reason)) = result {
            warn!("markup rejected ({reason}), retrying without parse mode");
            let plain = OutgoingMessage {
                format: TextFormat::Plain,
                text: original.clone(),
                ..message
            };
            result = self.channel.send(plain).await;
        }

        match result {
            Ok(sent) => {
                if save {
                    self.save_sent(&sent, &original).await;
                }
                Some(sent)
            }
            Err(e) => {
                error!("failed to send message to chat {chat_id}: {e}");
                let notice = OutgoingMessage::plain(chat_id, format!("Error sending message: {e}"));
                if let Err(e) = self.channel.send(notice).await {
                    error!("failed to send error notice to chat {chat_id}: {e}");
                }
                None
            }
        }
    }

    /// Plain, unsaved message, optionally addressed to `reply_to`.
    pub(super) async fn send_notice(&self, chat_id: i64, reply_to: Option<i64>, text: String) {
        let message = OutgoingMessage {
            reply_to_message_id: reply_to,
            ..OutgoingMessage::plain(chat_id, text)
        };
        self.send_reply(message, false).await;
    }

    /// Store a delivered bot message, with a digest when it is long.
    async fn save_sent(&self, sent: &SentMessage, text: &str) {
        if text.is_empty() {
            return;
        }

        let aggregated_text = if needs_digest(text) {
            match self.aggregate_bot_message(text).await {
                Ok(digest) => Some(digest),
                Err(e) => {
                    warn!(
                        "failed to aggregate bot message {} (> {AGGREGATE_THRESHOLD} chars): {e}",
                        sent.message_id
                    );
                    None
                }
            }
        } else {
            None
        };

        let stored = StoredMessage {
            message_id: sent.message_id,
            chat_id: sent.chat_id,
            user_id: sent.from_id,
            text: text.to_string(),
            aggregated_text,
            date: sent.date,
        };
        match self.memory.save_message(&stored).await {
            Ok(()) => info!("stored bot message {} in chat {}", sent.message_id, sent.chat_id),
            Err(e) => error!("failed to store bot message {}: {e}", sent.message_id),
        }
    }
}
