//! Outgoing message delivery.

use super::format::render_rich;
use super::types::{unix_to_utc, TgMessage, TgResponse};
use super::TelegramChannel;
use buddy_core::{
    error::BuddyError,
    message::{OutgoingMessage, SentMessage, TextFormat},
};
use serde::Serialize;
use tracing::{debug, warn};

/// Fragment of the Bot API error returned when HTML markup is malformed.
const PARSE_ENTITIES_ERROR: &str = "can't parse entities";

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

#[derive(Serialize)]
struct ReplyParameters {
    message_id: i64,
    allow_sending_without_reply: bool,
}

/// Whether a Bot API error description is a markup rejection.
pub(crate) fn is_markup_rejection(description: &str) -> bool {
    description.to_lowercase().contains(PARSE_ENTITIES_ERROR)
}

impl TelegramChannel {
    /// Send one message, rendering rich text to HTML.
    pub(crate) async fn send_message(
        &self,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, BuddyError> {
        let rendered;
        let (text, parse_mode) = match message.format {
            TextFormat::Rich => {
                rendered = render_rich(&message.text);
                (rendered.as_str(), Some("HTML"))
            }
            TextFormat::Plain => (message.text.as_str(), None),
        };

        let body = SendMessageBody {
            chat_id: message.chat_id,
            text,
            parse_mode,
            reply_parameters: message.reply_to_message_id.map(|id| ReplyParameters {
                message_id: id,
                allow_sending_without_reply: true,
            }),
        };

        let url = format!("{}/sendMessage", self.base_url);
        let resp: TgResponse<TgMessage> = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| BuddyError::Channel(format!("telegram sendMessage failed: {e}")))?
            .json()
            .await
            .map_err(|e| BuddyError::Channel(format!("telegram sendMessage parse failed: {e}")))?;

        if !resp.ok {
            let description = resp.description.unwrap_or_default();
            if parse_mode.is_some() && is_markup_rejection(&description) {
                warn!("telegram rejected HTML markup: {description}");
                return Err(BuddyError::SendRejected(description));
            }
            return Err(BuddyError::Channel(format!(
                "telegram sendMessage error: {description}"
            )));
        }

        let sent = resp
            .result
            .ok_or_else(|| BuddyError::Channel("telegram sendMessage returned no result".into()))?;

        debug!(
            "telegram: sent message {} to chat {}",
            sent.message_id, sent.chat.id
        );

        Ok(SentMessage {
            message_id: sent.message_id,
            chat_id: sent.chat.id,
            from_id: sent.from.map(|u| u.id).unwrap_or_default(),
            date: unix_to_utc(sent.date),
        })
    }
}
