//! The per-update pipeline: authorize, record, then store or answer.

use super::{context::compose_user_text, routing::is_bot_mentioned, Gateway};
use buddy_core::{
    completion::{ChatMessage, ChatRequest, Content},
    message::{IncomingMessage, OutgoingMessage},
};
use buddy_media::has_supported_media;
use buddy_memory::StoredMessage;
use tracing::{debug, error, info, warn};

impl Gateway {
    /// Entry point for one update, called by a worker.
    pub(super) async fn handle_update(&self, msg: IncomingMessage) {
        if !self.is_authorized(&msg) {
            self.reject_unauthorized(&msg).await;
            return;
        }

        if let Some((command, args)) = msg.command() {
            self.handle_command(&msg, &command, &args).await;
            return;
        }

        self.handle_message(msg).await;
    }

    /// Store an ordinary message, or answer it if it addresses the bot.
    async fn handle_message(&self, msg: IncomingMessage) {
        self.media_groups.record(&msg);

        let reply_to_bot = msg.is_reply_to(self.bot.id);
        let text = msg.text_or_caption();

        if text.is_empty() {
            if has_supported_media(&msg) && reply_to_bot {
                self.handle_mention(&msg).await;
            } else {
                debug!("message {} has no text, ignoring", msg.message_id);
            }
            return;
        }

        if reply_to_bot || is_bot_mentioned(text, &self.bot.handle()) {
            self.handle_mention(&msg).await;
        } else {
            self.save_incoming(&msg, text).await;
        }
    }

    /// Answer a message that addresses the bot with exactly one reply.
    async fn handle_mention(&self, msg: &IncomingMessage) {
        let chat_id = msg.chat.id;
        info!("mention in chat {chat_id} (message {})", msg.message_id);
        self.save_incoming(msg, msg.text_or_caption()).await;

        let user_text = compose_user_text(msg, self.bot.id, &self.bot.handle());

        let media_messages = self.media_groups.collect_media_messages(msg);
        let images = if media_messages.is_empty() {
            Vec::new()
        } else {
            match self.materializer.download_as_data_urls(&media_messages).await {
                Ok(urls) => urls,
                Err(e) => {
                    warn!("media processing failed in chat {chat_id}: {e}");
                    self.send_notice(chat_id, None, format!("Error processing image: {e}"))
                        .await;
                    return;
                }
            }
        };

        let reply_text = msg
            .reply_to
            .as_deref()
            .map(IncomingMessage::text_or_caption)
            .unwrap_or_default();
        let web_search = self.should_use_web_search(&user_text, reply_text).await;
        let decision = self.routing_decision(web_search, !media_messages.is_empty());
        info!(
            "routing: web_search={} model={} history={}",
            decision.web_search, decision.model, decision.history_limit
        );

        let system_prompt = match self
            .build_system_prompt(chat_id, decision.history_limit)
            .await
        {
            Ok(p) => p,
            Err(e) => {
                error!("failed to build context for chat {chat_id}: {e}");
                self.send_notice(
                    chat_id,
                    Some(msg.message_id),
                    format!("Error building chat context: {e}"),
                )
                .await;
                return;
            }
        };

        let request = ChatRequest::new(
            decision.model,
            vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(Content::with_images(&user_text, images)),
            ],
        )
        .with_options(decision.options);

        match self.complete_text(&request).await {
            Ok(answer) => {
                self.send_reply(
                    OutgoingMessage::rich_reply(chat_id, answer, msg.message_id),
                    true,
                )
                .await;
            }
            Err(e) => {
                warn!("completion failed in chat {chat_id}: {e}");
                self.send_notice(
                    chat_id,
                    Some(msg.message_id),
                    format!("Error getting chat completion: {e}"),
                )
                .await;
            }
        }
    }

    /// Persist an inbound turn. Empty text is never stored.
    pub(super) async fn save_incoming(&self, msg: &IncomingMessage, text: &str) {
        if text.is_empty() {
            debug!("skip saving empty message {}", msg.message_id);
            return;
        }
        let stored = StoredMessage {
            message_id: msg.message_id,
            chat_id: msg.chat.id,
            user_id: msg.author_id(),
            text: text.to_string(),
            aggregated_text: None,
            date: msg.date,
        };
        if let Err(e) = self.memory.save_message(&stored).await {
            error!("failed to store message {}: {e}", msg.message_id);
        }
    }
}
