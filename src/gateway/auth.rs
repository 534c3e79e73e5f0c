//! Chat authorization.

use super::Gateway;
use buddy_core::message::{ChatKind, IncomingMessage, OutgoingMessage};
use tracing::{error, info, warn};

impl Gateway {
    /// Whether the update comes from a chat the bot serves.
    pub(super) fn is_authorized(&self, msg: &IncomingMessage) -> bool {
        self.telegram.is_allowed_chat(msg.chat.id)
    }

    /// Alert the admin about a foreign chat and leave it unless it is private.
    pub(super) async fn reject_unauthorized(&self, msg: &IncomingMessage) {
        let chat_id = msg.chat.id;
        let alert = OutgoingMessage::plain(
            self.telegram.admin_chat_id,
            format!("Unauthorized access attempt from chat ID: {chat_id}"),
        );
        if let Err(e) = self.channel.send(alert).await {
            error!("failed to alert admin about chat {chat_id}: {e}");
        }

        if msg.chat.kind == ChatKind::Private {
            info!("unauthorized private chat {chat_id}, not leaving");
            return;
        }

        warn!(
            "message from unauthorized chat {chat_id}: {}",
            msg.text_or_caption()
        );
        match self.channel.leave_chat(chat_id).await {
            Ok(()) => info!("left unauthorized chat {chat_id}"),
            Err(e) => error!("failed to leave unauthorized chat {chat_id}: {e}"),
        }
    }
}
