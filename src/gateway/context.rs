//! Prompt context: the user turn, the chat transcript, and the system prompt.

use super::{routing::is_bot_mentioned, Gateway};
use buddy_core::{error::BuddyError, message::IncomingMessage};
use buddy_memory::StoredMessage;
use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, warn};

/// Placeholder in the stored prompt replaced by the current time.
const DATE_PLACEHOLDER: &str = "%current_date%";

/// The user turn as the model sees it, with reply context prepended.
pub(super) fn compose_user_text(msg: &IncomingMessage, bot_id: i64, handle: &str) -> String {
    let text = msg.text_or_caption();
    let Some(reply) = msg.reply_to.as_deref() else {
        return text.to_string();
    };

    if msg.is_reply_to(bot_id) {
        if text.is_empty() {
            format!("this is reply to your msg{}:", reply.message_id)
        } else {
            format!("this is reply to your msg{}:\n {text}", reply.message_id)
        }
    } else if is_bot_mentioned(text, handle) {
        format!(
            "You were mentioned to reply to the message msg{} by this message:{text}",
            reply.message_id
        )
    } else {
        text.to_string()
    }
}

/// One transcript line: `msg<id> <dd.mm.yyyy hh:mm:ss> <name> : <text>`.
pub(super) fn format_history_line<Tz: TimeZone>(
    msg: &StoredMessage,
    name: &str,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "msg{} {} {} : {}\n",
        msg.message_id,
        msg.date.with_timezone(tz).format("%d.%m.%Y %H:%M:%S"),
        name,
        msg.display_text()
    )
}

/// Fill the date placeholder (first occurrence only) and append the transcript.
pub(super) fn render_system_prompt<Tz: TimeZone>(
    template: &str,
    now: DateTime<Tz>,
    history: &str,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let date = now.format("%d-%b-%Y %H:%M:%S").to_string().to_uppercase();
    let mut prompt = template.replacen(DATE_PLACEHOLDER, &date, 1);
    if !history.is_empty() {
        prompt.push_str("\n\n**Chat history:**\n");
        prompt.push_str(history);
    }
    prompt
}

impl Gateway {
    /// Display name of a chat member, cached for the life of the process.
    ///
    /// A failed lookup caches `User<id>` so it is not retried.
    pub(super) async fn display_name(&self, chat_id: i64, user_id: i64) -> String {
        if let Some(name) = self.usernames.read().await.get(&user_id) {
            return name.clone();
        }

        let name = match self.channel.chat_member(chat_id, user_id).await {
            Ok(member) => member.display_name(),
            Err(e) => {
                warn!("chat member lookup failed for user {user_id}: {e}");
                format!("User{user_id}")
            }
        };

        self.usernames
            .write()
            .await
            .entry(user_id)
            .or_insert(name)
            .clone()
    }

    /// The last `limit` stored turns of a chat as transcript lines.
    pub(super) async fn formatted_history(
        &self,
        chat_id: i64,
        limit: i64,
    ) -> Result<String, BuddyError> {
        let messages = self.memory.last_messages(chat_id, limit).await?;
        let mut out = String::new();
        for msg in &messages {
            let name = self.display_name(chat_id, msg.user_id).await;
            out.push_str(&format_history_line(msg, &name, &Local));
        }
        debug!("history for chat {chat_id}: {} turn(s)", messages.len());
        Ok(out)
    }

    /// The stored system prompt with the date filled in and the transcript
    /// appended. A missing or unreadable prompt yields an empty template.
    pub(super) async fn build_system_prompt(
        &self,
        chat_id: i64,
        limit: i64,
    ) -> Result<String, BuddyError> {
        let history = self.formatted_history(chat_id, limit).await?;
        let template = match self.memory.system_prompt().await {
            Ok(Some(p)) => p,
            Ok(None) => {
                warn!("no system prompt stored, using an empty template");
                String::new()
            }
            Err(e) => {
                warn!("failed to load system prompt, using an empty template: {e}");
                String::new()
            }
        };
        Ok(render_system_prompt(&template, Local::now(), &history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buddy_core::message::{Chat, ChatKind, User};
    use chrono::{TimeZone, Utc};

    fn user(id: i64) -> User {
        User {
            id,
            first_name: "Ann".into(),
            last_name: None,
            username: None,
            is_bot: false,
        }
    }

    fn msg(id: i64, text: &str, from: i64) -> IncomingMessage {
        IncomingMessage {
            message_id: id,
            chat: Chat {
                id: -100,
                kind: ChatKind::Supergroup,
            },
            from: Some(user(from)),
            text: Some(text.into()),
            caption: None,
            date: Utc::now(),
            photo: Vec::new(),
            sticker: None,
            animation: None,
            document: None,
            media_group_id: None,
            reply_to: None,
        }
    }

    const BOT: i64 = 999;
    const HANDLE: &str = "@buddy_bot";

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(compose_user_text(&msg(1, "hi @buddy_bot", 7), BOT, HANDLE), "hi @buddy_bot");
    }

    #[test]
    fn test_reply_to_bot_prefix() {
        let mut m = msg(2, "and then?", 7);
        m.reply_to = Some(Box::new(msg(41, "earlier answer", BOT)));
        assert_eq!(
            compose_user_text(&m, BOT, HANDLE),
            "this is reply to your msg41:\n and then?"
        );

        m.text = None;
        assert_eq!(compose_user_text(&m, BOT, HANDLE), "this is reply to your msg41:");
    }

    #[test]
    fn test_mention_in_reply_to_someone_else() {
        let mut m = msg(3, "@buddy_bot what do you think", 7);
        m.reply_to = Some(Box::new(msg(12, "hot take", 8)));
        assert_eq!(
            compose_user_text(&m, BOT, HANDLE),
            "You were mentioned to reply to the message msg12 by this message:@buddy_bot what do you think"
        );
    }

    #[test]
    fn test_history_line_prefers_digest() {
        let stored = StoredMessage {
            message_id: 5,
            chat_id: -100,
            user_id: 7,
            text: "a very long reply".into(),
            aggregated_text: Some("short".into()),
            date: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        };
        assert_eq!(
            format_history_line(&stored, "@ann", &Utc),
            "msg5 09.03.2024 14:05:07 @ann : short\n"
        );
    }

    #[test]
    fn test_system_prompt_date_and_history() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let prompt = render_system_prompt(
            "Today is %current_date%. Also %current_date%.",
            now,
            "msg1 line\n",
        );
        assert_eq!(
            prompt,
            "Today is 09-MAR-2024 14:05:07. Also %current_date%.\n\n**Chat history:**\nmsg1 line\n"
        );
    }

    #[test]
    fn test_system_prompt_without_history() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(render_system_prompt("Be nice.", now, ""), "Be nice.");
        assert_eq!(render_system_prompt("", now, ""), "");
    }
}
