use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming chat message, normalized from the transport.
///
/// Attachment fields mirror what the transport delivers so the media
/// pipeline can classify them without another round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Platform message identifier, unique per chat.
    pub message_id: i64,
    pub chat: Chat,
    /// Author. Absent for channel posts.
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub date: DateTime<Utc>,
    /// Photo variants in ascending resolution.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    pub sticker: Option<Sticker>,
    pub animation: Option<Animation>,
    pub document: Option<Document>,
    /// Shared by every message of a multi-attachment post.
    pub media_group_id: Option<String>,
    /// The message this one replies to.
    pub reply_to: Option<Box<IncomingMessage>>,
}

impl IncomingMessage {
    /// Text, else caption, else the empty string.
    pub fn text_or_caption(&self) -> &str {
        match (self.text.as_deref(), self.caption.as_deref()) {
            (Some(t), _) if !t.is_empty() => t,
            (_, Some(c)) => c,
            _ => "",
        }
    }

    /// Author id, or 0 when the message has no author.
    pub fn author_id(&self) -> i64 {
        self.from.as_ref().map(|u| u.id).unwrap_or(0)
    }

    /// Parse a leading `/command[@bot] args` into `(command, args)`.
    pub fn command(&self) -> Option<(String, String)> {
        let text = self.text.as_deref()?;
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((h, a)) => (h, a.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        Some((name.to_string(), args.to_string()))
    }

    /// Whether this message replies to a message authored by `bot_id`.
    pub fn is_reply_to(&self, bot_id: i64) -> bool {
        self.reply_to
            .as_ref()
            .and_then(|r| r.from.as_ref())
            .is_some_and(|u| u.id == bot_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub kind: ChatKind,
}

/// Chat type as reported by the transport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    #[default]
    Group,
    Supergroup,
    Channel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    #[serde(default)]
    pub is_animated: bool,
    #[serde(default)]
    pub is_video: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    pub file_id: String,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub thumbnail: Option<PhotoSize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

/// Markup mode for an outgoing message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFormat {
    /// Literal text, no parse mode.
    #[default]
    Plain,
    /// Markdown-like model output rendered to the transport's rich markup.
    Rich,
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    /// Message this one answers, if any.
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub format: TextFormat,
}

impl OutgoingMessage {
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to_message_id: None,
            format: TextFormat::Plain,
        }
    }

    pub fn rich_reply(chat_id: i64, text: impl Into<String>, reply_to: i64) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to_message_id: Some(reply_to),
            format: TextFormat::Rich,
        }
    }
}

/// What the transport reports back after a successful send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
    pub chat_id: i64,
    /// The bot's own user id.
    pub from_id: i64,
    pub date: DateTime<Utc>,
}

/// Identity of the bot account itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

impl BotIdentity {
    /// The literal handle token users type to address the bot.
    pub fn handle(&self) -> String {
        format!("@{}", self.username)
    }
}

/// Profile of a chat member, as returned by the directory lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMember {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl ChatMember {
    /// `@handle`, else trimmed "first last", else `User<id>`.
    pub fn display_name(&self) -> String {
        if let Some(ref un) = self.username {
            if !un.is_empty() {
                return format!("@{un}");
            }
        }
        let full = format!(
            "{} {}",
            self.first_name,
            self.last_name.as_deref().unwrap_or_default()
        );
        let full = full.trim();
        if full.is_empty() {
            format!("User{}", self.user_id)
        } else {
            full.to_string()
        }
    }
}

/// Bytes of a downloaded file plus the content type the server reported.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}
