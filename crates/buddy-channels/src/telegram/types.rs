//! Telegram Bot API deserialization types.

use buddy_core::message::{
    Animation, Chat, ChatKind, ChatMember, Document, IncomingMessage, PhotoSize, Sticker, User,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    #[serde(default)]
    pub date: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<TgPhotoSize>>,
    pub sticker: Option<TgSticker>,
    pub animation: Option<TgAnimation>,
    pub document: Option<TgDocument>,
    pub media_group_id: Option<String>,
    pub reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgFile {
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgPhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    pub file_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgSticker {
    pub file_id: String,
    #[serde(default)]
    pub is_animated: bool,
    #[serde(default)]
    pub is_video: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgAnimation {
    pub file_id: String,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub thumbnail: Option<TgPhotoSize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgDocument {
    pub file_id: String,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChat {
    pub id: i64,
    /// Chat type: "private", "group", "supergroup", or "channel".
    #[serde(default, rename = "type")]
    pub chat_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChatMember {
    pub user: TgUser,
}

fn chat_kind(chat_type: &str) -> ChatKind {
    match chat_type {
        "private" => ChatKind::Private,
        "supergroup" => ChatKind::Supergroup,
        "channel" => ChatKind::Channel,
        _ => ChatKind::Group,
    }
}

pub(crate) fn unix_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

impl From<TgPhotoSize> for PhotoSize {
    fn from(p: TgPhotoSize) -> Self {
        Self {
            file_id: p.file_id,
            width: p.width,
            height: p.height,
            file_size: p.file_size,
        }
    }
}

impl From<TgUser> for User {
    fn from(u: TgUser) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            username: u.username,
            is_bot: u.is_bot,
        }
    }
}

impl From<TgChatMember> for ChatMember {
    fn from(m: TgChatMember) -> Self {
        Self {
            user_id: m.user.id,
            username: m.user.username,
            first_name: m.user.first_name,
            last_name: m.user.last_name,
        }
    }
}

impl From<TgMessage> for IncomingMessage {
    fn from(msg: TgMessage) -> Self {
        Self {
            message_id: msg.message_id,
            chat: Chat {
                id: msg.chat.id,
                kind: chat_kind(&msg.chat.chat_type),
            },
            from: msg.from.map(User::from),
            text: msg.text,
            caption: msg.caption,
            date: unix_to_utc(msg.date),
            photo: msg
                .photo
                .unwrap_or_default()
                .into_iter()
                .map(PhotoSize::from)
                .collect(),
            sticker: msg.sticker.map(|s| Sticker {
                file_id: s.file_id,
                is_animated: s.is_animated,
                is_video: s.is_video,
            }),
            animation: msg.animation.map(|a| Animation {
                file_id: a.file_id,
                mime_type: a.mime_type,
                file_name: a.file_name,
                thumbnail: a.thumbnail.map(PhotoSize::from),
            }),
            document: msg.document.map(|d| Document {
                file_id: d.file_id,
                mime_type: d.mime_type,
                file_name: d.file_name,
            }),
            media_group_id: msg.media_group_id,
            reply_to: msg
                .reply_to_message
                .map(|r| Box::new(IncomingMessage::from(*r))),
        }
    }
}
