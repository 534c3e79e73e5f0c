use crate::{
    completion::{ChatRequest, ChatResponse},
    error::BuddyError,
    message::{
        BotIdentity, ChatMember, DownloadedFile, IncomingMessage, OutgoingMessage, SentMessage,
    },
};
use async_trait::async_trait;

/// Chat-completion backend.
///
/// Stateless request/response: every call carries its full message list.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Run one completion call.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, BuddyError>;

    /// Check if the provider is reachable and configured.
    async fn is_available(&self) -> bool;
}

/// Messaging transport.
///
/// Receives updates, sends replies, and exposes the file and member
/// lookups the pipeline needs.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// The bot's own account.
    async fn me(&self) -> Result<BotIdentity, BuddyError>;

    /// Start receiving updates.
    ///
    /// The returned receiver is bounded; a slow consumer blocks the
    /// producer instead of dropping updates.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, BuddyError>;

    /// Send a message.
    ///
    /// Returns [`BuddyError::SendRejected`] when the transport cannot parse
    /// the rich markup, so the caller can retry in plain mode.
    async fn send(&self, message: OutgoingMessage) -> Result<SentMessage, BuddyError>;

    /// Download a stored file, refusing anything larger than `max_bytes`.
    async fn download_file(
        &self,
        file_id: &str,
        max_bytes: usize,
    ) -> Result<DownloadedFile, BuddyError>;

    /// Look up a chat member's profile.
    async fn chat_member(&self, chat_id: i64, user_id: i64) -> Result<ChatMember, BuddyError>;

    /// Remove the bot from a chat.
    async fn leave_chat(&self, chat_id: i64) -> Result<(), BuddyError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), BuddyError>;
}
