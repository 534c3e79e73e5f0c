//! Long-polling update loop and Channel trait implementation.

use super::types::{TgChatMember, TgFile, TgResponse, TgUpdate, TgUser};
use super::TelegramChannel;
use async_trait::async_trait;
use buddy_core::{
    error::{BuddyError, MediaError},
    message::{BotIdentity, ChatMember, DownloadedFile, IncomingMessage, OutgoingMessage, SentMessage},
    traits::Channel,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn me(&self) -> Result<BotIdentity, BuddyError> {
        let user: TgUser = self.call_get("getMe", &[]).await?;
        let username = user
            .username
            .ok_or_else(|| BuddyError::Channel("telegram getMe returned no username".into()))?;
        Ok(BotIdentity {
            id: user.id,
            username,
        })
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, BuddyError> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let poll_timeout = self.config.poll_timeout_secs;
        let last_update_id = self.last_update_id.clone();
        let mut shutdown = self.shutdown.subscribe();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout={poll_timeout}");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let request = client
                    .get(&url)
                    .timeout(Duration::from_secs(poll_timeout + 5))
                    .send();

                let resp = tokio::select! {
                    r = request => r,
                    _ = shutdown.changed() => {
                        info!("telegram polling stopped");
                        return;
                    }
                };

                let resp = match resp {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(msg) = update.message else {
                        continue;
                    };
                    debug!(
                        "telegram: update {} message {} in chat {}",
                        update.update_id, msg.message_id, msg.chat.id
                    );

                    // Blocks while the queue is full.
                    if tx.send(IncomingMessage::from(msg)).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<SentMessage, BuddyError> {
        self.send_message(&message).await
    }

    async fn download_file(
        &self,
        file_id: &str,
        max_bytes: usize,
    ) -> Result<DownloadedFile, BuddyError> {
        // Step 1: getFile to obtain file_path.
        let file: TgFile = self
            .call_get("getFile", &[("file_id", file_id.to_string())])
            .await
            .map_err(|e| MediaError::Download(e.to_string()))?;

        if let Some(size) = file.file_size {
            let size = usize::try_from(size).unwrap_or(usize::MAX);
            if size > max_bytes {
                return Err(MediaError::TooLarge {
                    size,
                    limit: max_bytes,
                }
                .into());
            }
        }

        let file_path = file
            .file_path
            .ok_or_else(|| MediaError::Download("telegram getFile returned no file_path".into()))?;

        // Step 2: Download the actual file bytes.
        let download_url = format!("{}/{file_path}", self.file_base);
        let resp = self
            .client
            .get(&download_url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| MediaError::Download(format!("telegram file download failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(MediaError::Download(format!(
                "telegram file download returned {}",
                resp.status()
            ))
            .into());
        }

        if let Some(len) = resp.content_length() {
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            if len > max_bytes {
                return Err(MediaError::TooLarge {
                    size: len,
                    limit: max_bytes,
                }
                .into());
            }
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty() && v != "application/octet-stream");

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| MediaError::Download(format!("telegram file read failed: {e}")))?;

        if bytes.len() > max_bytes {
            return Err(MediaError::TooLarge {
                size: bytes.len(),
                limit: max_bytes,
            }
            .into());
        }

        debug!(
            "telegram: downloaded {file_path} ({} bytes, {:?})",
            bytes.len(),
            content_type
        );

        Ok(DownloadedFile {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn chat_member(&self, chat_id: i64, user_id: i64) -> Result<ChatMember, BuddyError> {
        let member: TgChatMember = self
            .call_get(
                "getChatMember",
                &[
                    ("chat_id", chat_id.to_string()),
                    ("user_id", user_id.to_string()),
                ],
            )
            .await?;
        Ok(ChatMember::from(member))
    }

    async fn leave_chat(&self, chat_id: i64) -> Result<(), BuddyError> {
        let _: bool = self
            .call_get("leaveChat", &[("chat_id", chat_id.to_string())])
            .await?;
        info!("telegram: left chat {chat_id}");
        Ok(())
    }

    async fn stop(&self) -> Result<(), BuddyError> {
        let _ = self.shutdown.send(true);
        info!("Telegram channel stopped");
        Ok(())
    }
}

impl TelegramChannel {
    /// Call a Bot API method with query parameters and unwrap its `result`.
    pub(crate) async fn call_get<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, BuddyError> {
        let url = format!("{}/{method}", self.base_url);
        let resp: TgResponse<T> = self
            .client
            .get(&url)
            .query(params)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| BuddyError::Channel(format!("telegram {method} failed: {e}")))?
            .json()
            .await
            .map_err(|e| BuddyError::Channel(format!("telegram {method} parse failed: {e}")))?;

        if !resp.ok {
            return Err(BuddyError::Channel(format!(
                "telegram {method} error: {}",
                resp.description.unwrap_or_default()
            )));
        }
        resp.result
            .ok_or_else(|| BuddyError::Channel(format!("telegram {method} returned no result")))
    }
}
