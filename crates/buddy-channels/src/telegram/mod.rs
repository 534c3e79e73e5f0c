//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for responses.
//! Docs: <https://core.telegram.org/bots/api>

pub mod format;
mod polling;
mod send;
pub(crate) mod types;


use buddy_core::config::TelegramConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Default timeout for non-polling Bot API calls.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default capacity of the update queue handed to the consumer.
const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    /// `{api_base}/bot{token}`, prefix for every method call.
    base_url: String,
    /// `{api_base}/file/bot{token}`, prefix for file downloads.
    file_base: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    queue_capacity: usize,
    request_timeout: Duration,
    download_timeout: Duration,
    shutdown: watch::Sender<bool>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let api_base = config.api_base.trim_end_matches('/');
        let base_url = format!("{api_base}/bot{}", config.bot_token);
        let file_base = format!("{api_base}/file/bot{}", config.bot_token);
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
            file_base,
            last_update_id: Arc::new(Mutex::new(None)),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown,
        }
    }

    /// Bound the update queue. The poller waits while it is full.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Timeout for member lookups, sends and other short calls.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Timeout for each file download.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}
