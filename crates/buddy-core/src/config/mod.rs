mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::BuddyError;
use defaults::*;

/// Top-level Buddy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub buddy: BuddyConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuddyConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily-rolling log files. Empty = stdout only.
    #[serde(default)]
    pub log_dir: String,
}

impl Default for BuddyConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// The group chat the bot serves.
    #[serde(default)]
    pub allowed_chat_id: i64,
    /// A second chat accepted for testing.
    #[serde(default)]
    pub test_chat_id: i64,
    /// Where unauthorized-access alerts go.
    #[serde(default)]
    pub admin_chat_id: i64,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Timeout for sends, member lookups and other short Bot API calls.
    #[serde(default = "default_telegram_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_chat_id: 0,
            test_chat_id: 0,
            admin_chat_id: 0,
            api_base: default_telegram_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            request_timeout_secs: default_telegram_request_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    /// Whether updates from `chat_id` may be processed.
    pub fn is_allowed_chat(&self, chat_id: i64) -> bool {
        chat_id == self.allowed_chat_id || chat_id == self.test_chat_id
    }
}

/// OpenAI-compatible completion API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Conversational model, also used for summaries.
    #[serde(default)]
    pub chat_model: String,
    /// Model for the `/gpt` command. Empty = `chat_model`.
    #[serde(default)]
    pub gpt_command_model: String,
    /// Search-capable model for turns that need live web results.
    /// Empty = `chat_model`.
    #[serde(default)]
    pub web_search_model: String,
    /// Cheap classifier deciding whether a turn needs search.
    /// Empty disables the model tier of routing.
    #[serde(default)]
    pub routing_model: String,
    /// Per-call timeout for completion requests.
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            chat_model: String::new(),
            gpt_command_model: String::new(),
            web_search_model: String::new(),
            routing_model: String::new(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl OpenAiConfig {
    pub fn gpt_command_model(&self) -> &str {
        non_empty_or(&self.gpt_command_model, &self.chat_model)
    }

    pub fn web_search_model(&self) -> &str {
        non_empty_or(&self.web_search_model, &self.chat_model)
    }

    pub fn routing_model(&self) -> Option<&str> {
        (!self.routing_model.is_empty()).then_some(self.routing_model.as_str())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Web-search routing config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Lexical triggers, matched case-insensitively as substrings.
    #[serde(default = "default_trigger_words")]
    pub trigger_words: Vec<String>,
    /// Stored turns injected into the prompt for ordinary replies.
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
    /// Stored turns injected when the turn uses web search.
    #[serde(default = "default_search_history_limit")]
    pub search_history_limit: i64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            trigger_words: default_trigger_words(),
            history_limit: default_history_limit(),
            search_history_limit: default_search_history_limit(),
        }
    }
}

/// Attachment handling config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Ceiling for photos, stickers, and image documents.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Ceiling for animations and videos.
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: usize,
    /// How long an idle media group stays in the cache.
    #[serde(default = "default_group_ttl_secs")]
    pub group_ttl_secs: u64,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Timeout for each ffprobe/ffmpeg invocation.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// Timeout for each file download.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            max_video_bytes: default_max_video_bytes(),
            group_ttl_secs: default_group_ttl_secs(),
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            tool_timeout_secs: default_tool_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

/// Storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// How long a loaded system prompt is served from cache.
    #[serde(default = "default_prompt_cache_secs")]
    pub prompt_cache_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            prompt_cache_secs: default_prompt_cache_secs(),
        }
    }
}

/// Prompt editor web form config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_web_host(),
            port: default_web_port(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Update-processing worker pool config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_count")]
    pub count: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Config {
    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<(), BuddyError> {
        if self.telegram.bot_token.is_empty() {
            return Err(BuddyError::Config("telegram.bot_token is empty".into()));
        }
        if self.openai.api_key.is_empty() {
            return Err(BuddyError::Config("openai.api_key is empty".into()));
        }
        if self.openai.chat_model.is_empty() {
            return Err(BuddyError::Config("openai.chat_model is empty".into()));
        }
        if self.web.enabled && (self.web.username.is_empty() || self.web.password.is_empty()) {
            return Err(BuddyError::Config(
                "web.username and web.password are required when the web form is enabled".into(),
            ));
        }
        if self.workers.count == 0 || self.workers.queue_capacity == 0 {
            return Err(BuddyError::Config(
                "workers.count and workers.queue_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, BuddyError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BuddyError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| BuddyError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
