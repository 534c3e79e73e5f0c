//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Buddy".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

pub fn default_poll_timeout_secs() -> u64 {
    60
}

pub fn default_telegram_request_timeout_secs() -> u64 {
    30
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_request_timeout_secs() -> u64 {
    180
}

pub fn default_trigger_words() -> Vec<String> {
    [
        "загугли",
        "погугли",
        "гугли",
        "найди",
        "поищи",
        "google",
        "search",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_history_limit() -> i64 {
    300
}

pub fn default_search_history_limit() -> i64 {
    10
}

pub fn default_max_image_bytes() -> usize {
    2 * 1024 * 1024
}

pub fn default_max_video_bytes() -> usize {
    10 * 1024 * 1024
}

pub fn default_group_ttl_secs() -> u64 {
    3600
}

pub fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

pub fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

pub fn default_tool_timeout_secs() -> u64 {
    30
}

pub fn default_download_timeout_secs() -> u64 {
    60
}

pub fn default_db_path() -> String {
    "~/.buddy/data/buddy.db".to_string()
}

pub fn default_prompt_cache_secs() -> u64 {
    15
}

pub fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_web_port() -> u16 {
    8080
}

pub fn default_worker_count() -> usize {
    5
}

pub fn default_queue_capacity() -> usize {
    100
}
