use super::*;

fn valid_config() -> Config {
    let mut cfg = Config::default();
    cfg.telegram.bot_token = "123:abc".into();
    cfg.openai.api_key = "sk-test".into();
    cfg.openai.chat_model = "gpt-5".into();
    cfg.web.username = "admin".into();
    cfg.web.password = "hunter2".into();
    cfg
}

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.workers.count, 5);
    assert_eq!(cfg.workers.queue_capacity, 100);
    assert_eq!(cfg.routing.history_limit, 300);
    assert_eq!(cfg.routing.search_history_limit, 10);
    assert_eq!(cfg.media.max_image_bytes, 2 * 1024 * 1024);
    assert_eq!(cfg.media.max_video_bytes, 10 * 1024 * 1024);
    assert_eq!(cfg.media.group_ttl_secs, 3600);
    assert_eq!(cfg.memory.prompt_cache_secs, 15);
    assert_eq!(cfg.web.port, 8080);
    assert!(cfg.routing.trigger_words.contains(&"search".to_string()));
    assert!(cfg.routing.trigger_words.contains(&"загугли".to_string()));
}

#[test]
fn test_partial_toml_fills_defaults() {
    let toml_str = r#"
        [telegram]
        bot_token = "123:abc"
        allowed_chat_id = -1001

        [openai]
        api_key = "sk-test"
        chat_model = "gpt-5"
        routing_model = "gpt-5-nano"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.telegram.allowed_chat_id, -1001);
    assert_eq!(cfg.telegram.api_base, "https://api.telegram.org");
    assert_eq!(cfg.openai.routing_model(), Some("gpt-5-nano"));
    assert_eq!(cfg.openai.web_search_model(), "gpt-5");
    assert_eq!(cfg.openai.gpt_command_model(), "gpt-5");
    assert_eq!(cfg.workers.count, 5);
}

#[test]
fn test_routing_model_empty_disables_tier() {
    let cfg = OpenAiConfig::default();
    assert!(cfg.routing_model().is_none());
}

#[test]
fn test_allowed_chat() {
    let tg = TelegramConfig {
        allowed_chat_id: -1001,
        test_chat_id: -1002,
        ..Default::default()
    };
    assert!(tg.is_allowed_chat(-1001));
    assert!(tg.is_allowed_chat(-1002));
    assert!(!tg.is_allowed_chat(-1003));
}

#[test]
fn test_validate() {
    assert!(valid_config().validate().is_ok());

    let mut cfg = valid_config();
    cfg.telegram.bot_token.clear();
    assert!(cfg.validate().is_err());

    let mut cfg = valid_config();
    cfg.web.password.clear();
    assert!(cfg.validate().is_err());
    cfg.web.enabled = false;
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__buddy_config__.toml").unwrap();
    assert_eq!(cfg.buddy.name, "Buddy");
}

#[test]
fn test_load_invalid_toml_fails() {
    let tmp = std::env::temp_dir().join("__buddy_test_invalid_config__.toml");
    std::fs::write(&tmp, "[telegram\nbot_token = ").unwrap();
    let result = load(tmp.to_str().unwrap());
    assert!(matches!(result, Err(BuddyError::Config(_))));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_shellexpand_leaves_absolute_paths() {
    assert_eq!(shellexpand("/var/lib/buddy.db"), "/var/lib/buddy.db");
}
