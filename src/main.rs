mod gateway;
mod web;

use buddy_channels::telegram::TelegramChannel;
use buddy_core::{
    completion::{ChatMessage, ChatRequest},
    config::{self, BuddyConfig},
    traits::{Channel, Provider},
};
use buddy_media::{FfmpegExtractor, Materializer, MediaLimits};
use buddy_memory::Store;
use buddy_providers::openai::OpenAiProvider;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "buddy",
    version,
    about = "Buddy: a Telegram group-chat companion backed by a chat-completion API"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Print the configuration summary and check the completion API.
    Status,
    /// Send a one-shot prompt to the chat model.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg.buddy);

    match cli.command {
        Commands::Start => {
            cfg.validate()?;

            let provider = build_provider(&cfg);
            if !provider.is_available().await {
                anyhow::bail!(
                    "completion API at {} is not reachable with the configured key",
                    cfg.openai.base_url
                );
            }

            let channel = Arc::new(
                TelegramChannel::new(cfg.telegram.clone())
                    .with_queue_capacity(cfg.workers.queue_capacity)
                    .with_request_timeout(Duration::from_secs(cfg.telegram.request_timeout_secs))
                    .with_download_timeout(Duration::from_secs(cfg.media.download_timeout_secs)),
            );
            let bot = channel.me().await?;
            info!("Authorized on account {}", bot.handle());

            let memory = Store::new(&cfg.memory).await?;

            let extractor = Arc::new(FfmpegExtractor::new(
                cfg.media.ffmpeg_path.clone(),
                cfg.media.ffprobe_path.clone(),
                Duration::from_secs(cfg.media.tool_timeout_secs),
            ));
            let materializer =
                Materializer::new(channel.clone(), extractor, MediaLimits::from(&cfg.media));

            if cfg.web.enabled {
                let listener = web::bind(&cfg.web).await.with_context(|| {
                    format!(
                        "prompt editor failed to bind to {}:{}",
                        cfg.web.host, cfg.web.port
                    )
                })?;
                tokio::spawn(web::serve(listener, cfg.web.clone(), memory.clone()));
            }

            println!("Buddy: starting...");
            let gw = Arc::new(gateway::Gateway::new(
                provider,
                channel,
                memory,
                materializer,
                bot,
                &cfg,
            ));
            gw.run().await?;
        }
        Commands::Status => {
            println!("Buddy: status check\n");
            println!("Config: {}", cli.config);
            println!("Chat model: {}", display_or_unset(&cfg.openai.chat_model));
            println!("/gpt model: {}", display_or_unset(cfg.openai.gpt_command_model()));
            println!(
                "Web search model: {}",
                display_or_unset(cfg.openai.web_search_model())
            );
            println!(
                "Routing model: {}",
                cfg.openai.routing_model().unwrap_or("(lexical triggers only)")
            );
            println!("Allowed chat: {}", cfg.telegram.allowed_chat_id);
            println!(
                "Workers: {} (queue {})",
                cfg.workers.count, cfg.workers.queue_capacity
            );
            println!(
                "Prompt editor: {}",
                if cfg.web.enabled {
                    format!("http://{}:{}/", cfg.web.host, cfg.web.port)
                } else {
                    "disabled".to_string()
                }
            );
            println!();

            match cfg.validate() {
                Ok(()) => println!("  config: valid"),
                Err(e) => println!("  config: {e}"),
            }
            println!(
                "  telegram: {}",
                if cfg.telegram.bot_token.is_empty() {
                    "missing bot_token"
                } else {
                    "configured"
                }
            );
            let provider = build_provider(&cfg);
            println!(
                "  {}: {}",
                provider.name(),
                if provider.is_available().await {
                    "available"
                } else {
                    "unreachable"
                }
            );
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: buddy ask <message>");
            }
            if cfg.openai.chat_model.is_empty() {
                anyhow::bail!("openai.chat_model is empty");
            }

            let provider = build_provider(&cfg);
            let request = ChatRequest::new(
                cfg.openai.chat_model.as_str(),
                vec![ChatMessage::user(message.join(" "))],
            );
            let response = provider.complete(&request).await?;
            match response.first_text() {
                Some(text) => println!("{text}"),
                None => anyhow::bail!("no choices in response"),
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber: stdout, plus a daily-rolling file when
/// `log_dir` is set. `RUST_LOG` overrides the configured level.
///
/// The returned guard must live until exit so buffered lines are flushed.
fn init_logging(cfg: &BuddyConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    if cfg.log_dir.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(config::shellexpand(&cfg.log_dir), "buddy.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Some(guard)
}

/// Build the completion provider.
fn build_provider(cfg: &config::Config) -> Arc<dyn Provider> {
    Arc::new(OpenAiProvider::from_config(
        cfg.openai.base_url.clone(),
        cfg.openai.api_key.clone(),
        cfg.openai.timeout(),
    ))
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
