//! Gateway: the update loop connecting the Telegram channel, storage,
//! media pipeline, and the completion provider.
//!
//! A fixed pool of workers drains the channel's bounded queue. Each update
//! is authorized, recorded in the media-group cache, then either stored or
//! answered.

mod auth;
mod commands;
mod compaction;
mod context;
mod outbound;
mod pipeline;
mod routing;


use buddy_core::{
    config::{Config, OpenAiConfig, RoutingConfig, TelegramConfig, WorkerConfig},
    message::{BotIdentity, IncomingMessage},
    traits::{Channel, Provider},
};
use buddy_media::{Materializer, MediaGroupCache};
use buddy_memory::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// The central gateway that routes updates between the channel and the provider.
pub struct Gateway {
    pub(super) provider: Arc<dyn Provider>,
    pub(super) channel: Arc<dyn Channel>,
    pub(super) memory: Store,
    pub(super) media_groups: MediaGroupCache,
    pub(super) materializer: Materializer,
    /// The bot's own account, resolved once at startup.
    pub(super) bot: BotIdentity,
    /// `user_id -> display name`, filled lazily and never evicted.
    pub(super) usernames: RwLock<HashMap<i64, String>>,
    pub(super) telegram: TelegramConfig,
    pub(super) openai: OpenAiConfig,
    pub(super) routing: RoutingConfig,
    pub(super) workers: WorkerConfig,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        provider: Arc<dyn Provider>,
        channel: Arc<dyn Channel>,
        memory: Store,
        materializer: Materializer,
        bot: BotIdentity,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            channel,
            memory,
            media_groups: MediaGroupCache::new(Duration::from_secs(config.media.group_ttl_secs)),
            materializer,
            bot,
            usernames: RwLock::new(HashMap::new()),
            telegram: config.telegram.clone(),
            openai: config.openai.clone(),
            routing: config.routing.clone(),
            workers: config.workers.clone(),
        }
    }

    /// Run the update loop until Ctrl-C or until the channel closes.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Buddy gateway running | provider: {} | channel: {} | bot: {} | workers: {}",
            self.provider.name(),
            self.channel.name(),
            self.bot.handle(),
            self.workers.count,
        );

        let rx = self.channel.start().await.map_err(|e| {
            anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name())
        })?;

        let mut drained = std::pin::pin!(self.clone().process_updates(rx));
        let interrupted = tokio::select! {
            _ = &mut drained => false,
            _ = tokio::signal::ctrl_c() => true,
        };

        if interrupted {
            info!("Received shutdown signal");
            if let Err(e) = self.channel.stop().await {
                warn!("failed to stop channel {}: {e}", self.channel.name());
            }
            // Polling has stopped; let the workers finish what is queued.
            drained.await;
        } else {
            warn!("update stream closed");
        }

        info!("Shutdown complete.");
        Ok(())
    }

    /// Drain `rx` with the configured number of workers.
    ///
    /// Returns once the sender side is closed and every worker is idle.
    pub(super) async fn process_updates(self: Arc<Self>, rx: mpsc::Receiver<IncomingMessage>) {
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = JoinSet::new();

        for id in 0..self.workers.count.max(1) {
            let gw = self.clone();
            let rx = rx.clone();
            workers.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(update) = next else { break };
                    gw.handle_update(update).await;
                }
                debug!("worker {id} stopped");
            });
        }

        while let Some(res) = workers.join_next().await {
            if let Err(e) = res {
                warn!("worker task failed: {e}");
            }
        }
    }
}
