//! SQLite-backed store.
//!
//! Split into focused submodules:
//! - `messages`: turn storage and history windows
//! - `prompts`: system prompt history with a short-lived read cache

mod messages;
mod prompts;

pub use messages::StoredMessage;

use buddy_core::{
    config::{shellexpand, MemoryConfig},
    error::BuddyError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::info;

/// Cached system prompt and the instant it was loaded.
type PromptCache = Arc<RwLock<Option<(String, Instant)>>>;

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    prompt_cache: PromptCache,
    prompt_ttl: Duration,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &MemoryConfig) -> Result<Self, BuddyError> {
        let db_path = shellexpand(&config.db_path);

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BuddyError::Memory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| BuddyError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| BuddyError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self::with_pool(
            pool,
            Duration::from_secs(config.prompt_cache_secs),
        ))
    }

    fn with_pool(pool: SqlitePool, prompt_ttl: Duration) -> Self {
        Self {
            pool,
            prompt_cache: Arc::new(RwLock::new(None)),
            prompt_ttl,
        }
    }

    /// Get a reference to the underlying connection pool.
    #[cfg(any(test, feature = "test-support"))]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), BuddyError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| BuddyError::Memory(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            (
                "001_messages",
                include_str!("../../migrations/001_messages.sql"),
            ),
            (
                "002_prompts",
                include_str!("../../migrations/002_prompts.sql"),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        BuddyError::Memory(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| BuddyError::Memory(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    BuddyError::Memory(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }

    /// In-memory store for tests in this and dependent crates.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn in_memory(prompt_ttl: Duration) -> Result<Self, BuddyError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| BuddyError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| BuddyError::Memory(format!("failed to connect to sqlite: {e}")))?;
        Self::run_migrations(&pool).await?;
        Ok(Self::with_pool(pool, prompt_ttl))
    }
}
