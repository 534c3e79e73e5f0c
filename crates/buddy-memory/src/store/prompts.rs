//! System prompt history.

use super::Store;
use buddy_core::error::BuddyError;
use std::time::Instant;
use tracing::debug;

/// Prompt type served to the conversation pipeline.
const SYSTEM_PROMPT_TYPE: i64 = 1;

impl Store {
    /// The newest system prompt, or `None` if none was ever saved.
    ///
    /// Served from a cache for `prompt_cache_secs` after each load.
    pub async fn system_prompt(&self) -> Result<Option<String>, BuddyError> {
        if let Some((prompt, loaded)) = self.prompt_cache.read().await.as_ref() {
            if loaded.elapsed() < self.prompt_ttl {
                return Ok(Some(prompt.clone()));
            }
        }

        let mut cache = self.prompt_cache.write().await;
        // Another task may have refreshed it while we waited for the lock.
        if let Some((prompt, loaded)) = cache.as_ref() {
            if loaded.elapsed() < self.prompt_ttl {
                return Ok(Some(prompt.clone()));
            }
        }

        let prompt = self.load_system_prompt().await?;
        if let Some(p) = &prompt {
            debug!("system prompt reloaded ({} chars)", p.chars().count());
            *cache = Some((p.clone(), Instant::now()));
        }
        Ok(prompt)
    }

    /// The newest system prompt, bypassing the cache.
    pub async fn load_system_prompt(&self) -> Result<Option<String>, BuddyError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT prompt FROM prompts WHERE type = ? ORDER BY id DESC LIMIT 1")
                .bind(SYSTEM_PROMPT_TYPE)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| BuddyError::Memory(format!("query failed: {e}")))?;
        Ok(row.map(|(prompt,)| prompt))
    }

    /// Save a new system prompt and drop the cached one.
    pub async fn insert_system_prompt(&self, prompt: &str) -> Result<(), BuddyError> {
        sqlx::query("INSERT INTO prompts (type, prompt) VALUES (?, ?)")
            .bind(SYSTEM_PROMPT_TYPE)
            .bind(prompt)
            .execute(&self.pool)
            .await
            .map_err(|e| BuddyError::Memory(format!("insert failed: {e}")))?;

        *self.prompt_cache.write().await = None;
        Ok(())
    }
}
