use crate::cache::SessionCache;
use chrono::{DateTime, Utc};
use ground_common::{GroundError, Result};
use ground_llm::traits::{ConversationTurn, GenerationConfig, LlmClient};
use std::sync::Arc;

/// A model bound to one session cache. Every generate call goes through the
/// cache; the handle never outlives its session.
pub struct ModelHandle {
    client: Arc<dyn LlmClient + Send + Sync>,
    cache: SessionCache,
    generation: GenerationConfig,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model", &self.client.model_name())
            .field("cache", &self.cache.handle().name)
            .finish()
    }
}

impl ModelHandle {
    pub fn bind(
        client: Arc<dyn LlmClient + Send + Sync>,
        cache: SessionCache,
        generation: GenerationConfig,
    ) -> Result<Self> {
        if cache.handle().name.trim().is_empty() {
            return Err(GroundError::ModelHandle(
                "cache has no provider handle".to_string(),
            ));
        }
        if cache.model_id().trim().is_empty() {
            return Err(GroundError::ModelHandle("cache has no model id".to_string()));
        }
        Ok(Self {
            client,
            cache,
            generation,
        })
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Generate the reply to `history`. Refuses locally once the cache TTL
    /// has elapsed at `now`.
    pub async fn generate(&self, history: &[ConversationTurn], now: DateTime<Utc>) -> Result<String> {
        if self.cache.is_expired(now) {
            return Err(GroundError::CacheExpiredOrInvalid(format!(
                "context cache {} expired at {}",
                self.cache.handle().name,
                self.cache.expires_at().to_rfc3339()
            )));
        }
        let resp = self
            .client
            .generate(self.cache.handle(), history, &self.generation)
            .await?;
        Ok(resp.text)
    }
}
