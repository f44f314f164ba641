use chrono::{DateTime, TimeDelta, Utc};
use ground_llm::traits::CachedContentRef;
use ground_web::RetrievalContext;

/// Local view of a provider-side context cache.
///
/// The provider owns the cached bytes; the session keeps the handle plus
/// enough bookkeeping (`created_at`, `ttl`) to tell locally when the cache
/// can no longer be used.
#[derive(Debug, Clone)]
pub struct SessionCache {
    handle: CachedContentRef,
    model_id: String,
    system_instruction: String,
    content: RetrievalContext,
    created_at: DateTime<Utc>,
    ttl: TimeDelta,
}

impl SessionCache {
    pub fn new(
        handle: CachedContentRef,
        model_id: impl Into<String>,
        system_instruction: impl Into<String>,
        content: RetrievalContext,
        created_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Self {
        Self {
            handle,
            model_id: model_id.into(),
            system_instruction: system_instruction.into(),
            content,
            created_at,
            ttl,
        }
    }

    pub fn handle(&self) -> &CachedContentRef {
        &self.handle
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn content(&self) -> &RetrievalContext {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + self.ttl
    }

    /// Expired from the instant `created_at + ttl` is reached.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}
