use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ground_common::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Sampling parameters sent with every generate call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

/// What to store in a provider-side context cache.
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub model: String,
    pub system_instruction: String,
    pub contents: Vec<String>,
    pub ttl: Duration,
}

/// Opaque reference to a provider-side cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedContentRef {
    /// Provider handle, e.g. `cachedContents/abc123`.
    pub name: String,
    pub model: String,
    pub expire_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Create a TTL-scoped cache holding the system instruction and contents.
    async fn create_cache(&self, request: &CacheRequest) -> Result<CachedContentRef>;

    /// Generate the next model turn for `history` against a cache.
    ///
    /// Fails with `GroundError::CacheExpiredOrInvalid` when the provider no
    /// longer knows the cache.
    async fn generate(
        &self,
        cache: &CachedContentRef,
        history: &[ConversationTurn],
        config: &GenerationConfig,
    ) -> Result<LlmResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
