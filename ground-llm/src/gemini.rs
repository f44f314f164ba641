use crate::traits::{
    CacheRequest, CachedContentRef, ConversationTurn, GenerationConfig, LlmClient, LlmResponse,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ground_common::{GroundError, Result};
use ground_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::{Duration, Instant};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCacheRequest<'a> {
    model: &'a str,
    system_instruction: GeminiSystemInstruction<'a>,
    contents: Vec<GeminiContent<'a>>,
    ttl: String,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    cached_content: &'a str,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedContentResponse {
    name: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    expire_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Google Gemini client using the `cachedContents` API for grounding.
///
/// Requires a valid API key and internet access.
pub struct GeminiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client using the provided API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL)
    }

    /// Point the client at another endpoint (proxies, tests).
    pub fn with_base_url(api_key: String, model: String, base_url: &str) -> Result<Self> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let client = HttpClient::new(&base)
            .map_err(|e| GroundError::Config(format!("Gemini HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(120));

        Ok(Self {
            client,
            api_key,
            model: qualified_model(&model),
        })
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(self.api_key.as_str()),
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn create_cache(&self, request: &CacheRequest) -> Result<CachedContentRef> {
        let started = Instant::now();
        let model = qualified_model(&request.model);
        let body = CreateCacheRequest {
            model: &model,
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiPart {
                    text: &request.system_instruction,
                }],
            },
            contents: request
                .contents
                .iter()
                .map(|text| GeminiContent {
                    role: "user",
                    parts: vec![GeminiPart { text }],
                })
                .collect(),
            ttl: format!("{}s", request.ttl.as_secs()),
        };

        // Creation is not idempotent: a retried POST can leave an orphaned cache.
        let opts = RequestOpts {
            retries: Some(0),
            ..self.opts()
        };
        let resp: CachedContentResponse = self
            .client
            .post_json_opts("cachedContents", &body, opts)
            .await
            .map_err(|e| GroundError::CacheCreation(e.to_string()))?;

        if resp.name.trim().is_empty() {
            return Err(GroundError::CacheCreation(
                "provider returned an empty cache name".to_string(),
            ));
        }

        tracing::info!(
            target: "llm.gemini",
            cache = %resp.name,
            model = %model,
            ttl_secs = request.ttl.as_secs(),
            content_len = request.contents.iter().map(String::len).sum::<usize>(),
            duration_ms = started.elapsed().as_millis() as u64,
            "llm.gemini.cache.created"
        );

        Ok(CachedContentRef {
            name: resp.name,
            model: resp.model.unwrap_or(model),
            expire_time: resp.expire_time,
        })
    }

    async fn generate(
        &self,
        cache: &CachedContentRef,
        history: &[ConversationTurn],
        config: &GenerationConfig,
    ) -> Result<LlmResponse> {
        let started = Instant::now();
        let model = qualified_model(&cache.model);
        let request = GenerateRequest {
            cached_content: &cache.name,
            contents: history
                .iter()
                .map(|turn| GeminiContent {
                    role: turn.role.as_str(),
                    parts: vec![GeminiPart {
                        text: &turn.content,
                    }],
                })
                .collect(),
            generation_config: GeminiGenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
        };

        let resp: GeminiResponse = self
            .client
            .post_json_opts(&format!("{model}:generateContent"), &request, self.opts())
            .await
            .map_err(generate_error)?;

        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GroundError::Generation(format!(
                "prompt blocked by Gemini: {reason}"
            )));
        }

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GroundError::Generation("No candidates returned from Gemini".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("UNKNOWN");
            return Err(GroundError::Generation(format!(
                "Gemini returned no text (finish reason: {reason})"
            )));
        }

        let tokens_used = resp.usage_metadata.and_then(|u| u.total_token_count);
        tracing::info!(
            target: "llm.gemini",
            cache = %cache.name,
            turns = history.len(),
            tokens_used = tokens_used.unwrap_or_default(),
            duration_ms = started.elapsed().as_millis() as u64,
            "llm.gemini.generate.done"
        );

        Ok(LlmResponse {
            text,
            model: Some(model),
            tokens_used,
            finish_reason: candidate.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Gemini model ids are addressed as `models/<id>`.
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// A missing or foreign cache surfaces as 404, or as 403/400 naming the
/// cached content; those mean the session's context is gone.
fn generate_error(e: HttpError) -> GroundError {
    let cache_gone = match &e {
        HttpError::Api {
            status, message, ..
        } => {
            let msg = message.to_ascii_lowercase();
            status.as_u16() == 404
                || (matches!(status.as_u16(), 400 | 403)
                    && (msg.contains("cachedcontent") || msg.contains("cached content")))
        }
        _ => false,
    };
    if cache_gone {
        GroundError::CacheExpiredOrInvalid(e.to_string())
    } else {
        GroundError::Generation(e.to_string())
    }
}
