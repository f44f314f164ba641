use crate::cache::SessionCache;
use crate::handle::ModelHandle;
use crate::session::{ChatSession, SessionState};
use chrono::{Local, TimeDelta};
use ground_common::{Clock, GroundError, Locale, Result};
use ground_llm::prompts;
use ground_llm::traits::{CacheRequest, ConversationTurn, GenerationConfig, LlmClient};
use ground_web::ContextRetriever;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub locale: Locale,
    pub model: String,
    pub ttl: Duration,
    pub generation: GenerationConfig,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            locale: Locale::En,
            model: "models/gemini-1.5-flash-002".to_string(),
            ttl: Duration::from_secs(15 * 60),
            generation: GenerationConfig::default(),
        }
    }
}

/// What the user sees for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// First message: visited sites, then the confirmation.
    Initialized { trace: String, confirmation: String },
    /// Later messages: the model text, verbatim.
    Answer(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Initialized {
                trace,
                confirmation,
            } => write!(f, "{trace}\n\n{confirmation}"),
            Reply::Answer(text) => f.write_str(text),
        }
    }
}

/// Routes each message of a session: initialize on the first one, converse
/// afterwards. Holds no per-session state, so one controller serves any
/// number of independent sessions.
pub struct ConversationController {
    retriever: Arc<dyn ContextRetriever>,
    llm: Arc<dyn LlmClient + Send + Sync>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
}

impl ConversationController {
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        llm: Arc<dyn LlmClient + Send + Sync>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            retriever,
            llm,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub async fn handle(&self, session: &mut ChatSession, message: &str) -> Result<Reply> {
        match session.state() {
            SessionState::Uninitialized => self.initialize(session, message).await,
            SessionState::Active => self.converse(session, message).await,
        }
    }

    /// Any failure leaves the session untouched (still `Uninitialized`).
    async fn initialize(&self, session: &mut ChatSession, query: &str) -> Result<Reply> {
        let started = Instant::now();
        tracing::info!(
            target: "chat",
            session = %session.id(),
            query = %query,
            "chat.session.initializing"
        );

        if self.settings.model.trim().is_empty() {
            return Err(GroundError::ModelHandle("no model configured".to_string()));
        }

        let context = self.retriever.retrieve(query).await?;
        if context.is_empty() {
            return Err(GroundError::CacheCreation(format!(
                "no reachable web pages for {query:?}; nothing to cache"
            )));
        }

        let now = self.clock.now();
        let ttl = TimeDelta::from_std(self.settings.ttl)
            .map_err(|e| GroundError::Config(format!("invalid session ttl: {e}")))?;
        let system_instruction = prompts::system_instruction(
            self.settings.locale,
            now.with_timezone(&Local).date_naive(),
        );

        let request = CacheRequest {
            model: self.settings.model.clone(),
            system_instruction,
            contents: vec![context.doc_string.clone()],
            ttl: self.settings.ttl,
        };
        let cache_ref = self.llm.create_cache(&request).await?;

        let cache = SessionCache::new(
            cache_ref,
            request.model,
            request.system_instruction,
            context,
            now,
            ttl,
        );
        let cache_name = cache.handle().name.clone();
        let handle = ModelHandle::bind(self.llm.clone(), cache, self.settings.generation)
            .inspect_err(|e| {
                tracing::warn!(
                    target: "chat",
                    session = %session.id(),
                    cache = %cache_name,
                    error = %e,
                    "chat.session.cache_orphaned"
                )
            })?;
        let trace = handle.cache().content().trace.clone();

        tracing::info!(
            target: "chat",
            session = %session.id(),
            cache = %handle.cache().handle().name,
            documents = handle.cache().content().len(),
            expires_at = %handle.cache().expires_at(),
            duration_ms = started.elapsed().as_millis() as u64,
            "chat.session.active"
        );
        session.handle = Some(handle);

        Ok(Reply::Initialized {
            trace,
            confirmation: prompts::initialized_message(self.settings.locale).to_string(),
        })
    }

    /// The user turn is only kept if the model answers, so history always
    /// alternates user/model.
    async fn converse(&self, session: &mut ChatSession, message: &str) -> Result<Reply> {
        let Some(handle) = session.handle.as_ref() else {
            return Err(GroundError::ModelHandle("session has no model handle".into()));
        };

        session.history.push(ConversationTurn::user(message));
        match handle.generate(&session.history, self.clock.now()).await {
            Ok(text) => {
                session.history.push(ConversationTurn::model(text.clone()));
                tracing::debug!(
                    target: "chat",
                    session = %session.id(),
                    turns = session.history.len(),
                    "chat.turn.done"
                );
                Ok(Reply::Answer(text))
            }
            Err(e) => {
                session.history.pop();
                tracing::warn!(
                    target: "chat",
                    session = %session.id(),
                    error = %e,
                    cache_expired = e.is_cache_expired(),
                    "chat.turn.failed"
                );
                Err(e)
            }
        }
    }
}
