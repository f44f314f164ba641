use anyhow::{Context, Result};
use ground_chat::{ConversationController, SessionSettings};
use ground_common::SystemClock;
use ground_config::GroundConfig;
use ground_llm::{build_llm_client, generation_config};
use ground_web::{GoogleSearch, RetrievalOptions, Retriever};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("ground/", env!("CARGO_PKG_VERSION"));

/// One controller shared by every session the user opens.
pub struct App {
    pub controller: ConversationController,
}

pub fn build_from_config(cfg: &GroundConfig) -> Result<App> {
    // search provider
    let search = GoogleSearch::new(
        cfg.search.base_url.clone(),
        cfg.search.api_key.clone(),
        cfg.search.engine_id.clone(),
    )
    .context("building search client")?
    .with_extra(cfg.search.extra.clone());

    // retrieval pipeline
    let options = RetrievalOptions {
        topk: cfg.search.topk,
        language: cfg.search_language(),
        probe_concurrency: cfg.retrieval.probe_concurrency,
        probe_timeout: Duration::from_millis(cfg.retrieval.probe_timeout_ms),
        fetch_timeout: Duration::from_secs(cfg.retrieval.fetch_timeout_secs),
    };
    let user_agent = cfg.retrieval.user_agent.as_deref().unwrap_or(USER_AGENT);
    let retriever = Retriever::over_http(Arc::new(search), user_agent, options)
        .context("building retrieval pipeline")?;

    // model
    let llm = build_llm_client(&cfg.llm).context("building model client")?;
    let settings = SessionSettings {
        locale: cfg.session.locale,
        model: llm.model_name().to_string(),
        ttl: Duration::from_secs(cfg.session.ttl_minutes * 60),
        generation: generation_config(&cfg.llm),
    };

    tracing::info!(
        topk = retriever.options().topk,
        language = %retriever.options().language,
        model = %settings.model,
        ttl_secs = settings.ttl.as_secs(),
        "ground.wired"
    );

    let controller =
        ConversationController::new(Arc::new(retriever), llm, Arc::new(SystemClock), settings);
    Ok(App { controller })
}
