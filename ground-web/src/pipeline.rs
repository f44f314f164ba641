use crate::assemble::assemble;
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, HttpFetcher, PageFetcher, fetch_documents};
use crate::filter::{DEFAULT_PROBE_TIMEOUT, DomainFilter, HttpProbe, LivenessProbe};
use crate::normalize::normalize_document;
use crate::search::SearchProvider;
use crate::types::RetrievalContext;
use async_trait::async_trait;
use ground_common::{GroundError, Result};
use ground_http::HttpClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Turns a query into grounding context.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<RetrievalContext>;
}

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub topk: usize,
    /// Search language (`hl`).
    pub language: String,
    pub probe_concurrency: usize,
    pub probe_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            topk: 10,
            language: "en".into(),
            probe_concurrency: 1,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// search → dedup/liveness filter → fetch → normalize → assemble.
pub struct Retriever {
    search: Arc<dyn SearchProvider>,
    filter: DomainFilter,
    fetcher: Arc<dyn PageFetcher>,
    options: RetrievalOptions,
}

impl Retriever {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        probe: Arc<dyn LivenessProbe>,
        fetcher: Arc<dyn PageFetcher>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            search,
            filter: DomainFilter::new(probe, options.probe_concurrency),
            fetcher,
            options,
        }
    }

    /// Probe and fetch over plain HTTP with the timeouts from `options`.
    pub fn over_http(
        search: Arc<dyn SearchProvider>,
        user_agent: &str,
        options: RetrievalOptions,
    ) -> Result<Self> {
        let http = HttpClient::absolute(user_agent)
            .map_err(|e| GroundError::Config(format!("http client: {e}")))?
            .with_retries(0);
        let probe = HttpProbe::new(http.clone(), options.probe_timeout);
        let fetcher = HttpFetcher::new(http.with_timeout(options.fetch_timeout));
        Ok(Self::new(search, Arc::new(probe), Arc::new(fetcher), options))
    }

    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }
}

#[async_trait]
impl ContextRetriever for Retriever {
    async fn retrieve(&self, query: &str) -> Result<RetrievalContext> {
        let started = Instant::now();
        let topk = self.options.topk;

        let candidates = self.search.search(query, &self.options.language).await?;
        let outcome = self.filter.admit(candidates, topk).await;
        let raw = fetch_documents(self.fetcher.as_ref(), &outcome.admitted, topk).await;
        let documents = raw.into_iter().map(normalize_document).collect();
        let context = assemble(documents, &outcome.trace);

        tracing::info!(
            target: "web.retrieve",
            topk,
            admitted = outcome.admitted.len(),
            documents = context.len(),
            doc_string_len = context.doc_string.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "web.retrieve.done"
        );
        Ok(context)
    }
}
