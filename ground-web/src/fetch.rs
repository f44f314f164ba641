//! Full page retrieval for admitted candidates.
use crate::extract::extract_document;
use crate::types::{Document, SearchCandidate};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ground_http::{HttpClient, HttpError, RequestOpts};
use std::time::{Duration, Instant};
use url::Url;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    #[error("fetch timed out: {0}")]
    Timeout(String),
    #[error("fetch returned status {0}")]
    Status(u16),
    #[error("fetch failed: {0}")]
    Network(String),
}

impl From<HttpError> for FetchFailure {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout(msg) => FetchFailure::Timeout(msg),
            HttpError::Api { status, .. } => FetchFailure::Status(status.as_u16()),
            other => FetchFailure::Network(other.to_string()),
        }
    }
}

/// Returns the raw HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchFailure>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: HttpClient,
}

impl HttpFetcher {
    /// `http` should carry the long fetch timeout; requests are not retried.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchFailure> {
        let body = self
            .http
            .get_text(
                url.as_str(),
                RequestOpts {
                    retries: Some(0),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await?;
        Ok(body)
    }
}

/// Fetch and extract every admitted candidate, keeping admission order.
/// At most `max_in_flight` requests run at once. A page that fails to fetch
/// is logged and skipped; the rest still come back.
pub async fn fetch_documents(
    fetcher: &dyn PageFetcher,
    admitted: &[SearchCandidate],
    max_in_flight: usize,
) -> Vec<Document> {
    let started = Instant::now();
    let results: Vec<Option<Document>> = stream::iter(admitted.iter().cloned())
        .map(|candidate| async move {
            match fetcher.fetch(&candidate.url).await {
                Ok(html) => {
                    let doc = extract_document(candidate.url.as_str(), &html);
                    tracing::debug!(
                        target: "web.fetch",
                        rank = candidate.rank,
                        url = %candidate.url,
                        html_len = html.len(),
                        text_len = doc.content.len(),
                        "web.fetch.done"
                    );
                    Some(doc)
                }
                Err(e) => {
                    tracing::warn!(
                        target: "web.fetch",
                        rank = candidate.rank,
                        url = %candidate.url,
                        error = %e,
                        "web.fetch.skipped"
                    );
                    None
                }
            }
        })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let docs: Vec<Document> = results.into_iter().flatten().collect();
    tracing::info!(
        target: "web.fetch",
        requested = admitted.len(),
        fetched = docs.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "web.fetch.finished"
    );
    docs
}
