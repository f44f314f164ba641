//! Candidate discovery through Google Programmable Search (Custom Search JSON API).
use crate::types::SearchCandidate;
use async_trait::async_trait;
use ground_common::{GroundError, Result};
use ground_http::{Auth, DEFAULT_USER_AGENT, HttpClient, RequestOpts};
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Instant;
use url::Url;

const RESERVED_PARAMS: &[&str] = &["key", "cx", "q", "hl"];

/// Returns ranked candidate URLs for a query. Only the first result page is
/// consulted.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, language: &str) -> Result<Vec<SearchCandidate>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    link: Option<String>,
}

#[derive(Clone)]
pub struct GoogleSearch {
    http: HttpClient,
    endpoint: String,
    api_key: String,
    engine_id: String,
    extra: Vec<(String, String)>,
}

impl GoogleSearch {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
    ) -> Result<Self> {
        // Search failures are surfaced to the user as-is; no retries.
        let http = HttpClient::absolute(DEFAULT_USER_AGENT)
            .map_err(|e| GroundError::SearchProvider(e.to_string()))?
            .with_retries(0);
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            extra: Vec::new(),
        })
    }

    /// Extra provider parameters (`safe`, `gl`, `dateRestrict`, ...) appended
    /// to every request. Keys the client sets itself are ignored.
    pub fn with_extra<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in extra {
            let k = k.into();
            if RESERVED_PARAMS.contains(&k.as_str()) {
                tracing::warn!(param = %k, "search.google.extra_param_ignored");
                continue;
            }
            self.extra.push((k, v.into()));
        }
        self
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(&self, query: &str, language: &str) -> Result<Vec<SearchCandidate>> {
        let started = Instant::now();
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("cx", Cow::Borrowed(self.engine_id.as_str())),
            ("q", Cow::Borrowed(query)),
            ("hl", Cow::Borrowed(language)),
        ];
        params.extend(
            self.extra
                .iter()
                .map(|(k, v)| (k.as_str(), Cow::Borrowed(v.as_str()))),
        );

        let resp: SearchResponse = self
            .http
            .get_json(
                &self.endpoint,
                RequestOpts {
                    auth: Some(Auth::Query {
                        name: "key",
                        value: Cow::Borrowed(self.api_key.as_str()),
                    }),
                    query: Some(params),
                    retries: Some(0),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| {
                tracing::warn!(target: "web.search", error = %e, "search.google.failed");
                GroundError::SearchProvider(e.to_string())
            })?;

        let candidates = candidates_from_links(resp.items.into_iter().filter_map(|i| i.link));
        tracing::info!(
            target: "web.search",
            query = %query,
            language,
            candidate_count = candidates.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "search.google.done"
        );
        Ok(candidates)
    }
}

/// Keeps provider order. Links that are not http(s) URLs with a host are
/// dropped and do not consume a rank.
fn candidates_from_links(links: impl IntoIterator<Item = String>) -> Vec<SearchCandidate> {
    let mut out = Vec::new();
    for link in links {
        match Url::parse(&link) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                let rank = out.len() + 1;
                out.push(SearchCandidate::new(url, rank).with_link(link));
            }
            _ => tracing::debug!(target: "web.search", %link, "search.google.link_skipped"),
        }
    }
    out
}
