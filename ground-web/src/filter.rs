//! Domain deduplication and liveness filtering.
//!
//! Candidates are walked in rank order. A candidate is probed only while its
//! domain has not been admitted and fewer than `topk` domains are admitted;
//! it is admitted when the probe answers exactly 200. Probes may run in
//! waves of distinct, not-yet-admitted domains, which yields the same admitted
//! list, in the same order, as one-at-a-time evaluation.
use crate::domain::Domain;
use crate::types::SearchCandidate;
use async_trait::async_trait;
use futures::future::join_all;
use ground_http::{HttpClient, HttpError};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ProbeFailure {
    #[error("probe timed out")]
    Timeout,
    #[error("probe failed: {0}")]
    Network(String),
}

/// Reports the HTTP status a URL answers with right now.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn status(&self, url: &Url) -> Result<u16, ProbeFailure>;
}

/// GET-based probe with a short timeout and no retries.
#[derive(Clone)]
pub struct HttpProbe {
    http: HttpClient,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(http: HttpClient, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    async fn status(&self, url: &Url) -> Result<u16, ProbeFailure> {
        match self.http.probe(url.as_str(), self.timeout).await {
            Ok(status) => Ok(status.as_u16()),
            Err(HttpError::Timeout(_)) => Err(ProbeFailure::Timeout),
            Err(e) => Err(ProbeFailure::Network(e.to_string())),
        }
    }
}

/// Admitted candidates in admission order and one trace line per admission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub admitted: Vec<SearchCandidate>,
    pub trace: Vec<String>,
}

impl FilterOutcome {
    pub fn trace_text(&self) -> String {
        self.trace.join("\n")
    }
}

pub fn trace_line(link: &str) -> String {
    format!("Currently searching the website: {link}")
}

#[derive(Clone)]
pub struct DomainFilter {
    probe: Arc<dyn LivenessProbe>,
    concurrency: usize,
}

impl DomainFilter {
    /// `concurrency` bounds in-flight probes; 1 probes strictly one at a time.
    pub fn new(probe: Arc<dyn LivenessProbe>, concurrency: usize) -> Self {
        Self {
            probe,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn admit(&self, candidates: Vec<SearchCandidate>, topk: usize) -> FilterOutcome {
        let started = Instant::now();
        let mut outcome = FilterOutcome::default();
        let mut seen: HashSet<Domain> = HashSet::new();
        let mut probed = 0usize;

        let mut pending: VecDeque<(SearchCandidate, Domain)> = VecDeque::new();
        for candidate in candidates {
            match Domain::from_url(&candidate.url) {
                Some(domain) => pending.push_back((candidate, domain)),
                None => tracing::debug!(
                    target: "web.filter",
                    url = %candidate.url,
                    "web.filter.no_domain"
                ),
            }
        }

        while outcome.admitted.len() < topk && !pending.is_empty() {
            let slots = (topk - outcome.admitted.len()).min(self.concurrency);
            let wave = next_wave(&mut pending, &seen, slots);
            if wave.is_empty() {
                break;
            }
            probed += wave.len();

            let results = join_all(wave.iter().map(|(c, _)| self.probe.status(&c.url))).await;
            for ((candidate, domain), result) in wave.into_iter().zip(results) {
                match result {
                    Ok(200) => {
                        tracing::info!(
                            target: "web.filter",
                            rank = candidate.rank,
                            url = %candidate.url,
                            domain = %domain,
                            "web.filter.admitted"
                        );
                        outcome.trace.push(trace_line(&candidate.link));
                        seen.insert(domain);
                        outcome.admitted.push(candidate);
                    }
                    Ok(status) => tracing::debug!(
                        target: "web.filter",
                        rank = candidate.rank,
                        url = %candidate.url,
                        status,
                        "web.filter.rejected"
                    ),
                    Err(e) => tracing::debug!(
                        target: "web.filter",
                        rank = candidate.rank,
                        url = %candidate.url,
                        error = %e,
                        "web.filter.probe_failed"
                    ),
                }
            }
        }

        tracing::info!(
            target: "web.filter",
            topk,
            probed,
            admitted = outcome.admitted.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "web.filter.done"
        );
        outcome
    }
}

/// Pops the longest rank-order run of candidates whose domains are distinct
/// and not yet admitted, up to `slots`. Candidates of admitted domains are
/// discarded on the way; a repeat of a domain already in the wave stays queued.
fn next_wave(
    pending: &mut VecDeque<(SearchCandidate, Domain)>,
    seen: &HashSet<Domain>,
    slots: usize,
) -> Vec<(SearchCandidate, Domain)> {
    let mut wave: Vec<(SearchCandidate, Domain)> = Vec::with_capacity(slots);
    while wave.len() < slots {
        let Some((_, domain)) = pending.front() else {
            break;
        };
        if seen.contains(domain) {
            if let Some((dup, _)) = pending.pop_front() {
                tracing::debug!(
                    target: "web.filter",
                    rank = dup.rank,
                    url = %dup.url,
                    "web.filter.duplicate_domain"
                );
            }
            continue;
        }
        if wave.iter().any(|(_, d)| d == domain) {
            break;
        }
        if let Some(next) = pending.pop_front() {
            wave.push(next);
        }
    }
    wave
}
