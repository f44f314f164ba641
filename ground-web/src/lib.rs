//! Web retrieval for grounding a chat session.
//!
//! - Google Programmable Search client for candidate discovery (`search`)
//! - Domain deduplication and liveness probing (`domain`, `filter`)
//! - Page fetching and HTML-to-text extraction (`fetch`, `extract`)
//! - Text cleanup and context assembly (`normalize`, `assemble`)
//! - [`Retriever`] chains the stages behind the [`ContextRetriever`] seam.

pub mod assemble;
pub mod domain;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod normalize;
mod pipeline;
pub mod search;
mod types;

pub use domain::Domain;
pub use fetch::{FetchFailure, HttpFetcher, PageFetcher};
pub use filter::{DomainFilter, FilterOutcome, HttpProbe, LivenessProbe, ProbeFailure};
pub use pipeline::{ContextRetriever, RetrievalOptions, Retriever};
pub use search::{GoogleSearch, SearchProvider};
pub use types::{Document, DocumentMetadata, RetrievalContext, SearchCandidate};
