//! Common types and utilities shared across Ground crates.
//!
//! This crate defines the shared error type, the clock abstraction used for
//! TTL bookkeeping, and observability helpers. It is intentionally
//! lightweight so that every crate in the workspace can depend on it.
//!
//! # Overview
//!
//! - [`GroundError`] and [`Result`]: Shared error handling
//! - [`clock`]: Wall-clock seam ([`Clock`], [`SystemClock`], [`ManualClock`])
//! - [`Locale`]: Conversation locale shared by configuration and prompts
//! - [`observability`]: Centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use ground_common::GroundError;
//!
//! let err = GroundError::CacheExpiredOrInvalid("ttl elapsed".into());
//! assert!(err.is_cache_expired());
//! assert!(err.to_string().contains("ttl elapsed"));
//! ```
pub mod clock;
mod locale;
pub mod observability;

pub use clock::{Clock, ManualClock, SystemClock};
pub use locale::Locale;

/// Error types used across the Ground system.
#[derive(thiserror::Error, Debug)]
pub enum GroundError {
    /// The search provider call failed (network or non-success status).
    #[error("Search provider error: {0}")]
    SearchProvider(String),

    /// The provider refused or failed to create the cached context.
    #[error("Cache creation failed: {0}")]
    CacheCreation(String),

    /// The cached context is past its TTL or the provider no longer knows it.
    #[error("Cached context expired or invalid: {0}")]
    CacheExpiredOrInvalid(String),

    /// A model handle could not be bound to the cached context.
    #[error("Model handle error: {0}")]
    ModelHandle(String),

    /// A generate call failed for a reason other than cache expiry.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GroundError {
    /// True when the error means the session's cached context is unusable.
    pub fn is_cache_expired(&self) -> bool {
        matches!(self, GroundError::CacheExpiredOrInvalid(_))
    }
}

/// Convenient alias for results that use [`GroundError`].
pub type Result<T> = std::result::Result<T, GroundError>;
