//! Generative-model integration for grounded chat sessions.
//!
//! This crate exposes the [`traits::LlmClient`] seam (context-cache creation
//! and cache-bound generation), the Gemini implementation, and the per-locale
//! system instructions. [`build_llm_client`] turns an
//! [`ground_config::LlmConfig`] into a ready client.
//!
//! # Examples
//! ```no_run
//! use ground_config::GroundConfigLoader;
//! use ground_llm::build_llm_client;
//!
//! # fn main() -> ground_common::Result<()> {
//! let cfg = GroundConfigLoader::new()
//!     .with_optional_file("ground.yaml")
//!     .load()
//!     .map_err(|e| ground_common::GroundError::Config(e.to_string()))?;
//! let client = build_llm_client(&cfg.llm)?;
//! assert!(client.model_name().starts_with("models/"));
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod prompts;
pub mod traits;

use gemini::GeminiClient;
use ground_common::Result;
use ground_config::{LlmConfig, LlmProvider};
use std::sync::Arc;
use traits::{GenerationConfig, LlmClient};

/// Build the configured provider client.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config.provider {
        LlmProvider::Gemini => {
            let client = GeminiClient::with_base_url(
                config.api_key.clone(),
                config.model.clone(),
                &config.base_url,
            )?;
            tracing::info!(
                target: "llm",
                provider = "gemini",
                model = %client.model_name(),
                "llm.client.ready"
            );
            Ok(Arc::new(client))
        }
    }
}

pub fn generation_config(config: &LlmConfig) -> GenerationConfig {
    GenerationConfig {
        temperature: config.temperature,
        top_p: config.top_p,
        max_output_tokens: config.max_output_tokens,
    }
}
