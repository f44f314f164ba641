//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Sources are merged in order: an optional `ground.yaml` (or any file the
//! `config` crate can infer from its suffix), inline YAML snippets, then
//! `GROUND__`-prefixed environment variables (`__` separates path segments,
//! e.g. `GROUND__SEARCH__TOPK=5`). String values may reference other
//! variables as `${VAR}`; references are expanded recursively up to a fixed
//! depth before the typed structs are materialised.
use config::{Config, ConfigError, Environment, File, FileFormat};
use ground_common::Locale;
use ground_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_GEMINI_MODEL: &str = "models/gemini-1.5-flash-002";

#[derive(Debug, Clone, Deserialize)]
pub struct GroundConfig {
    pub search: SearchConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Google Programmable Search credentials and query defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub api_key: String,
    pub engine_id: String,
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Overrides the locale's language when set.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_topk")]
    pub topk: usize,
    /// Extra provider query pairs passed through verbatim.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub probe_timeout_ms: u64,
    pub fetch_timeout_secs: u64,
    pub probe_concurrency: usize,
    pub user_agent: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 1_000,
            fetch_timeout_secs: 600,
            probe_concurrency: 1,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_minutes: u64,
    pub locale: Locale,
    /// Inputs accepted per session by the terminal loop.
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 15,
            locale: Locale::En,
            max_turns: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub emit_stderr: bool,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: false,
            filter: "info".into(),
            dir: None,
        }
    }
}

fn default_search_base_url() -> String {
    DEFAULT_SEARCH_BASE_URL.into()
}
fn default_topk() -> usize {
    10
}
fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.into()
}
fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.into()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_output_tokens() -> u32 {
    8192
}

impl GroundConfig {
    /// Language sent to the search provider: explicit override or the locale's.
    pub fn search_language(&self) -> String {
        self.search
            .language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.session.locale.search_language().to_string())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_resolved("search.api_key", &self.search.api_key)?;
        require_resolved("search.engine_id", &self.search.engine_id)?;
        require_resolved("llm.api_key", &self.llm.api_key)?;
        if self.search.topk == 0 {
            return Err(ConfigError::Message("search.topk must be > 0".into()));
        }
        if self.retrieval.probe_concurrency == 0 {
            return Err(ConfigError::Message(
                "retrieval.probe_concurrency must be > 0".into(),
            ));
        }
        if self.retrieval.probe_timeout_ms == 0 || self.retrieval.fetch_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "retrieval timeouts must be > 0".into(),
            ));
        }
        if self.session.ttl_minutes == 0 {
            return Err(ConfigError::Message(
                "session.ttl_minutes must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn require_resolved(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Message(format!("{field} is empty")));
    }
    if value.contains("${") {
        return Err(ConfigError::Message(format!(
            "{field} references an unset environment variable: {value}"
        )));
    }
    Ok(())
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct GroundConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for GroundConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GroundConfigLoader {
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so deployments can rely purely on
    /// environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use ground_config::GroundConfigLoader;
    ///
    /// let cfg = GroundConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// search:
    ///   api_key: "k"
    ///   engine_id: "cx"
    ///   topk: 3
    /// llm:
    ///   api_key: "g"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.search.topk, 3);
    /// assert_eq!(cfg.session.ttl_minutes, 15);
    /// assert_eq!(cfg.search_language(), "en");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    pub fn load(self) -> Result<GroundConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(Environment::with_prefix("GROUND").separator("__"))
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        // Round-trip through `config` so env-provided strings still coerce
        // into numeric and boolean fields.
        let json = serde_json::to_string(&v).map_err(|e| ConfigError::Message(e.to_string()))?;
        Config::builder()
            .add_source(File::from_str(&json, FileFormat::Json))
            .build()?
            .try_deserialize()
    }
}
