//! Environment-layered settings and the LLM prompt-template registry for
//! the MBS agentic RAG recommender.
//!
//! Grounded on the teacher's `voice-agent-config` crate: `settings.rs`'s
//! `Config::builder()` file+env layering and `prompts.rs`'s
//! data-not-code prompt registry, both trimmed to this system's scope.

pub mod prompts;
pub mod settings;

pub use prompts::PromptTemplates;
pub use settings::{load_settings, EmbeddingProvider, ObservabilityConfig, ServerConfig, Settings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for mbs_core::Error {
    fn from(err: ConfigError) -> Self {
        mbs_core::Error::Config(err.to_string())
    }
}
