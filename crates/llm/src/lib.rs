//! LLM backend abstraction for the MBS agent's two model-backed calls:
//! fact completion (spec §4.2) and query refinement (spec §4.5).
//!
//! Grounded on the teacher's `voice-agent-llm` crate, trimmed to
//! chat-completion only — no streaming, no speculative execution, no
//! persona/conversation prompting, since this system answers one-shot
//! retrieval requests rather than carrying on a dialog.

pub mod backend;
pub mod completion;
pub mod prompt;
pub mod schema;

pub use backend::{GenerationResult, LlmBackend, LlmConfig, OllamaBackend};
pub use completion::{LlmFactCompleter, LlmQueryRewriter};
pub use prompt::{Message, PromptBuilder, Role};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("generation error: {0}")]
    Generation(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for mbs_core::Error {
    fn from(err: LlmError) -> Self {
        mbs_core::Error::Llm(err.to_string())
    }
}
