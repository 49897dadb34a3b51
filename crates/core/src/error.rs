//! Shared error type
//!
//! Every other crate in the workspace defines its own `thiserror` enum for
//! its own failure modes and converts into this one at the crate boundary,
//! mirroring the teacher's `RagError -> voice_agent_core::Error` pattern.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("fact extraction error: {0}")]
    Facts(String),

    #[error("rule parsing error: {0}")]
    Rules(String),

    #[error("verification error: {0}")]
    Verify(String),

    #[error("query reflection error: {0}")]
    Reflect(String),

    #[error("retrieval error: {0}")]
    Rag(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("agent orchestration error: {0}")]
    Agent(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
