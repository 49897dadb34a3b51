//! Conditional LLM query refinement — spec §4.5.
//!
//! Grounded on the teacher's `PromptBuilder` composition pattern
//! (`voice-agent-llm::prompt`): the trait here is the seam `mbs-agent` wires
//! to a concrete `mbs-llm` backend, kept free of any HTTP client so
//! `mbs-reflect` stays pure and unit-testable without a model.

use async_trait::async_trait;
use mbs_core::{NoteFacts, Result};

/// Rewrites a retrieval query given the note, the facts extracted so far,
/// and the codes already banned this run. Called only when completeness is
/// below the reflection threshold or the heuristic abbreviation/missing-
/// context flags fire (spec §4.5: "refine only when warranted").
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    async fn rewrite(&self, note: &str, facts: &NoteFacts, banned_codes: &[String]) -> Result<String>;
}

/// A rewriter that returns the query unchanged — used when no LLM backend
/// is configured.
pub struct NoOpQueryRewriter;

#[async_trait]
impl QueryRewriter for NoOpQueryRewriter {
    async fn rewrite(&self, note: &str, _facts: &NoteFacts, _banned_codes: &[String]) -> Result<String> {
        Ok(note.to_string())
    }
}
