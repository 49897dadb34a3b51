//! Agent Orchestrator — spec §4.6: a small directed state graph composing
//! the Fact Extractor, Query Reflector, Retriever, Rule Parser, and
//! Verifier with bounded iteration and banned-code bookkeeping, in Deep and
//! Smart modes, falling back to a linear pipeline on graph failure.

pub mod critic;
pub mod fallback;
pub mod mode;
pub mod orchestrator;
pub mod propose;
pub mod result;
pub mod verify_round;

pub use mode::Mode;
pub use orchestrator::Orchestrator;
pub use result::AgentResult;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("facts error: {0}")]
    Facts(String),

    #[error("reflection error: {0}")]
    Reflection(String),

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("graph error: {0}")]
    Graph(String),
}

impl From<AgentError> for mbs_core::Error {
    fn from(err: AgentError) -> Self {
        mbs_core::Error::Agent(err.to_string())
    }
}

/// Placeholder pair-wise exclusivity resolver (spec §4.4 / §9 open
/// question): the source leaves this as a no-op, returning items unchanged
/// with no conflict notes. Kept as a named seam so a future resolver (e.g.
/// flagging two same-day-exclusive items both present in `accepted`) has a
/// single call site to extend rather than requiring callers to inline the
/// logic themselves.
pub fn resolve_time_conflicts(items: Vec<mbs_core::VerifiedItem>) -> (Vec<mbs_core::VerifiedItem>, Vec<String>) {
    (items, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_core::VerifiedItem;

    #[test]
    fn resolve_time_conflicts_is_currently_a_no_op() {
        let items = vec![VerifiedItem {
            code: "23".to_string(),
            display: "d".to_string(),
            fee: None,
            score: None,
            verify: None,
            group: None,
            match_reason: None,
        }];
        let (out, conflicts) = resolve_time_conflicts(items.clone());
        assert_eq!(out.len(), items.len());
        assert!(conflicts.is_empty());
    }
}
