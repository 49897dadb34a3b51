//! `AgentState` and `VerifiedItem` — the orchestrator's request-local state.
//!
//! Request-local per spec §5: there is no shared mutable state across
//! requests beyond read-only handles to the index/reranker/LLM clients.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::facts::NoteFacts;
use crate::verify::VerifyReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedItem {
    pub code: String,
    pub display: String,
    pub fee: Option<f64>,
    pub score: Option<f32>,
    pub verify: Option<VerifyReport>,
    pub group: Option<String>,
    /// Human-readable reason the retriever or orchestrator surfaced this
    /// code (spec §4.6: Smart mode's default "Enhanced by query
    /// self-reflection" when the retriever supplied none of its own).
    pub match_reason: Option<String>,
}

impl VerifiedItem {
    /// Merge another candidate for the same code: last writer wins on each
    /// attribute (spec §3 invariant: "last writer wins on attribute merge").
    pub fn merge_from(&mut self, other: VerifiedItem) {
        self.display = other.display;
        if other.fee.is_some() {
            self.fee = other.fee;
        }
        if other.score.is_some() {
            self.score = other.score;
        }
        if other.verify.is_some() {
            self.verify = other.verify;
        }
        if other.group.is_some() {
            self.group = other.group;
        }
        if other.match_reason.is_some() {
            self.match_reason = other.match_reason;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub note: String,
    pub top_n: usize,
    pub iterations: usize,
    pub done: bool,

    pub facts: Option<NoteFacts>,
    pub enhanced_query: Option<String>,
    pub reflection_constraints: Vec<String>,

    pub proposal: Vec<String>,
    pub accepted: Vec<VerifiedItem>,
    pub banned_codes: BTreeSet<String>,
    pub seen_codes: BTreeSet<String>,
    pub conflicts_resolved: Vec<String>,
}

impl AgentState {
    pub fn new(note: impl Into<String>, top_n: usize) -> Self {
        Self { note: note.into(), top_n, ..Default::default() }
    }

    /// Dedup-by-code accept with last-writer-wins merge (spec §3 invariant).
    pub fn accept(&mut self, item: VerifiedItem) {
        if let Some(existing) = self.accepted.iter_mut().find(|i| i.code == item.code) {
            existing.merge_from(item);
        } else {
            self.accepted.push(item);
        }
    }

    /// Monotonically grow the banned set (spec §3 invariant: never shrinks
    /// within a run).
    pub fn ban(&mut self, codes: impl IntoIterator<Item = String>) {
        for c in codes {
            self.seen_codes.insert(c.clone());
            self.banned_codes.insert(c);
        }
    }

    pub fn is_full(&self) -> bool {
        self.accepted.len() >= self.top_n
    }

    /// Truncate `accepted` to at most `top_n` at return time (spec §3
    /// invariant).
    pub fn truncate_accepted(&mut self) {
        self.accepted.truncate(self.top_n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: &str) -> VerifiedItem {
        VerifiedItem { code: code.into(), display: "d".into(), fee: None, score: None, verify: None, group: None, match_reason: None }
    }

    #[test]
    fn accept_dedups_by_code() {
        let mut state = AgentState::new("note", 3);
        state.accept(item("23"));
        let mut updated = item("23");
        updated.fee = Some(42.0);
        state.accept(updated);
        assert_eq!(state.accepted.len(), 1);
        assert_eq!(state.accepted[0].fee, Some(42.0));
    }

    #[test]
    fn ban_is_monotonic() {
        let mut state = AgentState::new("note", 3);
        state.ban(["1".to_string(), "2".to_string()]);
        let before = state.banned_codes.clone();
        state.ban(["3".to_string()]);
        assert!(before.is_subset(&state.banned_codes));
        assert!(state.banned_codes.contains("1"));
    }

    #[test]
    fn truncate_respects_top_n() {
        let mut state = AgentState::new("note", 2);
        state.accept(item("1"));
        state.accept(item("2"));
        state.accept(item("3"));
        state.truncate_accepted();
        assert_eq!(state.accepted.len(), 2);
    }
}
