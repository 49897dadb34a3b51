//! Verified answer synthesis — spec §4.3 step 7.
//!
//! An LLM is given the top `topK+6` document contents plus the current
//! date and a banned-codes list, and asked for a JSON array of at most
//! `topK` `{itemNum, title, match_reason, match_score, fee}` objects. The
//! model call itself is a seam (`AnswerSynthesizer`, concrete impl in
//! `mbs-llm`); this module also owns the deterministic fallback and the
//! post-filter against `excludeCodes ∪ banned` spec §4.3 requires
//! regardless of which path produced the candidates.

use std::collections::BTreeSet;

use async_trait::async_trait;
use mbs_core::Document;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesizedAnswer {
    pub item_num: String,
    pub title: String,
    pub match_reason: String,
    pub match_score: f32,
    pub fee: Option<f64>,
}

/// The model-backed synthesis call. On failure the caller must yield an
/// empty result set, never raise (spec §4.3/§7: "LLM synthesis failure
/// yields empty `results`, never raise").
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        documents: &[Document],
        banned_codes: &BTreeSet<String>,
        current_date: &str,
        top_k: usize,
    ) -> mbs_core::Result<Vec<SynthesizedAnswer>>;
}

/// No LLM configured: build the answer list directly from catalog
/// metadata and the upstream rerank score, skipping banned codes. This is
/// the system's steady-state path — the pack carries no answer-synthesis
/// model, so every deployment of this workspace runs through here.
pub struct DeterministicAnswerSynthesizer;

#[async_trait]
impl AnswerSynthesizer for DeterministicAnswerSynthesizer {
    async fn synthesize(
        &self,
        documents: &[Document],
        banned_codes: &BTreeSet<String>,
        _current_date: &str,
        top_k: usize,
    ) -> mbs_core::Result<Vec<SynthesizedAnswer>> {
        Ok(documents
            .iter()
            .filter(|doc| !banned_codes.contains(&doc.id))
            .take(top_k)
            .map(|doc| SynthesizedAnswer {
                item_num: doc.id.clone(),
                title: doc.content.clone(),
                match_reason: "Matched by hybrid retrieval and rerank".to_string(),
                match_score: doc.score,
                fee: doc.metadata.get("schedule_fee").and_then(|v| v.as_f64()),
            })
            .collect())
    }
}

/// Re-filter a synthesized answer set against the exclude/banned union
/// (spec §4.3 step 7's closing instruction), regardless of which
/// `AnswerSynthesizer` produced it — an LLM-authored result is not trusted
/// to have honored the exclusion list itself.
pub fn filter_excluded(answers: Vec<SynthesizedAnswer>, excluded: &BTreeSet<String>) -> Vec<SynthesizedAnswer> {
    answers.into_iter().filter(|a| !excluded.contains(&a.item_num)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_synthesis_skips_banned_codes() {
        let docs = vec![Document::new("23", "Professional attendance", 0.9), Document::new("36", "Another item", 0.7)];
        let mut banned = BTreeSet::new();
        banned.insert("23".to_string());
        let answers = DeterministicAnswerSynthesizer.synthesize(&docs, &banned, "2026-07-27", 10).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].item_num, "36");
    }

    #[test]
    fn filter_excluded_drops_matching_codes() {
        let answers = vec![SynthesizedAnswer {
            item_num: "23".to_string(),
            title: "t".to_string(),
            match_reason: "r".to_string(),
            match_score: 0.5,
            fee: None,
        }];
        let mut excluded = BTreeSet::new();
        excluded.insert("23".to_string());
        assert!(filter_excluded(answers, &excluded).is_empty());
    }
}
