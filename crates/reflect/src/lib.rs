//! Query Reflector — spec §4.5.
//!
//! Scores how complete the extracted facts are, expands known clinical
//! abbreviations deterministically, and only reaches for an LLM rewrite
//! when completeness falls below threshold. Also folds in the growing
//! banned-code set on refinement rounds so a rewritten query steers away
//! from codes already rejected this run.

pub mod rewriter;
pub mod score;

pub use rewriter::{NoOpQueryRewriter, QueryRewriter};
pub use score::{completeness_score, expand_abbreviations, has_abbreviation_needing_llm, key_constraints, missing_clinical_context};

use mbs_core::{NoteFacts, Result};

/// Below this completeness score, `reflect` will call out to the configured
/// `QueryRewriter` rather than relying solely on deterministic expansion.
pub const REFLECTION_THRESHOLD: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct ReflectionResult {
    pub enhanced_query: String,
    pub key_constraints: Vec<String>,
    pub completeness_score: f32,
    pub used_llm: bool,
}

/// Produce the retriever's enhanced query for this round (spec §4.5).
///
/// `banned_codes` are folded into the query as an exclusion hint on refine
/// rounds (iteration > 0); on the first pass it is empty.
pub async fn reflect(
    note: &str,
    facts: &NoteFacts,
    banned_codes: &[String],
    rewriter: &dyn QueryRewriter,
) -> Result<ReflectionResult> {
    let score = completeness_score(facts);
    let constraints = key_constraints(facts);

    let mut enhanced_query = expand_abbreviations(note);
    let mut used_llm = false;

    // spec §4.5 phase 2: "LLM refinement (only if score < 0.8 or heuristics
    // flag it)" — the heuristic flags are an unresolved abbreviation or an
    // absence of symptom/diagnosis/procedure vocabulary in the raw note.
    let needs_llm = score < REFLECTION_THRESHOLD
        || has_abbreviation_needing_llm(note)
        || missing_clinical_context(note);

    if needs_llm {
        let rewritten = rewriter.rewrite(&enhanced_query, facts, banned_codes).await?;
        if !rewritten.trim().is_empty() {
            enhanced_query = rewritten;
            used_llm = true;
        }
    }

    if !banned_codes.is_empty() {
        enhanced_query = format!("{enhanced_query} (excluding items: {})", banned_codes.join(", "));
    }

    Ok(ReflectionResult {
        enhanced_query,
        key_constraints: constraints,
        completeness_score: score,
        used_llm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn low_completeness_triggers_rewrite_seam() {
        let facts = NoteFacts::default();
        let result = reflect("copd review", &facts, &[], &NoOpQueryRewriter).await.unwrap();
        assert!(result.completeness_score < REFLECTION_THRESHOLD);
        assert!(result.used_llm);
    }

    #[tokio::test]
    async fn banned_codes_are_folded_into_the_query() {
        let facts = NoteFacts::default();
        let banned = vec!["23".to_string(), "36".to_string()];
        let result = reflect("review", &facts, &banned, &NoOpQueryRewriter).await.unwrap();
        assert!(result.enhanced_query.contains("excluding items: 23, 36"));
    }

    /// spec §4.5 phase 2: an unresolved abbreviation triggers the LLM
    /// rewrite even when the heuristic completeness score alone would not.
    #[tokio::test]
    async fn abbreviation_triggers_rewrite_despite_high_completeness() {
        let mut facts = NoteFacts::default();
        facts.duration_min = Some(20);
        facts.duration_max = Some(20);
        facts.age = Some(65);
        facts.modality = Some(mbs_core::Modality::InPerson);
        assert!(completeness_score(&facts) >= REFLECTION_THRESHOLD);

        let result = reflect("patient with copd, 20 minute attendance, 65yo, in person", &facts, &[], &NoOpQueryRewriter)
            .await
            .unwrap();
        assert!(result.used_llm);
    }

    /// spec §4.5 phase 2: a note with no symptom/diagnosis/procedure
    /// vocabulary triggers the LLM rewrite regardless of completeness.
    #[tokio::test]
    async fn missing_clinical_context_triggers_rewrite_despite_high_completeness() {
        let mut facts = NoteFacts::default();
        facts.duration_min = Some(20);
        facts.duration_max = Some(20);
        facts.age = Some(65);
        facts.modality = Some(mbs_core::Modality::InPerson);
        assert!(completeness_score(&facts) >= REFLECTION_THRESHOLD);

        let result = reflect("20 minutes, 65yo, in person", &facts, &[], &NoOpQueryRewriter).await.unwrap();
        assert!(result.used_llm);
    }
}
