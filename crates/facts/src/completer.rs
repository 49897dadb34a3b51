//! Optional LLM completion of fields the heuristics left unknown.
//!
//! Grounded on the teacher's `LlmBackend`/`PromptBuilder` seam
//! (`voice-agent-llm::backend`): a narrow async trait the agent crate wires
//! to a concrete backend, kept here only as the interface the Fact Extractor
//! depends on, so `mbs-facts` itself stays free of any HTTP client.

use async_trait::async_trait;
use mbs_core::{NoteFacts, Result};

/// Completes the fields an LLM can reasonably infer from a note when the
/// heuristic pass (`extract_facts`) left them `None`. Implementations are
/// expected to run the model at temperature 0 against a JSON-schema
/// constrained prompt (spec §4.2) and never invent a duration/age — only
/// modality, setting, first/review, referral, specialty and category flags
/// are reasonable completion targets.
#[async_trait]
pub trait FactCompleter: Send + Sync {
    async fn complete(&self, note: &str, partial: &NoteFacts) -> Result<NoteFacts>;
}

/// A completer that never calls out — used when no LLM backend is
/// configured, or in tests. Returns `partial` unchanged.
pub struct NoOpFactCompleter;

#[async_trait]
impl FactCompleter for NoOpFactCompleter {
    async fn complete(&self, _note: &str, partial: &NoteFacts) -> Result<NoteFacts> {
        Ok(partial.clone())
    }
}

/// Merge a completer's output into the heuristic-derived facts. The
/// heuristic pass always wins field-by-field; the completer may only fill
/// in fields the heuristics left `None`/empty (spec §4.2 invariant).
pub fn merge_facts(heuristic: NoteFacts, completed: NoteFacts) -> NoteFacts {
    NoteFacts {
        duration_min: heuristic.duration_min.or(completed.duration_min),
        duration_max: heuristic.duration_max.or(completed.duration_max),
        duration_min_inclusive: if heuristic.duration_min.is_some() {
            heuristic.duration_min_inclusive
        } else {
            completed.duration_min_inclusive
        },
        duration_max_inclusive: if heuristic.duration_max.is_some() {
            heuristic.duration_max_inclusive
        } else {
            completed.duration_max_inclusive
        },
        age: heuristic.age.or(completed.age),
        modality: heuristic.modality.or(completed.modality),
        setting: heuristic.setting.or(completed.setting),
        first_or_review: heuristic.first_or_review.or(completed.first_or_review),
        referral_present: heuristic.referral_present.or(completed.referral_present),
        specialty: heuristic.specialty.or(completed.specialty),
        is_gp: heuristic.is_gp.or(completed.is_gp),
        is_specialist: heuristic.is_specialist.or(completed.is_specialist),
        is_emergency: heuristic.is_emergency.or(completed.is_emergency),
        keywords: heuristic.keywords.into_iter().chain(completed.keywords).collect(),
    }
}

/// Run the heuristic pass, then conditionally complete via `completer` only
/// when at least one field of interest is still unknown — avoids a wasted
/// LLM round-trip when the note was fully determined heuristically (spec
/// §4.2: "the completer is only invoked when fields remain unknown").
pub async fn extract_with_completion(
    note: &str,
    completer: &dyn FactCompleter,
) -> Result<NoteFacts> {
    let heuristic = crate::extract::extract_facts(note);
    if facts_fully_known(&heuristic) {
        return Ok(heuristic);
    }
    let completed = completer.complete(note, &heuristic).await?;
    Ok(merge_facts(heuristic, completed))
}

/// Spec §4.2: the completer is invoked "only if any of `{duration_min,
/// modality, setting, age, inclusivity booleans}` are missing after
/// heuristics." `duration_min_inclusive`/`duration_max_inclusive` have no
/// separate unknown state in this representation — `extract_duration` only
/// ever sets them alongside `duration_min`/`duration_max` — so `duration_min`
/// being known implies they are too.
fn facts_fully_known(facts: &NoteFacts) -> bool {
    facts.duration_min.is_some() && facts.age.is_some() && facts.modality.is_some() && facts.setting.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_op_completer_leaves_facts_unchanged() {
        let facts = crate::extract::extract_facts("35 minute consultation");
        let result = extract_with_completion("35 minute consultation", &NoOpFactCompleter).await.unwrap();
        assert_eq!(result.duration_min, facts.duration_min);
    }

    struct FillsAge;

    #[async_trait]
    impl FactCompleter for FillsAge {
        async fn complete(&self, _note: &str, partial: &NoteFacts) -> Result<NoteFacts> {
            let mut filled = partial.clone();
            filled.age = Some(52);
            Ok(filled)
        }
    }

    #[tokio::test]
    async fn completer_runs_when_only_duration_and_age_are_missing() {
        let note = "telehealth video consult, follow up, in consulting rooms, referred by GP, gp attendance";
        let heuristic = crate::extract::extract_facts(note);
        assert!(heuristic.modality.is_some());
        assert!(heuristic.setting.is_some());
        assert!(heuristic.duration_min.is_none());
        assert!(heuristic.age.is_none());

        let result = extract_with_completion(note, &FillsAge).await.unwrap();
        assert_eq!(result.age, Some(52));
    }

    #[test]
    fn merge_prefers_heuristic_on_conflict() {
        let mut heuristic = NoteFacts::default();
        heuristic.age = Some(65);
        let mut completed = NoteFacts::default();
        completed.age = Some(40);
        completed.specialty = Some("cardiology".to_string());

        let merged = merge_facts(heuristic, completed);
        assert_eq!(merged.age, Some(65));
        assert_eq!(merged.specialty.as_deref(), Some("cardiology"));
    }
}
