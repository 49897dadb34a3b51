//! Completeness scoring and abbreviation expansion — spec §4.5.
//!
//! Grounded on the teacher's `QueryExpander` (`voice-agent-rag::query_expansion`):
//! a static synonym dictionary consulted per query term. Here the dictionary
//! is clinical abbreviations rather than Hindi/Hinglish transliterations,
//! and expansion feeds a retrieval query string instead of a weighted term
//! list, since the downstream retriever (`mbs-rag`) re-embeds the whole
//! enhanced query rather than scoring individual terms.

use mbs_core::NoteFacts;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("mi", "myocardial infarction"),
        ("copd", "chronic obstructive pulmonary disease"),
        ("dm", "diabetes mellitus"),
        ("htn", "hypertension"),
        ("af", "atrial fibrillation"),
        ("dvt", "deep vein thrombosis"),
        ("pe", "pulmonary embolism"),
    ]
    .into_iter()
    .collect()
});

/// Score how much of the evidence the Verifier will need is already known,
/// starting from a baseline of 0.6 and crediting each known field (spec
/// §4.5): duration, age, modality, setting, first/review and referral each
/// add a fixed increment, capped at 1.0.
pub fn completeness_score(facts: &NoteFacts) -> f32 {
    let mut score: f32 = 0.6;
    let increment = 0.08;

    if facts.duration_interval().is_some() {
        score += increment;
    }
    if facts.age.is_some() {
        score += increment;
    }
    if facts.modality.is_some() {
        score += increment;
    }
    if facts.setting.is_some() {
        score += increment;
    }
    if facts.first_or_review.is_some() {
        score += increment;
    }
    if facts.referral_present.is_some() {
        score += increment;
    }

    score.min(1.0)
}

/// Clinical symptom/diagnosis/procedure vocabulary used to flag a note as
/// lacking clinical context (spec §4.5 phase 1: "flag missing clinical
/// context when no symptom/diagnosis/procedure vocabulary is present").
const CLINICAL_CONTEXT_VOCAB: &[&str] = &[
    "pain", "ache", "fracture", "injury", "wound", "infection", "assessment",
    "examination", "review", "consultation", "attendance", "diagnosis",
    "symptom", "disease", "condition", "treatment", "surgery", "procedure",
    "follow-up", "follow up", "management", "presentation", "complaint",
];

/// Spec §4.5 phase 1: detect common clinical abbreviations in the raw note
/// and mark "needs LLM" — independent of the heuristic completeness score,
/// since an abbreviation like "copd" is evidence the note needs expert
/// normalisation even when every structured field already resolved.
pub fn has_abbreviation_needing_llm(note: &str) -> bool {
    note.split(|c: char| !c.is_alphanumeric())
        .any(|token| ABBREVIATIONS.contains_key(token.to_lowercase().as_str()))
}

/// Spec §4.5 phase 1: "flag missing clinical context when no
/// symptom/diagnosis/procedure vocabulary is present" in the raw note.
pub fn missing_clinical_context(note: &str) -> bool {
    let lower = note.to_lowercase();
    !CLINICAL_CONTEXT_VOCAB.iter().any(|term| lower.contains(term))
}

/// Expand recognised clinical abbreviations in `query` with their full
/// forms, appended in parentheses so the original term is still present
/// for exact-match lexical search.
pub fn expand_abbreviations(query: &str) -> String {
    let mut expansions = Vec::new();
    for token in query.split(|c: char| !c.is_alphanumeric()) {
        let lower = token.to_lowercase();
        if let Some(expansion) = ABBREVIATIONS.get(lower.as_str()) {
            if !query.to_lowercase().contains(expansion) {
                expansions.push(*expansion);
            }
        }
    }
    if expansions.is_empty() {
        query.to_string()
    } else {
        format!("{query} ({})", expansions.join(", "))
    }
}

/// Synthesize the advisory `key_constraints` list surfaced to callers (spec
/// §4.5): a short human-readable summary of what is and isn't known yet.
pub fn key_constraints(facts: &NoteFacts) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(interval) = facts.duration_interval() {
        out.push(format!(
            "duration {}{},{}{}",
            if interval.left_closed { "[" } else { "(" },
            interval.min.map(|v| v.to_string()).unwrap_or_default(),
            interval.max.map(|v| v.to_string()).unwrap_or_default(),
            if interval.right_closed { "]" } else { ")" },
        ));
    }
    if let Some(age) = facts.age {
        out.push(format!("age {age}"));
    }
    if let Some(modality) = facts.modality {
        out.push(format!("modality {modality:?}").to_lowercase());
    }
    if let Some(setting) = facts.setting {
        out.push(format!("setting {setting:?}").to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_core::Modality;

    #[test]
    fn baseline_score_for_empty_facts() {
        assert_eq!(completeness_score(&NoteFacts::default()), 0.6);
    }

    #[test]
    fn score_increases_with_known_fields_and_caps_at_one() {
        let mut facts = NoteFacts::default();
        facts.duration_min = Some(20);
        facts.duration_max = Some(20);
        facts.age = Some(65);
        facts.modality = Some(Modality::InPerson);
        facts.setting = Some(mbs_core::Setting::ConsultingRooms);
        facts.first_or_review = Some(mbs_core::FirstOrReview::Review);
        facts.referral_present = Some(true);
        let score = completeness_score(&facts);
        assert!((score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn expands_known_abbreviation() {
        let expanded = expand_abbreviations("patient with copd exacerbation");
        assert!(expanded.contains("chronic obstructive pulmonary disease"));
    }

    #[test]
    fn leaves_query_unchanged_when_no_abbreviation_present() {
        let expanded = expand_abbreviations("routine consultation");
        assert_eq!(expanded, "routine consultation");
    }

    #[test]
    fn flags_abbreviation_needing_llm() {
        assert!(has_abbreviation_needing_llm("patient has copd and htn"));
        assert!(!has_abbreviation_needing_llm("routine check with no acronyms"));
    }

    #[test]
    fn flags_missing_clinical_context() {
        assert!(missing_clinical_context("patient seen today for 20 minutes"));
        assert!(!missing_clinical_context("review of chest pain and wound infection"));
    }
}
