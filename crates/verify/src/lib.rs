//! Verifier — spec §4.4.
//!
//! Runs a candidate's [`ItemRule`] against the note's [`NoteFacts`] through a
//! fixed table of tri-state checks and assembles a [`VerifyReport`]. Pure
//! and deterministic — no I/O, no async, safe to call inline in the agent's
//! verify node or from a batch job.

pub mod checks;

use mbs_core::{CheckRecord, ItemCategory, ItemRule, NoteFacts, VerifyReport};

/// Run every check in the fixed table (spec §4.4) and render the report.
pub fn verify_item(rule: &ItemRule, facts: &NoteFacts) -> VerifyReport {
    let mut records: Vec<CheckRecord> = Vec::new();

    records.push(checks::time_window(rule, facts).into_record("time_window"));
    records.push(checks::age(rule, facts).into_record("age"));
    records.push(checks::modality(rule, facts).into_record("modality"));
    records.push(checks::setting(rule, facts).into_record("setting"));
    records.push(checks::first_or_review(rule, facts).into_record("first_or_review"));
    records.push(checks::referral(rule, facts).into_record("referral"));
    records.push(checks::specialty(rule, facts).into_record("specialty"));

    for (i, outcome) in checks::conditions(rule).into_iter().enumerate() {
        records.push(outcome.into_record(format!("condition_{i}")));
    }

    records.push(checks::category_consistency(rule, facts).into_record("category_consistency"));

    for (i, outcome) in checks::flags(rule, facts).into_iter().enumerate() {
        records.push(outcome.into_record(format!("flag_{i}")));
    }

    if let Some(outcome) = checks::keyword_refine(rule, facts) {
        records.push(outcome.into_record("keyword_refine"));
    }

    let category = ItemCategory::from_group_subgroup(rule.group.as_deref(), rule.subgroup.as_deref());
    let categories = vec![format!("{category:?}").to_lowercase()];

    VerifyReport::from_checks(rule.code.clone(), records, categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_core::{Interval, Modality};

    #[test]
    fn fully_permissive_rule_passes_everything() {
        let rule = ItemRule::permissive("23");
        let facts = NoteFacts::default();
        let report = verify_item(&rule, &facts);
        assert!(report.passes);
    }

    #[test]
    fn outside_duration_fails_overall() {
        let mut rule = ItemRule::permissive("23");
        rule.time_window = Some(Interval::left_closed_right_open(20, 40));
        let mut facts = NoteFacts::default();
        facts.duration_min = Some(5);
        facts.duration_max = Some(5);
        facts.duration_min_inclusive = true;
        facts.duration_max_inclusive = true;
        let report = verify_item(&rule, &facts);
        assert!(!report.passes);
        assert!(report.rationale_markdown.starts_with("❌"));
    }

    #[test]
    fn missing_evidence_is_soft_not_fail() {
        let mut rule = ItemRule::permissive("91800");
        rule.modality_allowed = Some([Modality::Video].into_iter().collect());
        rule.age_range = Some(mbs_core::AgeRange { min: Some(18), max: None, left_closed: true, right_closed: false });
        let mut facts = NoteFacts::default();
        facts.modality = Some(Modality::Video);
        let report = verify_item(&rule, &facts);
        assert!(report.passes);
        assert!(report.rationale_markdown.starts_with("⚠️"));
    }
}
