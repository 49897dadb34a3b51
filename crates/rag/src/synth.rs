//! Verified answer synthesis — spec §4.3 step 6 / §4.4.
//!
//! Turns a ranked `Document` list (catalog metadata attached) into
//! `VerifiedItem`s: parse an `ItemRule` from the record, run every
//! deterministic check against the note's extracted facts, and drop any
//! code already on the banned list.

use std::collections::BTreeSet;

use mbs_core::{NoteFacts, VerifiedItem};
use mbs_rules::{parse_item_rule, DurationMetadata};

/// Build one verified candidate from a retrieved `Document`. Returns `None`
/// if `document.id` is already banned — callers should filter before
/// calling this so banned retrievals never even reach rule parsing, but the
/// check is repeated here as a last line of defense (spec §3 invariant:
/// banned codes never resurface in `accepted`).
pub fn synthesize(document: &mbs_core::Document, facts: &NoteFacts, banned_codes: &BTreeSet<String>) -> Option<VerifiedItem> {
    if banned_codes.contains(&document.id) {
        return None;
    }

    let group = document.meta_str("group").map(str::to_string);
    let subgroup = document.meta_str("subgroup").map(str::to_string);
    let duration_meta = DurationMetadata {
        duration_min_minutes: document.metadata.get("duration_min_minutes").and_then(|v| v.as_i64()).map(|v| v as i32),
        duration_max_minutes: document.metadata.get("duration_max_minutes").and_then(|v| v.as_i64()).map(|v| v as i32),
        duration_min_inclusive: document.metadata.get("duration_min_inclusive").and_then(|v| v.as_bool()),
        duration_max_inclusive: document.metadata.get("duration_max_inclusive").and_then(|v| v.as_bool()),
    };

    let rule = parse_item_rule(&document.id, &document.content, group.as_deref(), subgroup.as_deref(), &duration_meta);
    let report = mbs_verify::verify_item(&rule, facts);

    Some(VerifiedItem {
        code: document.id.clone(),
        display: document.content.clone(),
        fee: document.metadata.get("schedule_fee").and_then(|v| v.as_f64()),
        score: Some(document.score),
        verify: Some(report),
        group,
        match_reason: None,
    })
}

/// Synthesize every document in the ranked list, skipping banned codes.
pub fn synthesize_all(documents: &[mbs_core::Document], facts: &NoteFacts, banned_codes: &BTreeSet<String>) -> Vec<VerifiedItem> {
    documents.iter().filter_map(|doc| synthesize(doc, facts, banned_codes)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_core::Document;

    #[test]
    fn banned_code_yields_no_candidate() {
        let doc = Document::new("23", "Professional attendance", 0.9);
        let facts = NoteFacts::default();
        let mut banned = BTreeSet::new();
        banned.insert("23".to_string());
        assert!(synthesize(&doc, &facts, &banned).is_none());
    }

    #[test]
    fn synthesizes_verified_item_with_rule_and_report() {
        let doc = Document::new("23", "Professional attendance, at least 20 min and less than 40 min", 0.8)
            .with_metadata("group", "A1")
            .with_metadata("schedule_fee", 75.0);
        let facts = NoteFacts { duration_min: Some(25), duration_max: Some(25), ..Default::default() };
        let item = synthesize(&doc, &facts, &BTreeSet::new()).unwrap();
        assert_eq!(item.code, "23");
        assert_eq!(item.fee, Some(75.0));
        assert!(item.verify.unwrap().passes);
    }
}
