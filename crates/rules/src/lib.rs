//! Rule Parser — spec §4.1.
//!
//! A pure, deterministic, idempotent function from a catalog item's
//! `(code, description, metadata)` to a structured [`ItemRule`]. No I/O, no
//! async — grounded in the teacher's static-dictionary / pattern-table style
//! (`voice-agent-rag::query_expansion`, `::domain_boost`), but expressed as
//! one-shot parsing rather than a runtime-mutable dictionary, since an
//! `ItemRule` is derived once per retrieved candidate and never mutated.

use std::collections::BTreeSet;

use mbs_core::{AgeRange, Condition, ConditionKind, Interval, ItemFlags, ItemRule, Modality, Setting};
use once_cell::sync::Lazy;
use regex::Regex;

/// Structured duration hints already present on a catalog record, which
/// take priority over anything the textual parser would infer (spec §4.1:
/// "prefer structured metadata if present").
#[derive(Debug, Clone, Default)]
pub struct DurationMetadata {
    pub duration_min_minutes: Option<i32>,
    pub duration_max_minutes: Option<i32>,
    pub duration_min_inclusive: Option<bool>,
    pub duration_max_inclusive: Option<bool>,
}

/// Parse a structured [`ItemRule`] from a catalog item's free-text
/// description. `group`/`subgroup` are catalog taxonomy fields carried
/// straight through. `duration_meta` overrides the textual time-window
/// parse when any field of it is set.
pub fn parse_item_rule(
    code: &str,
    description: &str,
    group: Option<&str>,
    subgroup: Option<&str>,
    duration_meta: &DurationMetadata,
) -> ItemRule {
    let lower = description.to_lowercase();
    let mut evidence = Vec::new();

    let time_window = parse_time_window(&lower, duration_meta, &mut evidence);
    let age_range = parse_age_range(&lower, &mut evidence);
    let setting_allowed = parse_setting(&lower, &mut evidence);
    let modality_allowed = parse_modality(&lower, &mut evidence);
    let specialty_required = parse_specialty(&lower, &mut evidence);
    let referral_required = parse_referral(&lower, &mut evidence);
    let first_or_review = parse_first_or_review(&lower, &mut evidence);
    let conditions = parse_conditions(&lower, &mut evidence);
    let flags = parse_flags(&lower, &mut evidence);

    ItemRule {
        code: code.to_string(),
        group: group.map(str::to_string),
        subgroup: subgroup.map(str::to_string),
        description: description.to_string(),
        time_window,
        age_range,
        setting_allowed,
        modality_allowed: Some(modality_allowed),
        specialty_required,
        referral_required,
        first_or_review,
        conditions,
        flags,
        evidence_spans: evidence,
        confidence: 0.7,
    }
}

static TIME_AT_LEAST_AND_LESS_THAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"at least (\d+)\s*(?:min|minutes?)?\s*and less than (\d+)\s*min").unwrap()
});
static TIME_AT_LEAST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:at least|>=|≥)\s*(\d+)\s*min").unwrap());
static TIME_LESS_THAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:less than|<)\s*(\d+)\s*min").unwrap());

fn parse_time_window(lower: &str, meta: &DurationMetadata, evidence: &mut Vec<String>) -> Option<Interval> {
    if meta.duration_min_minutes.is_some() || meta.duration_max_minutes.is_some() {
        evidence.push("structured duration metadata".to_string());
        return Some(Interval {
            min: meta.duration_min_minutes,
            max: meta.duration_max_minutes,
            left_closed: meta.duration_min_inclusive.unwrap_or(true),
            right_closed: meta.duration_max_inclusive.unwrap_or(false),
        });
    }

    if let Some(cap) = TIME_AT_LEAST_AND_LESS_THAN.captures(lower) {
        evidence.push(cap[0].to_string());
        let min: i32 = cap[1].parse().ok()?;
        let max: i32 = cap[2].parse().ok()?;
        return Some(Interval::left_closed_right_open(min, max));
    }
    if let Some(cap) = TIME_AT_LEAST.captures(lower) {
        evidence.push(cap[0].to_string());
        let min: i32 = cap[1].parse().ok()?;
        return Some(Interval::at_least(min));
    }
    if let Some(cap) = TIME_LESS_THAN.captures(lower) {
        evidence.push(cap[0].to_string());
        let max: i32 = cap[1].parse().ok()?;
        return Some(Interval::less_than(max));
    }
    None
}

static AGE_AT_LEAST_AND_LESS_THAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"aged at least (\d+)\s*(?:years?)? and less than (\d+)\s*years?").unwrap());
static AGE_BETWEEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"aged between (\d+)\s*(?:and|-)\s*(\d+)\s*years?").unwrap());
static AGE_OR_MORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"aged (\d+)\s*years?\s*or more").unwrap());
static AGE_LESS_THAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"aged less than (\d+)\s*years?").unwrap());

fn parse_age_range(lower: &str, evidence: &mut Vec<String>) -> Option<AgeRange> {
    if let Some(cap) = AGE_AT_LEAST_AND_LESS_THAN.captures(lower) {
        evidence.push(cap[0].to_string());
        return Some(AgeRange {
            min: cap[1].parse().ok(),
            max: cap[2].parse().ok(),
            left_closed: true,
            right_closed: false,
        });
    }
    if let Some(cap) = AGE_BETWEEN.captures(lower) {
        evidence.push(cap[0].to_string());
        return Some(AgeRange {
            min: cap[1].parse().ok(),
            max: cap[2].parse().ok(),
            left_closed: true,
            right_closed: false,
        });
    }
    if let Some(cap) = AGE_OR_MORE.captures(lower) {
        evidence.push(cap[0].to_string());
        return Some(AgeRange { min: cap[1].parse().ok(), max: None, left_closed: true, right_closed: false });
    }
    if let Some(cap) = AGE_LESS_THAN.captures(lower) {
        evidence.push(cap[0].to_string());
        return Some(AgeRange { min: None, max: cap[1].parse().ok(), left_closed: true, right_closed: false });
    }
    None
}

fn parse_setting(lower: &str, evidence: &mut Vec<String>) -> Option<BTreeSet<Setting>> {
    let mut set = BTreeSet::new();
    if lower.contains("consulting rooms") {
        set.insert(Setting::ConsultingRooms);
        evidence.push("consulting rooms".to_string());
    }
    if lower.contains("hospital") || lower.contains("inpatient") {
        set.insert(Setting::Hospital);
        evidence.push("hospital/inpatient".to_string());
    }
    if lower.contains("residential care") || lower.contains("residential aged care") {
        set.insert(Setting::ResidentialCare);
        evidence.push("residential (aged) care".to_string());
    }
    if set.is_empty() { None } else { Some(set) }
}

fn parse_modality(lower: &str, evidence: &mut Vec<String>) -> BTreeSet<Modality> {
    let mut set = BTreeSet::new();
    if lower.contains("video") || lower.contains("telehealth") {
        set.insert(Modality::Video);
        evidence.push("video/telehealth".to_string());
    }
    if lower.contains("telephone") || lower.contains("phone") {
        set.insert(Modality::Phone);
        evidence.push("telephone/phone".to_string());
    }
    if set.is_empty() {
        set.insert(Modality::InPerson);
    }
    set
}

fn parse_specialty(lower: &str, evidence: &mut Vec<String>) -> Option<String> {
    if lower.contains("general practitioner") {
        evidence.push("general practitioner".to_string());
        return Some("gp".to_string());
    }
    if lower.contains("sexual health medicine specialist") {
        evidence.push("sexual health medicine specialist".to_string());
        return Some("sexual health medicine".to_string());
    }
    if lower.contains("consultant physician") {
        evidence.push("consultant physician".to_string());
        return Some("consultant physician".to_string());
    }
    if lower.contains("psychiatrist") {
        evidence.push("psychiatrist".to_string());
        return Some("psychiatry".to_string());
    }
    None
}

fn parse_referral(lower: &str, evidence: &mut Vec<String>) -> Option<bool> {
    if lower.contains("referral") {
        evidence.push("referral".to_string());
        Some(true)
    } else {
        None
    }
}

fn parse_first_or_review(lower: &str, evidence: &mut Vec<String>) -> Option<mbs_core::FirstOrReview> {
    if lower.contains("first attendance") || lower.contains("initial consultation") || lower.contains("initial assessment") {
        evidence.push("first attendance/initial".to_string());
        return Some(mbs_core::FirstOrReview::First);
    }
    if lower.contains("review") {
        evidence.push("review".to_string());
        return Some(mbs_core::FirstOrReview::Review);
    }
    None
}

static RELATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(before or after|follows) (comprehensive|initial|review) assessment under item ([\d,\s]+)").unwrap()
});

fn parse_conditions(lower: &str, evidence: &mut Vec<String>) -> Vec<Condition> {
    let mut out = Vec::new();
    if let Some(cap) = RELATION_RE.captures(lower) {
        evidence.push(cap[0].to_string());
        out.push(Condition {
            kind: ConditionKind::RelationRequired,
            description: cap[0].trim().to_string(),
        });
    }
    out
}

static CASE_CONFERENCE_MIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"at least (\d+) other care providers?").unwrap());

fn parse_flags(lower: &str, evidence: &mut Vec<String>) -> ItemFlags {
    let mut flags = ItemFlags::default();

    if lower.contains("case conference") || lower.contains("multidisciplinary") {
        flags.case_conference = Some(true);
        evidence.push("case conference/multidisciplinary".to_string());
    }
    if let Some(cap) = CASE_CONFERENCE_MIN_RE.captures(lower) {
        let k: u32 = cap[1].parse().unwrap_or(0);
        flags.case_conference_min = Some(k + 1);
        evidence.push(cap[0].to_string());
    }
    if lower.contains("usual gp") || lower.contains("usual medical practitioner") {
        flags.usual_gp_required = Some(true);
        evidence.push("usual gp/usual medical practitioner".to_string());
    }
    if lower.contains("home visit") || lower.contains("attendance at home") {
        flags.home_only = Some(true);
        evidence.push("home visit/attendance at home".to_string());
    }
    if lower.contains("gp referral") || lower.contains("referring practitioner") {
        flags.referral_gp = Some(true);
        evidence.push("gp referral/referring practitioner".to_string());
    }
    if lower.contains("specialist referral") {
        flags.referral_specialist = Some(true);
        evidence.push("specialist referral".to_string());
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_at_least_and_less_than_time_window() {
        let rule = parse_item_rule(
            "23",
            "Professional attendance, at least 20 min and less than 40 min",
            Some("A1"),
            None,
            &DurationMetadata::default(),
        );
        let tw = rule.time_window.unwrap();
        assert_eq!(tw.min, Some(20));
        assert_eq!(tw.max, Some(40));
        assert!(tw.left_closed);
        assert!(!tw.right_closed);
    }

    #[test]
    fn structured_metadata_overrides_text() {
        let meta = DurationMetadata {
            duration_min_minutes: Some(5),
            duration_max_minutes: Some(10),
            duration_min_inclusive: Some(true),
            duration_max_inclusive: Some(true),
        };
        let rule = parse_item_rule(
            "36",
            "at least 20 min and less than 40 min",
            None,
            None,
            &meta,
        );
        let tw = rule.time_window.unwrap();
        assert_eq!(tw.min, Some(5));
        assert_eq!(tw.max, Some(10));
    }

    #[test]
    fn parses_age_range_or_more() {
        let rule = parse_item_rule("705", "Health assessment for a patient aged 75 years or more", None, None, &DurationMetadata::default());
        let age = rule.age_range.unwrap();
        assert_eq!(age.min, Some(75));
        assert_eq!(age.max, None);
    }

    #[test]
    fn parses_video_modality() {
        let rule = parse_item_rule("91800", "Video attendance by a general practitioner", None, None, &DurationMetadata::default());
        assert_eq!(rule.specialty_required.as_deref(), Some("gp"));
        assert!(rule.modality_allowed.unwrap().contains(&Modality::Video));
    }

    #[test]
    fn referral_never_false() {
        let rule = parse_item_rule("104", "Specialist consultation, no mention", None, None, &DurationMetadata::default());
        assert_eq!(rule.referral_required, None);
    }

    #[test]
    fn parses_case_conference_min_participants() {
        let rule = parse_item_rule(
            "allied",
            "Case conference organised by a GP with at least 2 other care providers",
            None,
            None,
            &DurationMetadata::default(),
        );
        assert_eq!(rule.flags.case_conference, Some(true));
        assert_eq!(rule.flags.case_conference_min, Some(3));
    }

    #[test]
    fn parses_relation_condition_never_blocks() {
        let rule = parse_item_rule(
            "139",
            "This item follows comprehensive assessment under item 701",
            None,
            None,
            &DurationMetadata::default(),
        );
        assert_eq!(rule.conditions.len(), 1);
    }

    #[test]
    fn unmatched_description_yields_permissive_fields() {
        let rule = parse_item_rule("1", "Unremarkable free text with no patterns", None, None, &DurationMetadata::default());
        assert!(rule.time_window.is_none());
        assert!(rule.age_range.is_none());
        assert!(rule.setting_allowed.is_none());
        assert_eq!(rule.confidence, 0.7);
    }
}
