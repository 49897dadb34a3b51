//! The individual tri-state checks a candidate item is run through — spec
//! §4.4. Each returns an [`Outcome`]; unknown evidence on the note side is
//! always SOFT, never FAIL — only an explicit, known mismatch may FAIL.

use mbs_core::{ItemCategory, ItemRule, Modality, NoteFacts, Outcome, Setting};

pub fn time_window(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    let Some(window) = &rule.time_window else { return Outcome::Pass };
    let Some(actual) = facts.duration_interval() else {
        return Outcome::Soft("duration not stated in the note".to_string());
    };
    if actual.subset_of(window) {
        Outcome::Pass
    } else if actual.overlaps(window) {
        Outcome::Soft("note duration overlaps the item's time window but is not fully contained".to_string())
    } else {
        Outcome::Fail("note duration falls outside the item's time window".to_string())
    }
}

pub fn age(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    let Some(range) = &rule.age_range else { return Outcome::Pass };
    let Some(actual) = facts.age else {
        return Outcome::Soft("patient age not stated in the note".to_string());
    };
    if range.contains(actual) {
        Outcome::Pass
    } else {
        Outcome::Fail(format!("patient age {actual} is outside the item's required age range"))
    }
}

/// spec §4.4 check 3. FAIL is reserved for the clear conflict — an
/// in-person-only rule against a note that explicitly states a video or
/// phone consult. Every other mismatch is SOFT: the default `in_person`
/// modality is weak evidence, not an explicit claim.
pub fn modality(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    let Some(allowed) = &rule.modality_allowed else { return Outcome::Pass };
    let effective = facts.effective_modality();
    if allowed.contains(&effective) {
        return Outcome::Pass;
    }

    let in_person_only = allowed.len() == 1 && allowed.contains(&Modality::InPerson);
    if in_person_only && matches!(facts.modality, Some(Modality::Video) | Some(Modality::Phone)) {
        return Outcome::Fail(
            "item requires an in-person attendance but the note describes a video or phone consult".to_string(),
        );
    }

    if allowed.len() == 1 && allowed.contains(&Modality::Video) {
        return Outcome::Soft("item is telehealth-only but the note does not mention telehealth".to_string());
    }
    if allowed.len() == 1 && allowed.contains(&Modality::Phone) {
        return Outcome::Soft("item is phone-only but the note does not mention a phone consult".to_string());
    }
    Outcome::Soft("modality not specified in the note".to_string())
}

/// spec §4.4 check 4. A known "formal" setting (hospital / consulting
/// rooms) that the rule forbids is a clear conflict and FAILs; an unknown
/// setting only FAILs if the raw keyword evidence is itself incompatible
/// with a hospital/consulting-rooms-only rule. Everything softer is SOFT.
pub fn setting(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    let Some(allowed) = &rule.setting_allowed else { return Outcome::Pass };

    let formal_only = !allowed.is_empty()
        && allowed
            .iter()
            .all(|s| matches!(s, Setting::Hospital | Setting::ConsultingRooms));

    match facts.setting {
        None | Some(Setting::Other) => {
            let remote_or_home_evidence = matches!(facts.modality, Some(Modality::Video) | Some(Modality::Phone))
                || facts.has_keyword("telehealth")
                || facts.has_keyword("remote")
                || facts.has_keyword("home");
            if formal_only && remote_or_home_evidence {
                Outcome::Fail(
                    "note evidence points to a remote or home attendance, incompatible with the item's hospital/consulting-rooms requirement".to_string(),
                )
            } else {
                Outcome::Soft(format!(
                    "attendance setting not stated in the note; item requires one of {:?}",
                    allowed
                ))
            }
        }
        Some(actual) => {
            if allowed.contains(&actual) {
                Outcome::Pass
            } else if matches!(actual, Setting::Hospital | Setting::ConsultingRooms) {
                Outcome::Fail("note setting is a formal attendance the item does not permit".to_string())
            } else {
                Outcome::Soft("note setting is not one the item permits, but the mismatch is not a formal-attendance conflict".to_string())
            }
        }
    }
}

pub fn first_or_review(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    let Some(required) = rule.first_or_review else { return Outcome::Pass };
    let Some(actual) = facts.first_or_review else {
        return Outcome::Soft("first-attendance vs review status not stated in the note".to_string());
    };
    if actual == required {
        Outcome::Pass
    } else {
        Outcome::Fail("note indicates the opposite of the item's first/review requirement".to_string())
    }
}

pub fn referral(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    if rule.referral_required != Some(true) {
        return Outcome::Pass;
    }
    match facts.referral_present {
        None => Outcome::Soft("referral required by the item but not mentioned in the note".to_string()),
        Some(true) => Outcome::Pass,
        Some(false) => Outcome::Fail("item requires a referral and the note states there is none".to_string()),
    }
}

pub fn specialty(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    let Some(required) = &rule.specialty_required else { return Outcome::Pass };
    let Some(actual) = &facts.specialty else {
        return Outcome::Soft("attending specialty not stated in the note".to_string());
    };
    if actual.eq_ignore_ascii_case(required) {
        Outcome::Pass
    } else {
        Outcome::Fail(format!("note specialty \"{actual}\" does not match item requirement \"{required}\""))
    }
}

/// Non-blocking sequence relations (spec §4.1/§4.4): always SOFT, a
/// reminder, never a gate.
pub fn conditions(rule: &ItemRule) -> Vec<Outcome> {
    rule.conditions
        .iter()
        .map(|c| Outcome::Soft(format!("sequence relation to confirm: {}", c.description)))
        .collect()
}

/// Category-driven consistency check (spec §4.4 check 9): category absent
/// (the item's group/subgroup maps to none of GP/Specialist/Emergency) is
/// PASS; unknown note context is SOFT; an explicit conflict (the note
/// states the opposite context) is FAIL; alignment is PASS.
pub fn category_consistency(rule: &ItemRule, facts: &NoteFacts) -> Outcome {
    let category = ItemCategory::from_group_subgroup(rule.group.as_deref(), rule.subgroup.as_deref());
    match category {
        ItemCategory::Gp => match facts.is_gp {
            None => Outcome::Soft("item is GP-categorised but the note does not state whether this is a GP attendance".to_string()),
            Some(false) => Outcome::Fail("item is GP-categorised but the note indicates a non-GP attendance".to_string()),
            Some(true) => Outcome::Pass,
        },
        ItemCategory::Specialist => match facts.is_specialist {
            None => Outcome::Soft(
                "item is specialist-categorised but the note does not state whether this is a specialist attendance".to_string(),
            ),
            Some(false) => Outcome::Fail("item is specialist-categorised but the note indicates a non-specialist attendance".to_string()),
            Some(true) => Outcome::Pass,
        },
        ItemCategory::Emergency => match facts.is_emergency {
            None => Outcome::Soft(
                "item is emergency-categorised but the note does not state whether this is an emergency presentation".to_string(),
            ),
            Some(false) => Outcome::Fail("item is emergency-categorised but the note indicates a non-emergency presentation".to_string()),
            Some(true) => Outcome::Pass,
        },
        _ => Outcome::Pass,
    }
}

/// The sparse flag checks (spec §4.4 check 10).
pub fn flags(rule: &ItemRule, facts: &NoteFacts) -> Vec<Outcome> {
    let mut out = Vec::new();
    let flags = &rule.flags;

    if flags.case_conference == Some(true) {
        if let Some(min) = flags.case_conference_min {
            let documented = facts.role_noun_count() as u32 + 1; // the organising clinician themselves
            if documented >= min {
                out.push(Outcome::Pass);
            } else {
                out.push(Outcome::Soft(format!(
                    "case conference requires at least {min} care providers; note documents {documented}"
                )));
            }
        } else {
            out.push(Outcome::Soft("item requires a case conference — confirm participants against the note".to_string()));
        }
    }

    if flags.usual_gp_required == Some(true) {
        out.push(Outcome::Soft("item requires the usual GP — not verifiable from note text alone".to_string()));
    }

    if flags.home_only == Some(true) {
        match facts.setting {
            Some(mbs_core::Setting::Home) => out.push(Outcome::Pass),
            Some(_) => out.push(Outcome::Fail("item requires a home visit but the note states a different setting".to_string())),
            None => out.push(Outcome::Soft("item requires a home visit — setting not stated in the note".to_string())),
        }
    }

    if flags.referral_gp == Some(true) || flags.referral_specialist == Some(true) {
        match facts.referral_present {
            Some(true) => out.push(Outcome::Pass),
            Some(false) => out.push(Outcome::Fail("item requires a referral and the note states there is none".to_string())),
            None => out.push(Outcome::Soft("item requires a referral of a specific type — not confirmed by the note".to_string())),
        }
    }

    out
}

/// Category/title-sensitive advisory gate — never FAILs (spec §4.4 check
/// 11). Scans the rule's own description text ("title") for a handful of
/// modality-specific cues the structured fields don't otherwise capture.
pub fn keyword_refine(rule: &ItemRule, facts: &NoteFacts) -> Option<Outcome> {
    let title = rule.description.to_lowercase();
    let category = ItemCategory::from_group_subgroup(rule.group.as_deref(), rule.subgroup.as_deref());

    if category == ItemCategory::Surgery && !facts.has_keyword("surgery") {
        return Some(Outcome::Soft("surgery/anaesthesia not mentioned in the note".to_string()));
    }

    if title.contains("ct") && title.contains("contrast") && !facts.has_keyword("contrast") {
        return Some(Outcome::Soft("item specifies contrast but the note does not mention contrast".to_string()));
    }

    if title.contains("ct") && !title.contains("contrast") {
        let body_region_mentioned = BODY_REGIONS.iter().any(|r| title.contains(r) && facts_mentions(facts, r));
        if body_region_mentioned {
            return Some(Outcome::Pass);
        }
    }

    if title.contains("ultrasound") && !facts.has_keyword("ultrasound") {
        return Some(Outcome::Soft("item is an ultrasound study but the note does not mention ultrasound".to_string()));
    }

    Some(Outcome::Pass)
}

const BODY_REGIONS: &[&str] = &[
    "chest", "abdomen", "pelvis", "head", "neck", "spine", "limb", "brain", "thorax",
];

fn facts_mentions(facts: &NoteFacts, region: &str) -> bool {
    facts.has_keyword(region) || facts.keywords.iter().any(|k| k.contains(region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_core::Interval;

    fn base_rule() -> ItemRule {
        ItemRule::permissive("23")
    }

    #[test]
    fn time_window_pass_when_unset() {
        let outcome = time_window(&base_rule(), &NoteFacts::default());
        assert_eq!(outcome, Outcome::Pass);
    }

    #[test]
    fn time_window_soft_when_duration_unknown() {
        let mut rule = base_rule();
        rule.time_window = Some(Interval::left_closed_right_open(20, 40));
        let outcome = time_window(&rule, &NoteFacts::default());
        assert!(matches!(outcome, Outcome::Soft(_)));
    }

    #[test]
    fn time_window_fail_when_outside() {
        let mut rule = base_rule();
        rule.time_window = Some(Interval::left_closed_right_open(20, 40));
        let mut facts = NoteFacts::default();
        facts.duration_min = Some(5);
        facts.duration_max = Some(5);
        facts.duration_min_inclusive = true;
        facts.duration_max_inclusive = true;
        let outcome = time_window(&rule, &facts);
        assert!(matches!(outcome, Outcome::Fail(_)));
    }

    #[test]
    fn referral_never_fails_when_not_required() {
        let outcome = referral(&base_rule(), &NoteFacts::default());
        assert_eq!(outcome, Outcome::Pass);
    }

    #[test]
    fn home_only_fails_on_explicit_mismatch() {
        let mut rule = base_rule();
        rule.flags.home_only = Some(true);
        let mut facts = NoteFacts::default();
        facts.setting = Some(mbs_core::Setting::Hospital);
        let outcomes = flags(&rule, &facts);
        assert!(outcomes.iter().any(|o| matches!(o, Outcome::Fail(_))));
    }

    #[test]
    fn category_consistency_unknown_context_is_soft() {
        let mut rule = base_rule();
        rule.group = Some("A1".to_string());
        let facts = NoteFacts::default();
        let outcome = category_consistency(&rule, &facts);
        assert!(matches!(outcome, Outcome::Soft(_)));
    }

    #[test]
    fn category_consistency_explicit_conflict_fails() {
        let mut rule = base_rule();
        rule.group = Some("A1".to_string());
        let mut facts = NoteFacts::default();
        facts.is_gp = Some(false);
        let outcome = category_consistency(&rule, &facts);
        assert!(matches!(outcome, Outcome::Fail(_)));
    }

    #[test]
    fn category_consistency_aligned_passes() {
        let mut rule = base_rule();
        rule.group = Some("A1".to_string());
        let mut facts = NoteFacts::default();
        facts.is_gp = Some(true);
        let outcome = category_consistency(&rule, &facts);
        assert_eq!(outcome, Outcome::Pass);
    }

    #[test]
    fn category_consistency_unrelated_category_passes() {
        let rule = base_rule();
        let facts = NoteFacts::default();
        let outcome = category_consistency(&rule, &facts);
        assert_eq!(outcome, Outcome::Pass);
    }

    /// spec §8 scenario 3: telehealth-only rule, face-to-face note with no
    /// explicit in-person claim — weak default evidence, so SOFT not FAIL.
    #[test]
    fn modality_telehealth_only_rule_with_default_in_person_is_soft() {
        let mut rule = base_rule();
        rule.modality_allowed = Some([mbs_core::Modality::Video].into_iter().collect());
        let facts = NoteFacts::default();
        let outcome = modality(&rule, &facts);
        assert!(matches!(outcome, Outcome::Soft(_)));
    }

    /// spec §8 scenario 4: explicit video note against an in-person-only
    /// rule is a clear conflict — FAIL.
    #[test]
    fn modality_video_note_against_in_person_only_rule_fails() {
        let mut rule = base_rule();
        rule.modality_allowed = Some([mbs_core::Modality::InPerson].into_iter().collect());
        let mut facts = NoteFacts::default();
        facts.modality = Some(mbs_core::Modality::Video);
        let outcome = modality(&rule, &facts);
        assert!(matches!(outcome, Outcome::Fail(_)));
    }

    #[test]
    fn setting_formal_only_rule_fails_on_explicit_remote_evidence() {
        let mut rule = base_rule();
        rule.setting_allowed = Some([Setting::Hospital].into_iter().collect());
        let mut facts = NoteFacts::default();
        facts.modality = Some(mbs_core::Modality::Video);
        let outcome = setting(&rule, &facts);
        assert!(matches!(outcome, Outcome::Fail(_)));
    }

    #[test]
    fn setting_unknown_without_remote_evidence_is_soft() {
        let mut rule = base_rule();
        rule.setting_allowed = Some([Setting::Hospital].into_iter().collect());
        let facts = NoteFacts::default();
        let outcome = setting(&rule, &facts);
        assert!(matches!(outcome, Outcome::Soft(_)));
    }

    /// spec §8 scenario 5: surgery-grouped item, note with no surgery
    /// keyword — SOFT, never FAIL.
    #[test]
    fn keyword_refine_surgery_category_without_keyword_is_soft() {
        let mut rule = base_rule();
        rule.group = Some("T8".to_string());
        let facts = NoteFacts::default();
        let outcome = keyword_refine(&rule, &facts).unwrap();
        assert!(matches!(outcome, Outcome::Soft(_)));
    }

    #[test]
    fn keyword_refine_ct_with_contrast_missing_keyword_is_soft() {
        let mut rule = base_rule();
        rule.description = "CT scan with contrast of the chest".to_string();
        let facts = NoteFacts::default();
        let outcome = keyword_refine(&rule, &facts).unwrap();
        assert!(matches!(outcome, Outcome::Soft(_)));
    }

    #[test]
    fn keyword_refine_ct_without_contrast_and_body_region_passes() {
        let mut rule = base_rule();
        rule.description = "CT scan of the chest".to_string();
        let mut facts = NoteFacts::default();
        facts.keywords.insert("chest".to_string());
        let outcome = keyword_refine(&rule, &facts).unwrap();
        assert_eq!(outcome, Outcome::Pass);
    }
}
