//! Heuristic fact extraction — spec §4.2.
//!
//! Pure, deterministic, regex-driven. Runs before any LLM completion and
//! always wins over it on a field-by-field basis (spec §4.2 invariant:
//! "heuristics take precedence; the completer only fills gaps").

use std::collections::BTreeSet;

use mbs_core::{FirstOrReview, Modality, NoteFacts, Setting};
use once_cell::sync::Lazy;
use regex::Regex;

const ROLE_NOUNS: &[&str] = &[
    "nurse", "physiotherapist", "psychologist", "social worker", "dietitian",
    "occupational therapist", "pharmacist", "carer", "care coordinator",
    "speech pathologist", "podiatrist",
];

const CLINICAL_ABBREVIATIONS: &[(&str, &str)] = &[
    ("mi", "myocardial infarction"),
    ("copd", "chronic obstructive pulmonary disease"),
    ("dm", "diabetes mellitus"),
    ("htn", "hypertension"),
    ("af", "atrial fibrillation"),
    ("dvt", "deep vein thrombosis"),
    ("pe", "pulmonary embolism"),
];

/// Extract [`NoteFacts`] from a free-text clinical note using fixed-priority
/// heuristics: duration, age, modality, setting, first/review, referral,
/// specialty, category flags, then keywords.
pub fn extract_facts(note: &str) -> NoteFacts {
    let lower = note.to_lowercase();
    let mut facts = NoteFacts::default();

    extract_duration(&lower, &mut facts);
    extract_age(&lower, &mut facts);
    extract_modality(&lower, &mut facts);
    extract_setting(&lower, &mut facts);
    extract_first_or_review(&lower, &mut facts);
    extract_referral(&lower, &mut facts);
    extract_specialty_and_category(&lower, &mut facts);
    extract_keywords(&lower, &mut facts);

    facts
}

static RANGE_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:-|to)\s*(\d+)\s*min(?:ute)?s?").unwrap());
static AT_LEAST_AND_LESS_THAN_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"at least (\d+)\s*(?:min(?:ute)?s?)?\s*and less than (\d+)\s*min(?:ute)?s?").unwrap());
static AT_LEAST_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:at least|more than|over)\s*(\d+)\s*min(?:ute)?s?").unwrap());
static LESS_THAN_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"less than (\d+)\s*min(?:ute)?s?").unwrap());
static TRAILING_PLUS_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\+\s*min(?:ute)?s?").unwrap());
static BARE_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)[\s-]*min(?:ute)?s?").unwrap());

fn extract_duration(lower: &str, facts: &mut NoteFacts) {
    if let Some(cap) = RANGE_MINUTES.captures(lower) {
        facts.duration_min = cap[1].parse().ok();
        facts.duration_max = cap[2].parse().ok();
        facts.duration_min_inclusive = true;
        facts.duration_max_inclusive = true;
        return;
    }
    // "at least A and less than B" must be tried before the bare "at
    // least A" pattern, or the latter matches the prefix and drops the
    // upper bound (spec §4.2 heuristic 4).
    if let Some(cap) = AT_LEAST_AND_LESS_THAN_MINUTES.captures(lower) {
        let min: i32 = match cap[1].parse() {
            Ok(n) => n,
            Err(_) => return,
        };
        let max: i32 = match cap[2].parse() {
            Ok(n) => n,
            Err(_) => return,
        };
        facts.duration_min = Some(min);
        facts.duration_max = Some(max);
        facts.duration_min_inclusive = true;
        facts.duration_max_inclusive = false;
        return;
    }
    if let Some(cap) = AT_LEAST_MINUTES.captures(lower) {
        facts.duration_min = cap[1].parse().ok();
        facts.duration_min_inclusive = lower.contains("at least");
        return;
    }
    // "less than N minutes" states an upper bound only; since the exact
    // duration is otherwise unknown, widen to a 1-minute window just below
    // N rather than leaving it fully unbounded below (spec §9 open question
    // — resolved in favour of this narrower, literal reading).
    if let Some(cap) = LESS_THAN_MINUTES.captures(lower) {
        let n: i32 = match cap[1].parse() {
            Ok(n) => n,
            Err(_) => return,
        };
        facts.duration_min = Some((n - 1).max(0));
        facts.duration_max = Some(n);
        facts.duration_min_inclusive = true;
        facts.duration_max_inclusive = false;
        return;
    }
    // Trailing "N+ min" is an explicit open-ended lower bound, same shape
    // as "at least N min" (spec §4.2 heuristic 8).
    if let Some(cap) = TRAILING_PLUS_MINUTES.captures(lower) {
        facts.duration_min = cap[1].parse().ok();
        facts.duration_min_inclusive = true;
        return;
    }
    // Bare "N min" with no qualifier is taken as an exact duration [N, N]
    // (spec §9 open question — resolved in favour of the literal reading the
    // worked scenarios depend on).
    if let Some(cap) = BARE_MINUTES.captures(lower) {
        let n: i32 = match cap[1].parse() {
            Ok(n) => n,
            Err(_) => return,
        };
        facts.duration_min = Some(n);
        facts.duration_max = Some(n);
        facts.duration_min_inclusive = true;
        facts.duration_max_inclusive = true;
    }
}

static AGE_YO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*(?:yo|y/o|years? old|-year-old)").unwrap());
static AGE_AGED: Lazy<Regex> = Lazy::new(|| Regex::new(r"aged (\d+)").unwrap());

fn extract_age(lower: &str, facts: &mut NoteFacts) {
    if let Some(cap) = AGE_YO.captures(lower) {
        facts.age = cap[1].parse().ok();
        return;
    }
    if let Some(cap) = AGE_AGED.captures(lower) {
        facts.age = cap[1].parse().ok();
    }
}

fn extract_modality(lower: &str, facts: &mut NoteFacts) {
    if lower.contains("telehealth") || lower.contains("video call") || lower.contains("video consult") {
        facts.modality = Some(Modality::Video);
    } else if lower.contains("phone consult") || lower.contains("telephone consult") || lower.contains("phone call") {
        facts.modality = Some(Modality::Phone);
    } else if lower.contains("in person") || lower.contains("in-person") || lower.contains("face to face") {
        facts.modality = Some(Modality::InPerson);
    }
}

fn extract_setting(lower: &str, facts: &mut NoteFacts) {
    if lower.contains("home visit") || lower.contains("attended at home") || lower.contains("patient's home") {
        facts.setting = Some(Setting::Home);
    } else if lower.contains("residential care") || lower.contains("nursing home") || lower.contains("aged care facility") {
        facts.setting = Some(Setting::ResidentialCare);
    } else if lower.contains("hospital") || lower.contains("inpatient") || lower.contains("emergency department") {
        facts.setting = Some(Setting::Hospital);
    } else if lower.contains("clinic") || lower.contains("consulting rooms") || lower.contains("surgery") {
        facts.setting = Some(Setting::ConsultingRooms);
    }
}

fn extract_first_or_review(lower: &str, facts: &mut NoteFacts) {
    if lower.contains("new patient") || lower.contains("initial consult") || lower.contains("first visit") {
        facts.first_or_review = Some(FirstOrReview::First);
    } else if lower.contains("follow-up") || lower.contains("follow up") || lower.contains("review consult") {
        facts.first_or_review = Some(FirstOrReview::Review);
    }
}

fn extract_referral(lower: &str, facts: &mut NoteFacts) {
    if lower.contains("referred by") || lower.contains("referral from") || lower.contains("on referral") {
        facts.referral_present = Some(true);
    }
}

fn extract_specialty_and_category(lower: &str, facts: &mut NoteFacts) {
    if lower.contains("general practitioner") || lower.contains(" gp ") || lower.starts_with("gp ") {
        facts.specialty = Some("gp".to_string());
        facts.is_gp = Some(true);
    }
    if lower.contains("specialist") || lower.contains("consultant physician") {
        facts.is_specialist = Some(true);
    }
    if lower.contains("emergency department") || lower.contains(" ed ") || lower.contains("emergency presentation") {
        facts.is_emergency = Some(true);
    }
}

fn extract_keywords(lower: &str, facts: &mut NoteFacts) {
    let mut keywords = BTreeSet::new();
    for role in ROLE_NOUNS {
        if lower.contains(role) {
            keywords.insert((*role).to_string());
        }
    }
    for (abbrev, expansion) in CLINICAL_ABBREVIATIONS {
        if contains_word(lower, abbrev) {
            keywords.insert((*abbrev).to_string());
            keywords.insert((*expansion).to_string());
        }
    }

    // Raw evidence tokens the Verifier's modality/setting/keyword_refine
    // checks re-scan independently of the structured `modality`/`setting`
    // fields above (spec §4.4 checks 3, 4, 11).
    if lower.contains("telehealth") || lower.contains("video") {
        keywords.insert("telehealth".to_string());
    }
    if lower.contains("phone") || lower.contains("telephone") {
        keywords.insert("phone".to_string());
    }
    if lower.contains("remote") {
        keywords.insert("remote".to_string());
    }
    if lower.contains("home visit") || lower.contains("patient's home") || lower.contains("attended at home") {
        keywords.insert("home".to_string());
    }
    if lower.contains("hospital") || lower.contains("inpatient") {
        keywords.insert("hospital".to_string());
    }
    if lower.contains("consulting rooms") || lower.contains("clinic") {
        keywords.insert("consulting_rooms".to_string());
    }
    if lower.contains("surgery") || lower.contains("anaesthesia") || lower.contains("anesthesia") {
        keywords.insert("surgery".to_string());
    }
    if lower.contains("ultrasound") {
        keywords.insert("ultrasound".to_string());
    }
    if lower.contains("contrast") {
        keywords.insert("contrast".to_string());
    }
    for region in ["chest", "abdomen", "pelvis", "head", "neck", "spine", "limb", "brain", "thorax"] {
        if lower.contains(region) {
            keywords.insert(region.to_string());
        }
    }

    facts.keywords = keywords;
}

fn contains_word(lower: &str, word: &str) -> bool {
    lower.split(|c: char| !c.is_alphanumeric()).any(|tok| tok == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_minute_range() {
        let facts = extract_facts("Consultation lasting 20-40 minutes for a 65yo man");
        assert_eq!(facts.duration_min, Some(20));
        assert_eq!(facts.duration_max, Some(40));
        assert_eq!(facts.age, Some(65));
    }

    #[test]
    fn bare_minutes_is_exact() {
        let facts = extract_facts("35 minute consultation");
        assert_eq!(facts.duration_min, Some(35));
        assert_eq!(facts.duration_max, Some(35));
    }

    #[test]
    fn extracts_telehealth_modality() {
        let facts = extract_facts("Telehealth video call with patient");
        assert_eq!(facts.modality, Some(Modality::Video));
    }

    #[test]
    fn extracts_home_setting() {
        let facts = extract_facts("GP attended the patient's home for a review");
        assert_eq!(facts.setting, Some(Setting::Home));
        assert_eq!(facts.first_or_review, Some(FirstOrReview::Review));
    }

    #[test]
    fn extracts_clinical_abbreviation_keyword() {
        let facts = extract_facts("Patient has longstanding copd and htn");
        assert!(facts.has_keyword("copd"));
        assert!(facts.has_keyword("chronic obstructive pulmonary disease"));
    }

    #[test]
    fn less_than_minutes_widens_to_narrow_window_below_bound() {
        let facts = extract_facts("Review lasting less than 20 minutes");
        assert_eq!(facts.duration_min, Some(19));
        assert_eq!(facts.duration_max, Some(20));
        assert!(!facts.duration_max_inclusive);
    }

    #[test]
    fn trailing_plus_minutes_is_an_open_lower_bound() {
        let facts = extract_facts("Consultation lasting 45+ minutes");
        assert_eq!(facts.duration_min, Some(45));
        assert_eq!(facts.duration_max, None);
        assert!(facts.duration_min_inclusive);
    }

    #[test]
    fn at_least_and_less_than_minutes_is_left_closed_right_open() {
        let facts = extract_facts("consult lasted at least 20 min and less than 40 min");
        assert_eq!(facts.duration_min, Some(20));
        assert_eq!(facts.duration_max, Some(40));
        assert!(facts.duration_min_inclusive);
        assert!(!facts.duration_max_inclusive);
    }

    #[test]
    fn more_than_minutes_is_an_open_interval() {
        let facts = extract_facts("Attendance lasting more than 40 minutes");
        assert_eq!(facts.duration_min, Some(40));
        assert!(!facts.duration_min_inclusive);
    }

    #[test]
    fn no_spurious_age_without_pattern() {
        let facts = extract_facts("Routine review, no other detail");
        assert_eq!(facts.age, None);
    }
}
