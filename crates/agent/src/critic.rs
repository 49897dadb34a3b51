//! The `critic` node — spec §4.6: derive `must`/`must_not` constraint DSL
//! lines from `NoteFacts` and the growing banned-code set, to steer
//! `refine_propose` away from what's already been tried and toward what
//! the note actually says.

use std::collections::BTreeSet;

use mbs_core::{Modality, NoteFacts, Setting};

/// `must` constraint lines (`+key:value`) derived from known facts. Only
/// facts the note actually states contribute a constraint — unknown facts
/// are left unconstrained rather than guessed.
pub fn must_constraints(facts: &NoteFacts) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(bucket) = duration_bucket(facts) {
        lines.push(format!("+duration:{bucket}"));
    }
    if let Some(modality) = facts.modality {
        lines.push(format!("+modality:{}", modality_key(modality)));
    }
    if let Some(setting) = facts.setting {
        if setting != Setting::Other {
            lines.push(format!("+setting:{}", setting_key(setting)));
        }
    }
    if let Some(specialty) = &facts.specialty {
        lines.push(format!("+specialty:{specialty}"));
    }
    if let Some(visit) = facts.first_or_review {
        lines.push(format!("+visit:{}", visit_key(visit)));
    }

    lines
}

/// `must_not` constraint lines (`-code:X`) — every code already seen this
/// run, so `refine_propose` can never resurface it (spec §3 invariant:
/// `bannedCodes` monotonically excludes).
pub fn must_not_constraints(banned_codes: &BTreeSet<String>) -> Vec<String> {
    banned_codes.iter().map(|code| format!("-code:{code}")).collect()
}

fn duration_bucket(facts: &NoteFacts) -> Option<String> {
    match (facts.duration_min, facts.duration_max) {
        (Some(min), Some(max)) => Some(format!("{min}-{max}")),
        (Some(min), None) => Some(format!(">={min}")),
        (None, Some(max)) => Some(format!("<{max}")),
        (None, None) => None,
    }
}

fn modality_key(modality: Modality) -> &'static str {
    match modality {
        Modality::InPerson => "in_person",
        Modality::Video => "video",
        Modality::Phone => "phone",
    }
}

fn setting_key(setting: Setting) -> &'static str {
    match setting {
        Setting::ConsultingRooms => "consulting_rooms",
        Setting::Hospital => "hospital",
        Setting::ResidentialCare => "residential_care",
        Setting::Home => "home",
        Setting::Other => "other",
    }
}

fn visit_key(visit: mbs_core::FirstOrReview) -> &'static str {
    match visit {
        mbs_core::FirstOrReview::First => "first",
        mbs_core::FirstOrReview::Review => "review",
    }
}

/// Append a block of constraint lines onto a query under `#constraints`.
pub fn append_constraints(query: &str, lines: &[String]) -> String {
    if lines.is_empty() {
        return query.to_string();
    }
    format!("{query}\n#constraints\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_bucket_closed_range() {
        let facts = NoteFacts { duration_min: Some(20), duration_max: Some(40), ..Default::default() };
        assert_eq!(duration_bucket(&facts), Some("20-40".to_string()));
    }

    #[test]
    fn setting_other_is_not_constrained() {
        let facts = NoteFacts { setting: Some(Setting::Other), ..Default::default() };
        assert!(must_constraints(&facts).is_empty());
    }

    #[test]
    fn must_not_lists_every_banned_code() {
        let mut banned = BTreeSet::new();
        banned.insert("23".to_string());
        banned.insert("36".to_string());
        let lines = must_not_constraints(&banned);
        assert_eq!(lines, vec!["-code:23".to_string(), "-code:36".to_string()]);
    }

    #[test]
    fn append_constraints_builds_dsl_block() {
        let query = append_constraints("gp review", &["+modality:video".to_string()]);
        assert_eq!(query, "gp review\n#constraints\n+modality:video");
    }
}
