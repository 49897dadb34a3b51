//! `ItemRule` — the structured constraint derived from one catalog item's
//! natural-language description plus its structured metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::facts::{FirstOrReview, Interval, Modality, Setting};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub left_closed: bool,
    pub right_closed: bool,
}

impl AgeRange {
    pub fn contains(&self, age: i32) -> bool {
        let ge_min = match self.min {
            None => true,
            Some(m) => if self.left_closed { age >= m } else { age > m },
        };
        let le_max = match self.max {
            None => true,
            Some(m) => if self.right_closed { age <= m } else { age < m },
        };
        ge_min && le_max
    }
}

/// A non-blocking sequence relation, e.g. "follows comprehensive assessment
/// under item 123". Never causes a FAIL — always surfaced as SOFT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    RelationRequired,
}

/// Sparse flag struct — modeled as optional fields rather than a map so the
/// Verifier's check table can stay static (spec §9 design note).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ItemFlags {
    pub case_conference: Option<bool>,
    pub case_conference_min: Option<u32>,
    pub usual_gp_required: Option<bool>,
    pub home_only: Option<bool>,
    pub referral_gp: Option<bool>,
    pub referral_specialist: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRule {
    pub code: String,
    pub group: Option<String>,
    pub subgroup: Option<String>,
    /// The catalog item's free-text description, retained for checks that
    /// need to re-scan the title rather than just the structured fields
    /// (spec §4.4 check 11, `keyword_refine`).
    pub description: String,

    pub time_window: Option<Interval>,
    pub age_range: Option<AgeRange>,
    pub setting_allowed: Option<BTreeSet<Setting>>,
    pub modality_allowed: Option<BTreeSet<Modality>>,
    pub specialty_required: Option<String>,
    pub referral_required: Option<bool>,
    pub first_or_review: Option<FirstOrReview>,

    pub conditions: Vec<Condition>,
    pub flags: ItemFlags,

    pub evidence_spans: Vec<String>,
    pub confidence: f32,
}

impl ItemRule {
    /// A permissive rule with every constraint unset — the conservative
    /// default spec §7 mandates when parsing fails: uncertainty surfaces as
    /// SOFT/PASS downstream, never FAIL.
    pub fn permissive(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            group: None,
            subgroup: None,
            description: String::new(),
            time_window: None,
            age_range: None,
            setting_allowed: None,
            modality_allowed: None,
            specialty_required: None,
            referral_required: None,
            first_or_review: None,
            conditions: Vec::new(),
            flags: ItemFlags::default(),
            evidence_spans: Vec::new(),
            confidence: 0.7,
        }
    }
}

/// The fixed category table mapping `group`/`subgroup` to the verifier's
/// category-driven checks (spec §4.4 check 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Gp,
    Specialist,
    Telehealth,
    AfterHours,
    Emergency,
    Imaging,
    Surgery,
    Pathology,
    Other,
}

impl ItemCategory {
    pub fn from_group_subgroup(group: Option<&str>, subgroup: Option<&str>) -> Self {
        let g = group.unwrap_or("").to_uppercase();
        let sg = subgroup.unwrap_or("").to_uppercase();
        let combined = format!("{g} {sg}");

        if g.starts_with("A1") || g.starts_with("A7") {
            return ItemCategory::Gp;
        }
        if g.starts_with("A3") || g.starts_with("A4") || g.starts_with("A28") || g.starts_with("A29") {
            return ItemCategory::Specialist;
        }
        if g.starts_with("A40") {
            return ItemCategory::Telehealth;
        }
        if g.starts_with("A11") || g.starts_with("A22") || g.starts_with("A23") {
            return ItemCategory::AfterHours;
        }
        if g.starts_with("A21") || combined.contains("T1:14") {
            return ItemCategory::Emergency;
        }
        if g.starts_with('I') {
            return ItemCategory::Imaging;
        }
        if g.starts_with("T8") || combined.to_lowercase().contains("anaes") {
            return ItemCategory::Surgery;
        }
        if g.starts_with('P') {
            return ItemCategory::Pathology;
        }
        ItemCategory::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_gp() {
        assert_eq!(ItemCategory::from_group_subgroup(Some("A1"), None), ItemCategory::Gp);
    }

    #[test]
    fn category_surgery_by_anaes() {
        assert_eq!(
            ItemCategory::from_group_subgroup(Some("T9"), Some("Anaesthesia")),
            ItemCategory::Surgery
        );
    }

    #[test]
    fn category_other_default() {
        assert_eq!(ItemCategory::from_group_subgroup(Some("Z99"), None), ItemCategory::Other);
    }

    #[test]
    fn permissive_rule_has_no_constraints() {
        let r = ItemRule::permissive("23");
        assert!(r.time_window.is_none());
        assert!(r.age_range.is_none());
        assert!(r.referral_required.is_none());
    }
}
