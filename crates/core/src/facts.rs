//! `NoteFacts` — structured clinical facts extracted from a free-text note.
//!
//! Every field is nullable: `None` means "unknown", not "absent". Downstream
//! consumers (the Verifier) treat unknown as weaker evidence than a known
//! mismatch — see `mbs-verify` for the tri-state semantics this feeds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A half-open or fully-closed interval over integers (minutes, years, ...).
/// `None` endpoints are unbounded in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Interval {
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub left_closed: bool,
    pub right_closed: bool,
}

impl Interval {
    pub fn closed(min: i32, max: i32) -> Self {
        Self { min: Some(min), max: Some(max), left_closed: true, right_closed: true }
    }

    pub fn left_closed_right_open(min: i32, max: i32) -> Self {
        Self { min: Some(min), max: Some(max), left_closed: true, right_closed: false }
    }

    pub fn at_least(min: i32) -> Self {
        Self { min: Some(min), max: None, left_closed: true, right_closed: false }
    }

    pub fn more_than(min: i32) -> Self {
        Self { min: Some(min), max: None, left_closed: false, right_closed: false }
    }

    pub fn less_than(max: i32) -> Self {
        Self { min: None, max: Some(max), left_closed: false, right_closed: false }
    }

    /// Is `value` contained in this interval.
    pub fn contains(&self, value: i32) -> bool {
        let ge_min = match self.min {
            None => true,
            Some(m) => if self.left_closed { value >= m } else { value > m },
        };
        let le_max = match self.max {
            None => true,
            Some(m) => if self.right_closed { value <= m } else { value < m },
        };
        ge_min && le_max
    }

    /// Is `self` fully contained within `other`.
    pub fn subset_of(&self, other: &Interval) -> bool {
        let min_ok = match (self.min, other.min) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => {
                if a > b {
                    true
                } else if a < b {
                    false
                } else {
                    // equal bound: self's closedness must not be looser than other's
                    !self.left_closed || other.left_closed
                }
            }
        };
        let max_ok = match (self.max, other.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => {
                if a < b {
                    true
                } else if a > b {
                    false
                } else {
                    !self.right_closed || other.right_closed
                }
            }
        };
        min_ok && max_ok
    }

    /// Do `self` and `other` overlap at all.
    pub fn overlaps(&self, other: &Interval) -> bool {
        let upper_ok = match (self.min, other.max) {
            (Some(a), Some(b)) => {
                if a < b {
                    true
                } else if a > b {
                    false
                } else {
                    self.left_closed && other.right_closed
                }
            }
            _ => true,
        };
        let lower_ok = match (self.max, other.min) {
            (Some(a), Some(b)) => {
                if a > b {
                    true
                } else if a < b {
                    false
                } else {
                    self.right_closed && other.left_closed
                }
            }
            _ => true,
        };
        upper_ok && lower_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    InPerson,
    Video,
    Phone,
}

impl Default for Modality {
    fn default() -> Self {
        Modality::InPerson
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    ConsultingRooms,
    Hospital,
    ResidentialCare,
    Home,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstOrReview {
    First,
    Review,
}

/// Structured clinical facts extracted from a note. See spec §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NoteFacts {
    pub duration_min: Option<i32>,
    pub duration_max: Option<i32>,
    pub duration_min_inclusive: bool,
    pub duration_max_inclusive: bool,

    pub age: Option<i32>,

    pub modality: Option<Modality>,
    pub setting: Option<Setting>,
    pub first_or_review: Option<FirstOrReview>,
    pub referral_present: Option<bool>,
    pub specialty: Option<String>,

    pub is_gp: Option<bool>,
    pub is_specialist: Option<bool>,
    pub is_emergency: Option<bool>,

    pub keywords: BTreeSet<String>,
}

impl NoteFacts {
    /// Effective modality, defaulting to in-person when unspecified — the
    /// "weak evidence" default spec §3 and §4.4 describe.
    pub fn effective_modality(&self) -> Modality {
        self.modality.unwrap_or(Modality::InPerson)
    }

    /// The note's duration as an `Interval`, if any bound is known.
    pub fn duration_interval(&self) -> Option<Interval> {
        if self.duration_min.is_none() && self.duration_max.is_none() {
            return None;
        }
        Some(Interval {
            min: self.duration_min,
            max: self.duration_max,
            left_closed: self.duration_min_inclusive,
            right_closed: self.duration_max_inclusive,
        })
    }

    pub fn has_keyword(&self, kw: &str) -> bool {
        self.keywords.contains(kw)
    }

    /// Count of role-noun keywords retained for `case_conference_min` checks.
    pub fn role_noun_count(&self) -> usize {
        const ROLE_NOUNS: &[&str] = &[
            "nurse", "physiotherapist", "psychologist", "social worker",
            "dietitian", "occupational therapist", "pharmacist", "carer",
            "care coordinator", "speech pathologist", "podiatrist",
        ];
        ROLE_NOUNS.iter().filter(|n| self.keywords.contains(**n)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_subset() {
        let f = Interval::closed(25, 25);
        let r = Interval::left_closed_right_open(20, 40);
        assert!(f.subset_of(&r));
    }

    #[test]
    fn interval_overlap_not_subset() {
        let f = Interval::closed(19, 22);
        let r = Interval::left_closed_right_open(20, 40);
        assert!(f.overlaps(&r));
        assert!(!f.subset_of(&r));
    }

    #[test]
    fn interval_disjoint() {
        let f = Interval::closed(18, 18);
        let r = Interval::left_closed_right_open(20, 40);
        assert!(!f.overlaps(&r));
    }

    #[test]
    fn effective_modality_defaults_in_person() {
        let facts = NoteFacts::default();
        assert_eq!(facts.effective_modality(), Modality::InPerson);
    }
}
