//! `VerifyReport` and the tri-state check outcome.
//!
//! The repo's wire format flattens SOFT into `pass=true` with a non-empty
//! `details` marker (spec §9: "a cleaner target encoding is a dedicated
//! tagged variant"). We keep both: `Outcome` is the tagged variant engines
//! compute with, `CheckRecord` is the flattened, serializable form a
//! `VerifyReport` actually stores.

use serde::{Deserialize, Serialize};

/// The tri-state a single check evaluates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Soft(String),
    Fail(String),
}

impl Outcome {
    pub fn pass(&self) -> bool {
        !matches!(self, Outcome::Fail(_))
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Outcome::Pass => None,
            Outcome::Soft(d) | Outcome::Fail(d) => Some(d),
        }
    }

    pub fn into_record(self, name: impl Into<String>) -> CheckRecord {
        CheckRecord {
            name: name.into(),
            pass: self.pass(),
            details: self.details().map(|s| s.to_string()),
        }
    }
}

/// A single flattened check result, per spec §3: `pass = (result != FAIL)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub name: String,
    pub pass: bool,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub item_code: String,
    pub passes: bool,
    pub checks: Vec<CheckRecord>,
    pub rationale_markdown: String,
    pub categories: Vec<String>,
}

impl VerifyReport {
    pub fn from_checks(item_code: impl Into<String>, checks: Vec<CheckRecord>, categories: Vec<String>) -> Self {
        let passes = !checks.iter().any(|c| !c.pass);
        let item_code = item_code.into();
        let rationale_markdown = render_rationale(&item_code, passes, &checks);
        Self { item_code, passes, checks, rationale_markdown, categories }
    }
}

fn render_rationale(item_code: &str, passes: bool, checks: &[CheckRecord]) -> String {
    let flagged: Vec<&CheckRecord> = checks.iter().filter(|c| c.details.is_some()).collect();

    if flagged.is_empty() {
        return format!("✅ **{item_code}** — all checks passed.");
    }

    let emoji = if passes { "⚠️" } else { "❌" };
    let mut out = format!("{emoji} **{item_code}**\n");
    for c in flagged {
        let marker = if c.pass { "soft" } else { "fail" };
        out.push_str(&format!("- [{marker}] {}: {}\n", c.name, c.details.as_deref().unwrap_or("")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pass_renders_success_line() {
        let checks = vec![CheckRecord { name: "time_window".into(), pass: true, details: None }];
        let report = VerifyReport::from_checks("23", checks, vec![]);
        assert!(report.passes);
        assert!(report.rationale_markdown.starts_with("✅"));
    }

    #[test]
    fn fail_sets_passes_false() {
        let checks = vec![
            CheckRecord { name: "modality".into(), pass: false, details: Some("conflict".into()) },
        ];
        let report = VerifyReport::from_checks("36", checks, vec![]);
        assert!(!report.passes);
        assert!(report.rationale_markdown.starts_with("❌"));
    }

    #[test]
    fn soft_keeps_passes_true() {
        let checks = vec![
            CheckRecord { name: "age".into(), pass: true, details: Some("soft_info_missing".into()) },
        ];
        let report = VerifyReport::from_checks("104", checks, vec![]);
        assert!(report.passes);
        assert!(report.rationale_markdown.starts_with("⚠️"));
    }
}
