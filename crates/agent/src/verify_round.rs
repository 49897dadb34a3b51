//! The `verify` node — spec §4.6: parse an `ItemRule` for every proposed
//! document, run the Verifier, partition into passed/failed/soft, and
//! report every code seen this round so the caller can ban them all
//! (accepted codes included — spec §8 scenario 6: a code that already
//! passed still belongs on `must_not` so a later round never re-proposes
//! the same candidate).

use mbs_core::{Document, NoteFacts, VerifiedItem};

pub struct VerifyRound {
    pub passed: Vec<VerifiedItem>,
    pub seen_codes: Vec<String>,
}

pub fn run(documents: &[Document], facts: &NoteFacts) -> VerifyRound {
    let mut passed = Vec::new();
    let mut seen_codes = Vec::with_capacity(documents.len());

    for doc in documents {
        seen_codes.push(doc.id.clone());
        if let Some(item) = mbs_rag::synthesize(doc, facts, &Default::default()) {
            let report_passes = item.verify.as_ref().map(|r| r.passes).unwrap_or(true);
            if report_passes {
                passed.push(item);
            }
        }
    }

    VerifyRound { passed, seen_codes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_passed_and_bans_every_seen_code() {
        let docs = vec![
            Document::new("23", "Professional attendance, at least 20 min and less than 40 min", 0.9),
            Document::new("701", "Health assessment for a patient aged 75 years or more", 0.5),
        ];
        let facts = NoteFacts { duration_min: Some(25), duration_max: Some(25), age: Some(30), ..Default::default() };
        let round = run(&docs, &facts);

        assert_eq!(round.seen_codes, vec!["23".to_string(), "701".to_string()]);
        assert!(round.passed.iter().any(|i| i.code == "23"));
        assert!(!round.passed.iter().any(|i| i.code == "701"));
    }
}
