//! Stage-2 reflection rerank — spec §4.3 step 5.
//!
//! Purely local and synchronous: no model call, just a composite score
//! built from the upstream relevance plus how well each candidate matches
//! the `must`/`must_not` constraint tokens already compiled by
//! [`crate::constraints`]. Mode-gated by `RetrieverConfig::enable_stage2_reflection`.

use mbs_core::Document;

use crate::constraints::ConstraintSet;

/// Re-score and re-sort `docs` against the parsed constraint set. Any
/// candidate matching a `must_not code:X` is dropped outright; every other
/// candidate is scored `0.5 × normalized_base + bonuses`.
pub fn stage2_reflection_rerank(docs: Vec<Document>, constraints: &ConstraintSet) -> Vec<Document> {
    let banned_codes: Vec<&str> = constraints
        .excludes
        .iter()
        .filter(|(key, _)| key == "code")
        .map(|(_, value)| value.as_str())
        .collect();

    let max_score = docs.iter().map(|d| d.score).fold(0.0_f32, f32::max).max(1e-6);

    let mut scored: Vec<Document> = docs
        .into_iter()
        .filter(|doc| !banned_codes.contains(&doc.id.as_str()))
        .map(|mut doc| {
            let mut score = 0.5 * (doc.score / max_score);
            for (key, value) in &constraints.includes {
                match key.as_str() {
                    "code" if doc.id == *value => score += 3.0,
                    "group" if doc.meta_str("group") == Some(value.as_str()) => score += 2.0,
                    "subgroup" if doc.meta_str("subgroup") == Some(value.as_str()) => score += 1.5,
                    "duration" if duration_bucket_matches(&doc, value) => score += 1.5,
                    _ => {}
                }
            }
            doc.score = score;
            doc
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Does a candidate's duration interval midpoint fall within a `<N` /
/// `>=N` / `A-B` bucket (same grammar `compile_include_filters` parses).
fn duration_bucket_matches(doc: &Document, bucket: &str) -> bool {
    let min = doc.meta_i64("duration_min_minutes");
    let max = doc.meta_i64("duration_max_minutes");
    let midpoint = match (min, max) {
        (Some(a), Some(b)) => Some((a + b) as f64 / 2.0),
        (Some(a), None) => Some(a as f64),
        (None, Some(b)) => Some(b as f64),
        (None, None) => None,
    };
    let Some(midpoint) = midpoint else { return false };

    if let Some(rest) = bucket.strip_prefix(">=") {
        return rest.trim().parse::<f64>().map(|n| midpoint >= n).unwrap_or(false);
    }
    if let Some(rest) = bucket.strip_prefix('<') {
        return rest.trim().parse::<f64>().map(|n| midpoint < n).unwrap_or(false);
    }
    if let Some((lo, hi)) = bucket.split_once('-') {
        let lo: Option<f64> = lo.trim().parse().ok();
        let hi: Option<f64> = hi.trim().parse().ok();
        if let (Some(lo), Some(hi)) = (lo, hi) {
            return midpoint >= lo && midpoint <= hi;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_not_code_is_dropped() {
        let docs = vec![Document::new("23", "x", 0.5), Document::new("36", "y", 0.5)];
        let mut constraints = ConstraintSet::default();
        constraints.excludes.push(("code".to_string(), "23".to_string()));
        let reranked = stage2_reflection_rerank(docs, &constraints);
        assert!(reranked.iter().all(|d| d.id != "23"));
    }

    #[test]
    fn must_group_match_boosts_score() {
        let docs = vec![
            Document::new("1", "x", 0.5).with_metadata("group", "A1"),
            Document::new("2", "y", 0.5).with_metadata("group", "A3"),
        ];
        let mut constraints = ConstraintSet::default();
        constraints.includes.push(("group".to_string(), "A1".to_string()));
        let reranked = stage2_reflection_rerank(docs, &constraints);
        assert_eq!(reranked[0].id, "1");
    }

    #[test]
    fn duration_bucket_match_boosts_score() {
        let docs = vec![
            Document::new("1", "x", 0.5).with_metadata("duration_min_minutes", 20).with_metadata("duration_max_minutes", 40),
            Document::new("2", "y", 0.5).with_metadata("duration_min_minutes", 5).with_metadata("duration_max_minutes", 10),
        ];
        let mut constraints = ConstraintSet::default();
        constraints.includes.push(("duration".to_string(), "20-40".to_string()));
        let reranked = stage2_reflection_rerank(docs, &constraints);
        assert_eq!(reranked[0].id, "1");
    }
}
