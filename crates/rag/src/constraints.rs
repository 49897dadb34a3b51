//! Constraint DSL — spec §6: a `#constraints` block of `+key:value` /
//! `-key:value` lines appended to a retrieval query, e.g.
//!
//! ```text
//! GP attendance at least 20 minutes
//! #constraints
//! +group:A1
//! -category:emergency
//! ```

use mbs_core::MetadataFilter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    pub includes: Vec<(String, String)>,
    pub excludes: Vec<(String, String)>,
}

/// Split a raw query into its free-text portion and parsed constraints.
pub fn parse_query(raw: &str) -> (String, ConstraintSet) {
    let Some(marker) = raw.find("#constraints") else {
        return (raw.trim().to_string(), ConstraintSet::default());
    };

    let text = raw[..marker].trim().to_string();
    let mut constraints = ConstraintSet::default();

    for line in raw[marker + "#constraints".len()..].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('+') {
            if let Some((key, value)) = rest.split_once(':') {
                constraints.includes.push((key.trim().to_string(), value.trim().to_string()));
            }
        } else if let Some(rest) = line.strip_prefix('-') {
            if let Some((key, value)) = rest.split_once(':') {
                constraints.excludes.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
    }

    (text, constraints)
}

/// Compile the `+key:value` includes into index-side filters. Only
/// structured catalog fields compile to a filter (spec §4.3 step 2: "a
/// metadata filter from must tokens where the key is structured (`code`,
/// `group`, `subgroup`, `duration`)"); everything else (`modality`,
/// `setting`, `specialty`, `visit`, unknown keys) is left for the LLM
/// context only — it still rides along in the query text verbatim, it just
/// never becomes an index-side predicate.
pub fn compile_include_filters(constraints: &ConstraintSet) -> Vec<MetadataFilter> {
    constraints
        .includes
        .iter()
        .filter_map(|(key, value)| match key.as_str() {
            "code" => Some(MetadataFilter::eq("code", value.clone())),
            "group" => Some(MetadataFilter::eq("group", value.clone())),
            "subgroup" => Some(MetadataFilter::eq("subgroup", value.clone())),
            "duration" => compile_duration_filter(value),
            _ => None,
        })
        .collect()
}

/// Duration buckets (`<N`, `>=N`, `A-B`) map to range predicates over the
/// catalog record's `duration_min_minutes`/`duration_max_minutes` fields.
fn compile_duration_filter(bucket: &str) -> Option<MetadataFilter> {
    if let Some(rest) = bucket.strip_prefix(">=") {
        let n: i64 = rest.trim().parse().ok()?;
        return Some(MetadataFilter::ge("duration_max_minutes", n));
    }
    if let Some(rest) = bucket.strip_prefix('<') {
        let n: i64 = rest.trim().parse().ok()?;
        return Some(MetadataFilter::lt("duration_min_minutes", n));
    }
    if let Some((lo, hi)) = bucket.split_once('-') {
        let lo: i64 = lo.trim().parse().ok()?;
        let hi: i64 = hi.trim().parse().ok()?;
        return Some(MetadataFilter::between("duration_min_minutes", lo, hi));
    }
    None
}

/// Does a document's metadata satisfy every `-key:value` exclusion.
pub fn passes_excludes(constraints: &ConstraintSet, metadata_str: impl Fn(&str) -> Option<String>) -> bool {
    for (key, value) in &constraints.excludes {
        if let Some(actual) = metadata_str(key) {
            if actual.eq_ignore_ascii_case(value) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_free_text_and_includes() {
        let raw = "GP attendance at least 20 minutes\n#constraints\n+group:A1\n-category:emergency";
        let (text, constraints) = parse_query(raw);
        assert_eq!(text, "GP attendance at least 20 minutes");
        assert_eq!(constraints.includes, vec![("group".to_string(), "A1".to_string())]);
        assert_eq!(constraints.excludes, vec![("category".to_string(), "emergency".to_string())]);
    }

    #[test]
    fn query_without_constraints_block_is_passthrough() {
        let (text, constraints) = parse_query("simple review query");
        assert_eq!(text, "simple review query");
        assert!(constraints.includes.is_empty());
    }

    #[test]
    fn duration_bucket_compiles_to_between_filter() {
        let mut constraints = ConstraintSet::default();
        constraints.includes.push(("duration".to_string(), "20-40".to_string()));
        let filters = compile_include_filters(&constraints);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].field, "duration_min_minutes");
        assert_eq!(filters[0].op, mbs_core::FilterOp::Between);
    }

    #[test]
    fn non_structured_keys_do_not_compile_to_filters() {
        let mut constraints = ConstraintSet::default();
        constraints.includes.push(("modality".to_string(), "video".to_string()));
        assert!(compile_include_filters(&constraints).is_empty());
    }

    #[test]
    fn excludes_reject_matching_metadata() {
        let mut constraints = ConstraintSet::default();
        constraints.excludes.push(("category".to_string(), "emergency".to_string()));
        assert!(!passes_excludes(&constraints, |k| if k == "category" { Some("emergency".to_string()) } else { None }));
        assert!(passes_excludes(&constraints, |k| if k == "category" { Some("gp".to_string()) } else { None }));
    }
}
