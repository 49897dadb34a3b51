//! JSON-schema constrained completion helper.
//!
//! The teacher's agent crate validates tool-call arguments against a static
//! schema before acting on them; the same discipline applies here to LLM
//! fact-completion output, since it feeds the Verifier directly and a
//! malformed field must never silently become a constraint.

use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::LlmError;

static NOTE_FACTS_SCHEMA_VALUE: Lazy<Value> = Lazy::new(|| {
    serde_json::json!({
        "type": "object",
        "properties": {
            "duration_min": { "type": ["integer", "null"] },
            "duration_max": { "type": ["integer", "null"] },
            "age": { "type": ["integer", "null"] },
            "modality": { "type": ["string", "null"], "enum": ["in_person", "video", "phone", null] },
            "setting": { "type": ["string", "null"], "enum": ["consulting_rooms", "hospital", "residential_care", "home", "other", null] },
            "first_or_review": { "type": ["string", "null"], "enum": ["first", "review", null] },
            "referral_present": { "type": ["boolean", "null"] },
            "specialty": { "type": ["string", "null"] },
            "is_gp": { "type": ["boolean", "null"] },
            "is_specialist": { "type": ["boolean", "null"] },
            "is_emergency": { "type": ["boolean", "null"] }
        },
        "additionalProperties": false
    })
});

static NOTE_FACTS_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&NOTE_FACTS_SCHEMA_VALUE)
        .expect("static NoteFacts completion schema must compile")
});

/// Parse and validate an LLM's fact-completion response against the fixed
/// schema. Any parse or validation failure is treated as "the model
/// returned nothing usable" rather than propagated, matching the spec's
/// conservative-default-on-failure instruction for LLM completions.
pub fn parse_note_facts_completion(raw: &str) -> Result<Value, LlmError> {
    let trimmed = extract_json_object(raw);
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| LlmError::InvalidResponse(format!("not valid JSON: {e}")))?;

    if let Err(mut errors) = NOTE_FACTS_SCHEMA.validate(&value) {
        let first = errors.next().map(|e| e.to_string()).unwrap_or_default();
        return Err(LlmError::InvalidResponse(format!("schema validation failed: {first}")));
    }

    Ok(value)
}

/// Models sometimes wrap JSON in prose or code fences; take the first
/// balanced `{...}` span.
fn extract_json_object(raw: &str) -> &str {
    let start = match raw.find('{') {
        Some(i) => i,
        None => return raw,
    };
    let end = match raw.rfind('}') {
        Some(i) => i,
        None => return raw,
    };
    if end > start {
        &raw[start..=end]
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"duration_min": 20, "duration_max": 40, "age": null, "modality": "video", "setting": null, "first_or_review": null, "referral_present": null, "specialty": null, "is_gp": null, "is_specialist": null, "is_emergency": null}"#;
        let value = parse_note_facts_completion(raw).unwrap();
        assert_eq!(value["duration_min"], 20);
    }

    #[test]
    fn strips_surrounding_prose() {
        let raw = "Here is the JSON:\n```json\n{\"duration_min\": null, \"duration_max\": null, \"age\": 70, \"modality\": null, \"setting\": null, \"first_or_review\": null, \"referral_present\": null, \"specialty\": null, \"is_gp\": null, \"is_specialist\": null, \"is_emergency\": null}\n```";
        let value = parse_note_facts_completion(raw).unwrap();
        assert_eq!(value["age"], 70);
    }

    #[test]
    fn rejects_unknown_enum_value() {
        let raw = r#"{"duration_min": null, "duration_max": null, "age": null, "modality": "teleportation", "setting": null, "first_or_review": null, "referral_present": null, "specialty": null, "is_gp": null, "is_specialist": null, "is_emergency": null}"#;
        assert!(parse_note_facts_completion(raw).is_err());
    }
}
