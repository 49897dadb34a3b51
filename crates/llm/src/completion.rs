//! Concrete LLM-backed implementations of the `FactCompleter` and
//! `QueryRewriter` seams `mbs-facts`/`mbs-reflect` define.

use std::sync::Arc;

use async_trait::async_trait;
use mbs_core::{FirstOrReview, Modality, NoteFacts, Result, Setting};
use mbs_facts::FactCompleter;
use mbs_reflect::QueryRewriter;
use serde_json::Value;

use crate::backend::LlmBackend;
use crate::prompt::PromptBuilder;
use crate::schema::parse_note_facts_completion;

pub struct LlmFactCompleter {
    backend: Arc<dyn LlmBackend>,
    system_override: Option<String>,
}

impl LlmFactCompleter {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend, system_override: None }
    }

    /// Replace the built-in fact-completion system prompt with one sourced
    /// from `mbs-config::PromptTemplates`.
    pub fn with_system_prompt(mut self, system_override: impl Into<String>) -> Self {
        self.system_override = Some(system_override.into());
        self
    }
}

#[async_trait]
impl FactCompleter for LlmFactCompleter {
    async fn complete(&self, note: &str, partial: &NoteFacts) -> Result<NoteFacts> {
        let known_json = serde_json::to_string(partial).unwrap_or_default();
        let messages = PromptBuilder::new()
            .fact_completion_system(self.system_override.as_deref())
            .with_note(note)
            .with_known_facts(&known_json)
            .build();

        let generated = match self.backend.generate(&messages).await {
            Ok(result) => result.text,
            Err(e) => {
                tracing::warn!(error = %e, "fact completion call failed, falling back to heuristic-only facts");
                return Ok(partial.clone());
            }
        };

        let value = match parse_note_facts_completion(&generated) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "fact completion response failed schema validation, ignoring it");
                return Ok(partial.clone());
            }
        };

        Ok(value_to_note_facts(&value))
    }
}

fn value_to_note_facts(value: &Value) -> NoteFacts {
    let mut facts = NoteFacts::default();

    facts.duration_min = value.get("duration_min").and_then(Value::as_i64).map(|v| v as i32);
    facts.duration_max = value.get("duration_max").and_then(Value::as_i64).map(|v| v as i32);
    facts.duration_min_inclusive = facts.duration_min.is_some();
    facts.duration_max_inclusive = facts.duration_max.is_some();
    facts.age = value.get("age").and_then(Value::as_i64).map(|v| v as i32);

    facts.modality = value.get("modality").and_then(Value::as_str).and_then(|s| match s {
        "in_person" => Some(Modality::InPerson),
        "video" => Some(Modality::Video),
        "phone" => Some(Modality::Phone),
        _ => None,
    });
    facts.setting = value.get("setting").and_then(Value::as_str).and_then(|s| match s {
        "consulting_rooms" => Some(Setting::ConsultingRooms),
        "hospital" => Some(Setting::Hospital),
        "residential_care" => Some(Setting::ResidentialCare),
        "home" => Some(Setting::Home),
        "other" => Some(Setting::Other),
        _ => None,
    });
    facts.first_or_review = value.get("first_or_review").and_then(Value::as_str).and_then(|s| match s {
        "first" => Some(FirstOrReview::First),
        "review" => Some(FirstOrReview::Review),
        _ => None,
    });
    facts.referral_present = value.get("referral_present").and_then(Value::as_bool);
    facts.specialty = value.get("specialty").and_then(Value::as_str).map(str::to_string);
    facts.is_gp = value.get("is_gp").and_then(Value::as_bool);
    facts.is_specialist = value.get("is_specialist").and_then(Value::as_bool);
    facts.is_emergency = value.get("is_emergency").and_then(Value::as_bool);

    facts
}

pub struct LlmQueryRewriter {
    backend: Arc<dyn LlmBackend>,
    system_override: Option<String>,
}

impl LlmQueryRewriter {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend, system_override: None }
    }

    /// Replace the built-in query-refinement system prompt with one sourced
    /// from `mbs-config::PromptTemplates`.
    pub fn with_system_prompt(mut self, system_override: impl Into<String>) -> Self {
        self.system_override = Some(system_override.into());
        self
    }
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    async fn rewrite(&self, note: &str, _facts: &NoteFacts, banned_codes: &[String]) -> Result<String> {
        let messages = PromptBuilder::new()
            .query_refinement_system(self.system_override.as_deref())
            .with_note(note)
            .with_banned_codes(banned_codes)
            .build();

        match self.backend.generate(&messages).await {
            Ok(result) => Ok(result.text.trim().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "query rewrite call failed, keeping original query");
                Ok(note.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_to_note_facts_maps_known_enums() {
        let value = serde_json::json!({
            "duration_min": 20,
            "duration_max": 40,
            "age": null,
            "modality": "video",
            "setting": "home",
            "first_or_review": "review",
            "referral_present": true,
            "specialty": "gp",
            "is_gp": true,
            "is_specialist": null,
            "is_emergency": null
        });
        let facts = value_to_note_facts(&value);
        assert_eq!(facts.modality, Some(Modality::Video));
        assert_eq!(facts.setting, Some(Setting::Home));
        assert_eq!(facts.first_or_review, Some(FirstOrReview::Review));
        assert_eq!(facts.referral_present, Some(true));
    }
}
