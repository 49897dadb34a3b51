//! LLM prompts as data (spec §9's open question: "should prompts live in
//! code or config? — resolved in favor of config, following the teacher's
//! `PromptTemplates`").
//!
//! Trimmed to this system's two model-backed seams: fact completion
//! (spec §4.2) and query refinement (spec §4.5). The teacher's sales
//! persona, stage prompts, and greeting/closing templates have no
//! counterpart here — a one-shot billing-code recommender neither greets
//! nor closes a conversation.

use serde::{Deserialize, Serialize};

/// Overridable system prompts for the two LLM call sites `mbs-llm` owns.
/// A `None` field means "use the built-in default baked into
/// `mbs_llm::PromptBuilder`".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptTemplates {
    #[serde(default)]
    pub fact_completion_system: Option<String>,
    #[serde(default)]
    pub query_refinement_system: Option<String>,
}

impl PromptTemplates {
    pub fn fact_completion_system(&self) -> Option<&str> {
        self.fact_completion_system.as_deref()
    }

    pub fn query_refinement_system(&self) -> Option<&str> {
        self.query_refinement_system.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_overrides() {
        let templates = PromptTemplates::default();
        assert!(templates.fact_completion_system().is_none());
        assert!(templates.query_refinement_system().is_none());
    }

    #[test]
    fn deserializes_partial_overrides_from_yaml() {
        let yaml = "fact_completion_system: \"custom prompt\"\n";
        let templates: PromptTemplates = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(templates.fact_completion_system(), Some("custom prompt"));
        assert!(templates.query_refinement_system().is_none());
    }
}
