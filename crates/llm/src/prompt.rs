//! Prompt construction for the MBS agent's LLM calls — completion and
//! refinement only; there is no persona/conversation surface here.
//!
//! Grounded on the teacher's `PromptBuilder`/`Message`/`Role`
//! (`voice-agent-llm::prompt`), trimmed to the two call sites this system
//! actually has: completing missing `NoteFacts` fields, and rewriting a
//! retrieval query.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Builds the two prompts this crate issues: a fact-completion prompt and a
/// query-refinement prompt, both instructed to return JSON only so the
/// caller can validate the response against a JSON schema.
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    /// System prompt for the fact-completion call (spec §4.2). Pass an
    /// override sourced from `mbs-config::PromptTemplates` to replace the
    /// built-in wording without recompiling.
    pub fn fact_completion_system(self, r#override: Option<&str>) -> Self {
        self.with_system(
            r#override,
            "You extract structured clinical facts from an Australian GP/specialist \
             consultation note. Only fill fields the note supports; respond with JSON \
             matching the given schema exactly, and use null for anything not stated. \
             Never guess a duration or age.",
        )
    }

    /// System prompt for the query-refinement call (spec §4.5). Pass an
    /// override sourced from `mbs-config::PromptTemplates` to replace the
    /// built-in wording without recompiling.
    pub fn query_refinement_system(self, r#override: Option<&str>) -> Self {
        self.with_system(
            r#override,
            "You rewrite a clinical note into a focused retrieval query for an \
             Australian Medicare Benefits Schedule billing-code search index. \
             Preserve clinically relevant detail, add standard terminology for \
             abbreviations, and mention any item codes to avoid. Respond with the \
             rewritten query text only.",
        )
    }

    fn with_system(mut self, r#override: Option<&str>, default: &str) -> Self {
        self.messages.push(Message::system(r#override.unwrap_or(default)));
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.messages.push(Message::user(format!("Note:\n{note}")));
        self
    }

    pub fn with_known_facts(mut self, known_facts_json: &str) -> Self {
        self.messages.push(Message::user(format!("Facts already known:\n{known_facts_json}")));
        self
    }

    pub fn with_banned_codes(mut self, banned_codes: &[String]) -> Self {
        if !banned_codes.is_empty() {
            self.messages.push(Message::user(format!("Exclude item codes: {}", banned_codes.join(", "))));
        }
        self
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_completion_prompt_includes_note_and_system() {
        let messages = PromptBuilder::new()
            .fact_completion_system(None)
            .with_note("35 minute review")
            .build();
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains("35 minute review"));
    }

    #[test]
    fn fact_completion_prompt_honors_override() {
        let messages = PromptBuilder::new().fact_completion_system(Some("custom system text")).build();
        assert_eq!(messages[0].content, "custom system text");
    }

    #[test]
    fn query_refinement_prompt_includes_banned_codes() {
        let messages = PromptBuilder::new()
            .query_refinement_system(None)
            .with_note("review")
            .with_banned_codes(&["23".to_string()])
            .build();
        assert!(messages.last().unwrap().content.contains("23"));
    }
}
