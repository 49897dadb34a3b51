//! The orchestrator's return shape — spec §4.6 "Return".

use mbs_core::{NoteFacts, VerifiedItem};
use mbs_reflect::ReflectionResult;

#[derive(Debug, Clone)]
pub struct AgentResult {
    pub note_facts: NoteFacts,
    pub items: Vec<VerifiedItem>,
    pub conflicts_resolved: Vec<String>,
    pub iterations: usize,
    pub reflections: Option<ReflectionResult>,
}
