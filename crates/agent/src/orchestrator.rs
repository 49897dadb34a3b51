//! The Agent Orchestrator — spec §4.6: `extract_facts → query_reflection`,
//! then mode-dependent. Deep mode loops `propose → verify [→ critic →
//! refine_propose → verify]*` bounded to 3 propose rounds total (initial +
//! 2 refinements). Smart mode does one enhanced retrieval and skips
//! verification entirely.

use std::sync::Arc;

use mbs_core::{AgentState, NoteFacts, Result, VerifiedItem};
use mbs_facts::FactCompleter;
use mbs_rag::Retriever;
use mbs_reflect::QueryRewriter;

use crate::critic::{append_constraints, must_constraints, must_not_constraints};
use crate::mode::Mode;
use crate::propose::collect_unique;
use crate::result::AgentResult;
use crate::verify_round;

/// How many extra candidates each propose round asks for beyond `topN`
/// (spec §4.6: "asking for `topK+3`").
const PROPOSE_MARGIN: usize = 3;

/// Deep mode's iteration bound: the initial `propose` plus at most this
/// many `refine_propose` rounds (spec §8: "iteration count is bounded (≤ 3
/// propose rounds total: initial + 2 refinements)").
const MAX_REFINEMENTS: usize = 2;

pub struct Orchestrator {
    retriever: Arc<Retriever>,
    fact_completer: Arc<dyn FactCompleter>,
    query_rewriter: Arc<dyn QueryRewriter>,
}

impl Orchestrator {
    pub fn new(retriever: Arc<Retriever>, fact_completer: Arc<dyn FactCompleter>, query_rewriter: Arc<dyn QueryRewriter>) -> Self {
        Self { retriever, fact_completer, query_rewriter }
    }

    pub async fn run(&self, note: &str, top_n: usize, mode: Mode) -> Result<AgentResult> {
        match self.run_graph(note, top_n, mode).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(error = %err, "agent graph failed, falling back to linear pipeline");
                crate::fallback::run_linear(&self.retriever, &*self.fact_completer, note, top_n).await
            }
        }
    }

    async fn run_graph(&self, note: &str, top_n: usize, mode: Mode) -> Result<AgentResult> {
        let mut state = AgentState::new(note, top_n);

        let facts = mbs_facts::extract_with_completion(note, &*self.fact_completer).await?;
        state.facts = Some(facts.clone());

        let reflection = mbs_reflect::reflect(note, &facts, &[], &*self.query_rewriter).await?;
        state.enhanced_query = Some(reflection.enhanced_query.clone());
        state.reflection_constraints = reflection.key_constraints.clone();

        tracing::debug!(mode = ?mode, completeness = reflection.completeness_score, "query_reflection complete");

        let result = match mode {
            Mode::Deep => self.run_deep(&mut state, &facts, reflection).await,
            Mode::Smart => self.run_smart(&mut state, &facts, reflection).await,
        };

        if let Ok(ref result) = result {
            metrics::histogram!("mbs_agent_iterations_per_run").record(result.iterations as f64);
            metrics::counter!("mbs_agent_runs_total").increment(1);
        }

        result
    }

    async fn run_deep(&self, state: &mut AgentState, facts: &NoteFacts, reflection: mbs_reflect::ReflectionResult) -> Result<AgentResult> {
        let query = state.enhanced_query.clone().unwrap_or_else(|| state.note.clone());
        let target = state.top_n + PROPOSE_MARGIN;

        tracing::debug!(target, "propose");
        let mut documents = collect_unique(&self.retriever, &query, target, &state.banned_codes).await?;
        state.iterations = 1;

        loop {
            let round = verify_round::run(&documents, facts);
            tracing::debug!(iteration = state.iterations, seen = round.seen_codes.len(), passed = round.passed.len(), "verify");
            state.ban(round.seen_codes.clone());
            for item in round.passed {
                state.accept(item);
            }
            state.done = round.seen_codes.is_empty() || state.is_full();

            if state.done || state.iterations > MAX_REFINEMENTS {
                break;
            }

            let mut constraints = reflection.key_constraints.iter().cloned().map(|c| format!("+{c}")).collect::<Vec<_>>();
            constraints.extend(must_constraints(facts));
            constraints.extend(must_not_constraints(&state.banned_codes));
            let refine_query = append_constraints(&query, &constraints);
            tracing::debug!(banned = state.banned_codes.len(), "critic");

            let remaining_target = (state.top_n - state.accepted.len()) + PROPOSE_MARGIN;
            tracing::debug!(remaining_target, "refine_propose");
            documents = collect_unique(&self.retriever, &refine_query, remaining_target, &state.banned_codes).await?;
            state.iterations += 1;
        }

        state.truncate_accepted();
        let (items, conflicts_resolved) = crate::resolve_time_conflicts(state.accepted.clone());
        Ok(AgentResult {
            note_facts: facts.clone(),
            items,
            conflicts_resolved,
            iterations: state.iterations,
            reflections: Some(reflection),
        })
    }

    async fn run_smart(&self, state: &mut AgentState, facts: &NoteFacts, reflection: mbs_reflect::ReflectionResult) -> Result<AgentResult> {
        let query = state.enhanced_query.clone().unwrap_or_else(|| state.note.clone());
        // spec §4.6: "smart_propose retrieves topK using the enhanced query
        // and both reflection knobs enabled" — forced on here regardless of
        // how the shared retriever is otherwise configured.
        let documents = self
            .retriever
            .search_with_reflection(&query, state.top_n, &state.banned_codes, true, true)
            .await?;
        state.iterations = 1;

        let items: Vec<VerifiedItem> = documents
            .into_iter()
            .map(|doc| {
                let match_reason = doc
                    .metadata
                    .get("match_reason")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| "Enhanced by query self-reflection".to_string());
                VerifiedItem {
                    code: doc.id,
                    display: doc.content,
                    fee: doc.metadata.get("schedule_fee").and_then(|v| v.as_f64()),
                    score: Some(doc.score),
                    verify: None,
                    group: doc.metadata.get("group").and_then(|v| v.as_str()).map(str::to_string),
                    match_reason: Some(match_reason),
                }
            })
            .collect();

        let (items, conflicts_resolved) = crate::resolve_time_conflicts(items);

        Ok(AgentResult {
            note_facts: facts.clone(),
            items,
            conflicts_resolved,
            iterations: state.iterations,
            reflections: Some(reflection),
        })
    }
}
