//! The fallback linear pipeline — spec §4.6/§7: run on graph
//! construction/runtime failure. Extract, retrieve, verify, and if
//! under-filled, build critic hints and retrieve again — capped at one
//! refinement, never raising to the caller.

use std::collections::BTreeSet;

use mbs_core::{AgentState, Result};
use mbs_facts::FactCompleter;
use mbs_rag::Retriever;
use mbs_reflect::NoOpQueryRewriter;

use crate::critic::{append_constraints, must_constraints, must_not_constraints};
use crate::result::AgentResult;
use crate::verify_round;

const PROPOSE_MARGIN: usize = 3;

pub async fn run_linear(retriever: &Retriever, fact_completer: &dyn FactCompleter, note: &str, top_n: usize) -> Result<AgentResult> {
    let mut state = AgentState::new(note, top_n);

    let facts = mbs_facts::extract_with_completion(note, fact_completer).await?;
    state.facts = Some(facts.clone());

    // The fallback path never calls out to an LLM rewriter — a graph
    // failure is exactly the moment to lean on the deterministic subset.
    let reflection = mbs_reflect::reflect(note, &facts, &[], &NoOpQueryRewriter).await?;
    let query = reflection.enhanced_query.clone();

    let target = top_n + PROPOSE_MARGIN;
    let mut documents = retriever.search(&query, target, &BTreeSet::new()).await?;

    let mut round = verify_round::run(&documents, &facts);
    state.ban(round.seen_codes.clone());
    for item in round.passed {
        state.accept(item);
    }

    if !state.is_full() {
        let mut constraints = must_constraints(&facts);
        constraints.extend(must_not_constraints(&state.banned_codes));
        let refine_query = append_constraints(&query, &constraints);

        let remaining_target = (top_n - state.accepted.len()) + PROPOSE_MARGIN;
        documents = retriever.search(&refine_query, remaining_target, &state.banned_codes).await?;
        round = verify_round::run(&documents, &facts);
        state.ban(round.seen_codes);
        for item in round.passed {
            state.accept(item);
        }
    }

    state.truncate_accepted();
    Ok(AgentResult {
        note_facts: facts,
        items: state.accepted,
        conflicts_resolved: state.conflicts_resolved,
        iterations: 2,
        reflections: Some(reflection),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_core::Document;
    use mbs_facts::NoOpFactCompleter;
    use mbs_rag::{InMemoryVectorIndex, RetrieverConfig};
    use std::sync::Arc;

    #[tokio::test]
    async fn linear_pipeline_returns_accepted_items() {
        let index = InMemoryVectorIndex::new();
        index.upsert(Document::new("23", "Professional attendance, general practitioner", 0.0));
        let retriever = Retriever::new(Arc::new(index), RetrieverConfig::default());

        let result = run_linear(&retriever, &NoOpFactCompleter, "GP attendance", 1).await.unwrap();
        assert!(result.items.len() <= 1);
    }
}
