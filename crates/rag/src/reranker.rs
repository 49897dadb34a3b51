//! The two optional, model-backed reranking seams spec §4.3 steps 4 and 6
//! describe. Neither is wired to a concrete model in this workspace (no
//! cross-encoder checkpoint, no chat-model reorder call is made from
//! `mbs-rag` itself) — concrete implementations live in `mbs-llm` and are
//! injected via `Retriever::with_cross_encoder` /
//! `Retriever::with_llm_reranker`, the same seam pattern `mbs-facts`'s
//! `FactCompleter` and `mbs-reflect`'s `QueryRewriter` use.

use async_trait::async_trait;
use mbs_core::{Document, Result};

/// Step 4: submit the candidate pool and the clean query to a reranker
/// model, keep `top_n = max(topK+5, 12)` by relevance.
#[async_trait]
pub trait CrossEncoderReranker: Send + Sync {
    async fn rerank(&self, query: &str, documents: Vec<Document>, top_n: usize) -> Result<Vec<Document>>;
}

/// No cross-encoder configured — passthrough, taking the first `top_n` of
/// whatever ordering the caller already produced.
pub struct NoOpCrossEncoderReranker;

#[async_trait]
impl CrossEncoderReranker for NoOpCrossEncoderReranker {
    async fn rerank(&self, _query: &str, mut documents: Vec<Document>, top_n: usize) -> Result<Vec<Document>> {
        documents.truncate(top_n);
        Ok(documents)
    }
}

/// Step 6: a secondary small-model call reorders the top 5-25 candidates
/// by a rubric (respect constraints strictly, prefer correct duration
/// bucket, prefer matching group/subgroup, bias toward higher upstream
/// score, penalize obvious mismatches); unseen codes sink to the bottom.
#[async_trait]
pub trait LlmReflectionReranker: Send + Sync {
    /// Returns the reordered *codes* among `documents` — the caller
    /// reconstructs the `Document` ordering from this, sinking anything the
    /// model didn't mention to the bottom in its prior order.
    async fn reorder(&self, query: &str, documents: &[Document]) -> Result<Vec<String>>;
}

pub struct NoOpLlmReflectionReranker;

#[async_trait]
impl LlmReflectionReranker for NoOpLlmReflectionReranker {
    async fn reorder(&self, _query: &str, documents: &[Document]) -> Result<Vec<String>> {
        Ok(documents.iter().map(|d| d.id.clone()).collect())
    }
}

/// Apply an `LlmReflectionReranker`'s code ordering back onto the document
/// list: reordered codes first (in the order returned), anything unseen
/// keeps its prior relative order at the tail.
pub fn apply_llm_order(documents: Vec<Document>, order: &[String]) -> Vec<Document> {
    let mut by_id: std::collections::HashMap<String, Document> = documents.into_iter().map(|d| (d.id.clone(), d)).collect();
    let mut out = Vec::with_capacity(by_id.len());

    for code in order {
        if let Some(doc) = by_id.remove(code) {
            out.push(doc);
        }
    }
    // Anything the model didn't mention sinks to the bottom, in whatever
    // order `HashMap::into_values` yields it (no ordering guarantee left to
    // preserve once removed from the original Vec).
    out.extend(by_id.into_values());
    out
}
