//! The top-level `Retriever` — spec §4.3: constraint DSL parsing, hybrid
//! dense+lexical search, RRF fusion, composite rerank, and exclude/banned
//! filtering, in one orchestrated call.
//!
//! Grounded on the teacher's `HybridRetriever` (`retriever.rs`): a struct
//! holding a dense index and an optional sparse index, a `RetrieverConfig`,
//! and a `search` method that degrades gracefully when a leg is absent.

use std::collections::BTreeSet;
use std::sync::Arc;

use mbs_core::{Document, MetadataFilter, Result, VectorIndex, VectorSearchOptions};
use tracing::warn;

use crate::answer::{AnswerSynthesizer, DeterministicAnswerSynthesizer, SynthesizedAnswer};
use crate::constraints::{compile_include_filters, parse_query, passes_excludes, ConstraintSet};
use crate::lexical::SharedLexicalIndex;
use crate::reranker::{apply_llm_order, CrossEncoderReranker, LlmReflectionReranker, NoOpCrossEncoderReranker, NoOpLlmReflectionReranker};
use crate::rerank::{composite_rerank, rrf_fuse, FusionConfig};
use crate::stage2::stage2_reflection_rerank;

/// Candidate pool size requested from the vector index before any
/// reranking stage runs (spec §4.3 step 3), clamped to `[30, 200]`.
pub fn clamp_rerank_candidates(n: usize) -> usize {
    n.clamp(30, 200)
}

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub dense_top_k: usize,
    pub sparse_top_k: usize,
    pub final_top_k: usize,
    pub fusion: FusionConfig,
    /// Mode-gated stage-2 local constraint-aware rerank (spec §4.3 step 5).
    pub enable_stage2_reflection: bool,
    /// Mode-gated LLM reflection rerank (spec §4.3 step 6).
    pub enable_llm_reflection_rerank: bool,
    /// How many top candidates the LLM reflection rerank reorders, clamped
    /// to `[5, 25]`.
    pub reflection_rerank_top: usize,
}

impl RetrieverConfig {
    /// Build a config around a candidate pool size (spec §4.3 step 3's
    /// `RERANK_CANDIDATES`, clamped to `[30, 200]`), keeping every other
    /// field at its default.
    pub fn with_candidate_pool(rerank_candidates: usize) -> Self {
        let pool = clamp_rerank_candidates(rerank_candidates);
        Self { dense_top_k: pool, sparse_top_k: pool, ..Self::default() }
    }
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        let pool = clamp_rerank_candidates(150);
        Self {
            dense_top_k: pool,
            sparse_top_k: pool,
            final_top_k: 8,
            fusion: FusionConfig::default(),
            enable_stage2_reflection: false,
            enable_llm_reflection_rerank: false,
            reflection_rerank_top: 15,
        }
    }
}

/// Hybrid retriever: a dense vector index (required) plus an optional
/// lexical index. Both legs are queried in parallel where possible and
/// fused with RRF before reranking.
pub struct Retriever {
    dense: Arc<dyn VectorIndex>,
    lexical: Option<SharedLexicalIndex>,
    cross_encoder: Option<Arc<dyn CrossEncoderReranker>>,
    llm_reranker: Option<Arc<dyn LlmReflectionReranker>>,
    answer_synthesizer: Arc<dyn AnswerSynthesizer>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(dense: Arc<dyn VectorIndex>, config: RetrieverConfig) -> Self {
        Self {
            dense,
            lexical: None,
            cross_encoder: None,
            llm_reranker: None,
            answer_synthesizer: Arc::new(DeterministicAnswerSynthesizer),
            config,
        }
    }

    pub fn with_lexical(mut self, lexical: SharedLexicalIndex) -> Self {
        self.lexical = Some(lexical);
        self
    }

    pub fn with_cross_encoder(mut self, reranker: Arc<dyn CrossEncoderReranker>) -> Self {
        self.cross_encoder = Some(reranker);
        self
    }

    pub fn with_llm_reranker(mut self, reranker: Arc<dyn LlmReflectionReranker>) -> Self {
        self.llm_reranker = Some(reranker);
        self
    }

    pub fn with_answer_synthesizer(mut self, synthesizer: Arc<dyn AnswerSynthesizer>) -> Self {
        self.answer_synthesizer = synthesizer;
        self
    }

    /// Search the catalog with the enhanced query (spec §4.3 steps 1-6),
    /// gating the mode-dependent stage-2 and LLM reflection reranks on this
    /// retriever's configured defaults. `top_k` overrides the configured
    /// `final_top_k` for this call (the orchestrator shrinks it as
    /// `top_n - accepted.len()` on later iterations).
    pub async fn search(&self, query: &str, top_k: usize, banned_codes: &BTreeSet<String>) -> Result<Vec<Document>> {
        self.search_with_reflection(
            query,
            top_k,
            banned_codes,
            self.config.enable_stage2_reflection,
            self.config.enable_llm_reflection_rerank,
        )
        .await
    }

    /// Search with explicit per-call overrides for the two reflection
    /// knobs, bypassing this retriever's configured defaults. Spec §4.6:
    /// Smart mode's `smart_propose` runs "with both reflection knobs
    /// enabled" regardless of how the shared retriever is otherwise wired.
    pub async fn search_with_reflection(
        &self,
        query: &str,
        top_k: usize,
        banned_codes: &BTreeSet<String>,
        enable_stage2_reflection: bool,
        enable_llm_reflection_rerank: bool,
    ) -> Result<Vec<Document>> {
        let (text, constraints) = parse_query(query);
        let include_filters = compile_include_filters(&constraints);

        let dense_results = self.search_dense(&text, &include_filters).await?;

        let lexical_results = match &self.lexical {
            Some(index) => {
                let index = Arc::clone(index);
                let owned_text = text.clone();
                let sparse_top_k = self.config.sparse_top_k;
                tokio::task::spawn_blocking(move || index.search(&owned_text, sparse_top_k))
                    .await
                    .map_err(|e| mbs_core::Error::Rag(format!("lexical search task failed: {e}")))??
            }
            None => Vec::new(),
        };

        let fused = rrf_fuse(&dense_results, &lexical_results, self.config.fusion);
        let reranked = composite_rerank(&text, fused);

        let rerank_top_n = (top_k + 5).max(12);
        let reranked = match &self.cross_encoder {
            Some(reranker) => reranker.rerank(&text, reranked, rerank_top_n).await?,
            None => NoOpCrossEncoderReranker.rerank(&text, reranked, rerank_top_n).await?,
        };

        let reranked = if enable_stage2_reflection {
            stage2_reflection_rerank(reranked, &constraints)
        } else {
            reranked
        };

        let reranked = if enable_llm_reflection_rerank {
            self.apply_llm_reflection(&text, reranked).await?
        } else {
            reranked
        };

        let filtered: Vec<Document> = reranked
            .into_iter()
            .filter(|doc| !banned_codes.contains(&doc.id))
            .filter(|doc| passes_excludes(&constraints, |key| doc.meta_str(key).map(str::to_string)))
            .take(top_k)
            .collect();

        Ok(filtered)
    }

    /// spec §4.3 step 6: reorder the top `reflection_rerank_top` (clamped
    /// to `[5, 25]`) by the configured `LlmReflectionReranker`, leaving the
    /// rest of the list untouched behind them.
    async fn apply_llm_reflection(&self, query: &str, documents: Vec<Document>) -> Result<Vec<Document>> {
        let window = self.config.reflection_rerank_top.clamp(5, 25).min(documents.len());
        let (head, tail) = documents.split_at(window.min(documents.len()));
        let head = head.to_vec();
        let tail = tail.to_vec();

        let order = match &self.llm_reranker {
            Some(reranker) => reranker.reorder(query, &head).await.unwrap_or_else(|err| {
                warn!(error = %err, "llm reflection rerank failed, keeping prior order");
                head.iter().map(|d| d.id.clone()).collect()
            }),
            None => NoOpLlmReflectionReranker.reorder(query, &head).await?,
        };

        let mut reordered = apply_llm_order(head, &order);
        reordered.extend(tail);
        Ok(reordered)
    }

    /// spec §4.3 step 7: synthesize a verified-answer JSON payload from the
    /// top `top_k+6` documents, re-filtering against `excludes ∪ banned`
    /// afterward regardless of which synthesizer produced the list. Never
    /// raises — a synthesis failure yields an empty result set.
    pub async fn synthesize_answers(
        &self,
        query: &str,
        top_k: usize,
        banned_codes: &BTreeSet<String>,
        current_date: &str,
    ) -> Vec<SynthesizedAnswer> {
        let documents = match self.search(query, top_k + 6, banned_codes).await {
            Ok(docs) => docs,
            Err(err) => {
                warn!(error = %err, "retrieval for answer synthesis failed, returning no results");
                return Vec::new();
            }
        };

        let answers = match self.answer_synthesizer.synthesize(&documents, banned_codes, current_date, top_k).await {
            Ok(answers) => answers,
            Err(err) => {
                warn!(error = %err, "answer synthesis failed, returning no results");
                return Vec::new();
            }
        };

        let (_, constraints) = parse_query(query);
        let mut excluded: BTreeSet<String> = banned_codes.clone();
        excluded.extend(constraints.excludes.iter().filter(|(key, _)| key == "code").map(|(_, v)| v.clone()));

        crate::answer::filter_excluded(answers, &excluded)
    }

    /// Dense search with the compiled include filters, retrying without
    /// them if the index rejects the filtered query (spec §4.3 step 3: "an
    /// index that can't honor a filter should error so the caller can retry
    /// without it").
    async fn search_dense(&self, text: &str, include_filters: &[MetadataFilter]) -> Result<Vec<Document>> {
        let embedding = self.dense.embed(text).await?;
        let options = VectorSearchOptions { top_k: self.config.dense_top_k, filters: include_filters.to_vec() };

        match self.dense.search(&embedding, &options).await {
            Ok(results) => Ok(results),
            Err(err) if !include_filters.is_empty() => {
                warn!(error = %err, "dense search with filters failed, retrying unfiltered");
                let fallback_options = VectorSearchOptions { top_k: self.config.dense_top_k, filters: Vec::new() };
                self.dense.search(&embedding, &fallback_options).await
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_index::InMemoryVectorIndex;

    fn seeded_index() -> Arc<InMemoryVectorIndex> {
        let index = InMemoryVectorIndex::new();
        index.upsert(Document::new("23", "Professional attendance, general practitioner", 0.0).with_metadata("group", "A1"));
        index.upsert(Document::new("110", "Comprehensive consultant physician assessment", 0.0).with_metadata("group", "A3"));
        Arc::new(index)
    }

    #[tokio::test]
    async fn search_ranks_relevant_document_first() {
        let retriever = Retriever::new(seeded_index(), RetrieverConfig::default());
        let results = retriever.search("general practitioner attendance", 5, &BTreeSet::new()).await.unwrap();
        assert_eq!(results[0].id, "23");
    }

    #[tokio::test]
    async fn banned_codes_are_excluded() {
        let retriever = Retriever::new(seeded_index(), RetrieverConfig::default());
        let mut banned = BTreeSet::new();
        banned.insert("23".to_string());
        let results = retriever.search("general practitioner attendance", 5, &banned).await.unwrap();
        assert!(results.iter().all(|d| d.id != "23"));
    }

    #[tokio::test]
    async fn dsl_excludes_filter_by_metadata() {
        let retriever = Retriever::new(seeded_index(), RetrieverConfig::default());
        let query = "attendance\n#constraints\n-group:A1";
        let results = retriever.search(query, 5, &BTreeSet::new()).await.unwrap();
        assert!(results.iter().all(|d| d.id != "23"));
    }

    /// spec §4.6: Smart mode forces both reflection knobs on per call even
    /// when the shared retriever's configured defaults leave them off.
    #[tokio::test]
    async fn search_with_reflection_overrides_disabled_stage2_default() {
        let index = InMemoryVectorIndex::new();
        // Identical content ties the embed/keyword-overlap scores for both
        // candidates, so only insertion order (absent stage-2) or the
        // stage-2 group bonus (present) can break the tie.
        index.upsert(Document::new("23", "attendance", 0.0).with_metadata("group", "A3"));
        index.upsert(Document::new("36", "attendance", 0.0).with_metadata("group", "A1"));
        let config = RetrieverConfig::default();
        assert!(!config.enable_stage2_reflection);
        let retriever = Retriever::new(Arc::new(index), config);

        let query = "attendance\n#constraints\n+group:A1";
        let default_results = retriever.search(query, 2, &BTreeSet::new()).await.unwrap();
        assert_eq!(default_results[0].id, "23");

        let overridden_results = retriever.search_with_reflection(query, 2, &BTreeSet::new(), true, false).await.unwrap();
        assert_eq!(overridden_results[0].id, "36");
    }
}
