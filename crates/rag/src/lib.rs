//! Retriever — spec §4.3: constraint DSL, hybrid dense+lexical search, RRF
//! fusion, composite reranking, and verified answer synthesis.
//!
//! Grounded on the teacher's `voice-agent-rag` crate, scoped down to the
//! one `Retriever` this system's agent loop actually drives — the
//! embedding-model zoo, cross-lingual normalizer, and domain-term booster
//! the teacher ships are out of scope for a structured billing catalog.

pub mod answer;
pub mod constraints;
pub mod ingest;
pub mod lexical;
pub mod memory_index;
pub mod qdrant_index;
pub mod rerank;
pub mod reranker;
pub mod retriever;
pub mod stage2;
pub mod synth;

pub use answer::{filter_excluded, AnswerSynthesizer, DeterministicAnswerSynthesizer, SynthesizedAnswer};
pub use constraints::{compile_include_filters, parse_query, passes_excludes, ConstraintSet};
pub use ingest::{ingest_catalog, parse_catalog_line, CatalogIndex};
pub use lexical::{LexicalIndex, SharedLexicalIndex};
pub use memory_index::InMemoryVectorIndex;
pub use qdrant_index::{QdrantIndexConfig, QdrantVectorIndex};
pub use rerank::{composite_rerank, rrf_fuse, FusionConfig, SimpleScorer};
pub use reranker::{
    apply_llm_order, CrossEncoderReranker, LlmReflectionReranker, NoOpCrossEncoderReranker, NoOpLlmReflectionReranker,
};
pub use retriever::{clamp_rerank_candidates, Retriever, RetrieverConfig};
pub use stage2::stage2_reflection_rerank;
pub use synth::{synthesize, synthesize_all};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector index error: {0}")]
    Index(String),

    #[error("lexical search error: {0}")]
    Lexical(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<RagError> for mbs_core::Error {
    fn from(err: RagError) -> Self {
        mbs_core::Error::Rag(err.to_string())
    }
}
