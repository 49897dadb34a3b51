//! The `VectorIndex` trait seam the Retriever (`mbs-rag`) searches through.
//!
//! Grounded on the teacher's `Retriever` trait (`traits/retriever.rs`):
//! an async trait returning scored `Document`s, with a `MetadataFilter`
//! list compiled from the query's constraint DSL. The catalog vector store
//! itself is an external collaborator (spec §1) — this crate only owns the
//! seam, not the ingestion pipeline behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
        Self { id: id.into(), content: content.into(), score, metadata: HashMap::new() }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn meta_i64(&self, key: &str) -> Option<i64> {
        self.metadata.get(key).and_then(|v| v.as_i64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    GreaterOrEqual,
    LessThan,
    Between,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: serde_json::Value,
    pub value2: Option<serde_json::Value>,
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), op: FilterOp::Equals, value: value.into(), value2: None }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), op: FilterOp::GreaterOrEqual, value: value.into(), value2: None }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), op: FilterOp::LessThan, value: value.into(), value2: None }
    }

    pub fn between(field: impl Into<String>, lo: impl Into<serde_json::Value>, hi: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), op: FilterOp::Between, value: lo.into(), value2: Some(hi.into()) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VectorSearchOptions {
    pub top_k: usize,
    pub filters: Vec<MetadataFilter>,
}

/// The vector index a `Retriever` embeds queries against. Implementations:
/// an in-memory reference index for tests, a `qdrant-client`-backed index
/// in `mbs-rag` for production.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest-neighbour search, optionally filtered. Implementations that
    /// can't honor a non-empty filter should return an error so the caller
    /// can retry without it (spec §4.3 step 3).
    async fn search(&self, query_embedding: &[f32], options: &VectorSearchOptions) -> Result<Vec<Document>>;

    /// Embed free text into the index's vector space.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}
