//! An in-memory, brute-force `VectorIndex` — used in tests and as the
//! reference implementation the `qdrant`-backed index is checked against.
//!
//! Grounded on the teacher's `SimpleEmbedder`/`VectorStore` pair
//! (`voice-agent-rag::embeddings`/`vector_store`, referenced from
//! `retriever.rs` but not present in this retrieval pack): a deterministic,
//! no-ML embedder plus a brute-force cosine-similarity store, good enough
//! for unit tests and small catalogs without pulling in a model runtime.

use std::collections::HashMap;

use async_trait::async_trait;
use mbs_core::{Document, Error, Result, VectorIndex, VectorSearchOptions};
use parking_lot::RwLock;

const DIMENSIONS: usize = 256;

/// A hashing bag-of-words embedder: deterministic, dependency-free, and
/// stable across runs — good enough to rank catalog descriptions by lexical
/// overlap without requiring a model server.
fn hash_embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0f32; DIMENSIONS];
    for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let bucket = simple_hash(token) % DIMENSIONS;
        vector[bucket] += 1.0;
    }
    normalize(&mut vector);
    vector
}

fn simple_hash(token: &str) -> usize {
    let mut hash: u64 = 1469598103934665603; // FNV offset basis
    for byte in token.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211); // FNV prime
    }
    hash as usize
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub struct InMemoryVectorIndex {
    documents: RwLock<Vec<(Document, Vec<f32>)>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self { documents: RwLock::new(Vec::new()) }
    }

    /// Ingest one catalog record as a searchable document.
    pub fn upsert(&self, document: Document) {
        let embedding = hash_embed(&document.content);
        let mut documents = self.documents.write();
        documents.retain(|(d, _)| d.id != document.id);
        documents.push((document, embedding));
    }

    pub fn clear(&self) {
        self.documents.write().clear();
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn search(&self, query_embedding: &[f32], options: &VectorSearchOptions) -> Result<Vec<Document>> {
        let documents = self.documents.read();
        let mut scored: Vec<(f32, Document)> = documents
            .iter()
            .filter(|(doc, _)| matches_filters(doc, &options.filters))
            .map(|(doc, embedding)| (cosine(query_embedding, embedding), doc.clone()))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(options.top_k.max(1))
            .map(|(score, mut doc)| {
                doc.score = score;
                doc
            })
            .collect())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embed(text))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

fn matches_filters(doc: &Document, filters: &[mbs_core::MetadataFilter]) -> bool {
    use mbs_core::FilterOp;

    filters.iter().all(|filter| {
        let Some(actual) = doc.metadata.get(&filter.field) else { return false };
        match filter.op {
            FilterOp::Equals => actual == &filter.value,
            FilterOp::GreaterOrEqual => compare_numeric(actual, &filter.value).map(|o| o != std::cmp::Ordering::Less).unwrap_or(false),
            FilterOp::LessThan => compare_numeric(actual, &filter.value).map(|o| o == std::cmp::Ordering::Less).unwrap_or(false),
            FilterOp::Between => {
                let lo_ok = compare_numeric(actual, &filter.value).map(|o| o != std::cmp::Ordering::Less).unwrap_or(false);
                let hi_ok = filter
                    .value2
                    .as_ref()
                    .and_then(|hi| compare_numeric(actual, hi))
                    .map(|o| o == std::cmp::Ordering::Less)
                    .unwrap_or(false);
                lo_ok && hi_ok
            }
        }
    })
}

fn compare_numeric(actual: &serde_json::Value, bound: &serde_json::Value) -> Option<std::cmp::Ordering> {
    let a = actual.as_f64()?;
    let b = bound.as_f64()?;
    a.partial_cmp(&b)
}

/// Helper so call sites can convert a `VectorIndex` miss/error path into the
/// shared `Error` type consistently.
pub fn index_error(index_name: &str, message: impl std::fmt::Display) -> Error {
    Error::Rag(format!("{index_name}: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ranks_by_lexical_overlap() {
        let index = InMemoryVectorIndex::new();
        index.upsert(Document::new("23", "Professional attendance, general practitioner", 0.0));
        index.upsert(Document::new("110", "Comprehensive consultant physician assessment", 0.0));

        let query = index.embed("general practitioner attendance").await.unwrap();
        let results = index
            .search(&query, &VectorSearchOptions { top_k: 2, filters: vec![] })
            .await
            .unwrap();

        assert_eq!(results[0].id, "23");
    }

    #[tokio::test]
    async fn filters_restrict_results() {
        let index = InMemoryVectorIndex::new();
        index.upsert(Document::new("23", "GP attendance", 0.0).with_metadata("group", "A1"));
        index.upsert(Document::new("110", "Specialist attendance", 0.0).with_metadata("group", "A3"));

        let query = index.embed("attendance").await.unwrap();
        let options = VectorSearchOptions {
            top_k: 5,
            filters: vec![mbs_core::MetadataFilter::eq("group", "A3")],
        };
        let results = index.search(&query, &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "110");
    }
}
