//! Production `VectorIndex` backed by Qdrant — spec §6: ingestion writes
//! here, the Retriever reads from here in non-test deployments.
//!
//! Grounded directly on the sibling project's `vector_store.rs`
//! (`voice-agent/backend/crates/rag/src/vector_store.rs`), the one file in
//! this retrieval pack that actually drives `qdrant-client`.

use std::collections::HashMap;

use async_trait::async_trait;
use mbs_core::{Document, Error, FilterOp, MetadataFilter, Result, VectorIndex, VectorSearchOptions};
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    condition::ConditionOneOf, r#match::MatchValue, Condition, CreateCollectionBuilder, Distance,
    FieldCondition, Filter, Match, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;

#[derive(Debug, Clone)]
pub struct QdrantIndexConfig {
    pub endpoint: String,
    pub collection: String,
    pub vector_dim: u64,
    pub api_key: Option<String>,
}

impl Default for QdrantIndexConfig {
    fn default() -> Self {
        Self { endpoint: "http://localhost:6334".to_string(), collection: "mbs_items".to_string(), vector_dim: 256, api_key: None }
    }
}

pub struct QdrantVectorIndex {
    client: Qdrant,
    config: QdrantIndexConfig,
}

impl QdrantVectorIndex {
    pub async fn connect(config: QdrantIndexConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.endpoint);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build().map_err(|e| Error::Rag(format!("qdrant connect failed: {e}")))?;
        Ok(Self { client, config })
    }

    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| Error::Rag(format!("qdrant collection_exists failed: {e}")))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection)
                        .vectors_config(VectorParamsBuilder::new(self.config.vector_dim, Distance::Cosine)),
                )
                .await
                .map_err(|e| Error::Rag(format!("qdrant create_collection failed: {e}")))?;
        }
        Ok(())
    }

    /// Upsert one catalog document with its precomputed embedding.
    pub async fn upsert(&self, document: &Document, embedding: Vec<f32>) -> Result<()> {
        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("content".to_string(), document.content.clone().into());
        for (key, value) in &document.metadata {
            if let Some(s) = value.as_str() {
                payload.insert(key.clone(), s.to_string().into());
            } else if let Some(n) = value.as_i64() {
                payload.insert(key.clone(), n.into());
            } else if let Some(b) = value.as_bool() {
                payload.insert(key.clone(), b.into());
            }
        }

        let point = PointStruct::new(document.id.clone(), embedding, payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, vec![point]))
            .await
            .map_err(|e| Error::Rag(format!("qdrant upsert failed: {e}")))?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.client
            .delete_collection(&self.config.collection)
            .await
            .map_err(|e| Error::Rag(format!("qdrant delete_collection failed: {e}")))?;
        self.ensure_collection().await
    }
}

/// Translate our `MetadataFilter` list into a Qdrant `Filter`. Only the
/// `Equals` op maps onto a keyword match; any other op makes the filter
/// un-honorable, which the caller (`Retriever::search_dense`) treats as an
/// error and retries unfiltered (spec §4.3 step 3).
fn build_filter(filters: &[MetadataFilter]) -> Result<Option<Filter>> {
    if filters.is_empty() {
        return Ok(None);
    }

    let mut conditions = Vec::with_capacity(filters.len());
    for filter in filters {
        if filter.op != FilterOp::Equals {
            return Err(Error::Rag(format!("qdrant index cannot honor filter op {:?} on field {}", filter.op, filter.field)));
        }
        let Some(value) = filter.value.as_str() else {
            return Err(Error::Rag(format!("qdrant index only supports string equality filters, got {:?}", filter.value)));
        };
        conditions.push(Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: filter.field.clone(),
                r#match: Some(Match { match_value: Some(MatchValue::Keyword(value.to_string())) }),
                ..Default::default()
            })),
        });
    }

    Ok(Some(Filter { must: conditions, ..Default::default() }))
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn search(&self, query_embedding: &[f32], options: &VectorSearchOptions) -> Result<Vec<Document>> {
        let qdrant_filter = build_filter(&options.filters)?;

        let mut builder = SearchPointsBuilder::new(&self.config.collection, query_embedding.to_vec(), options.top_k as u64).with_payload(true);
        if let Some(filter) = qdrant_filter {
            builder = builder.filter(filter);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| Error::Rag(format!("qdrant search failed: {e}")))?;

        Ok(response.result.into_iter().map(point_to_document).collect())
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        // The production index trusts an upstream embedding service; the
        // Retriever is expected to source query embeddings from the same
        // model used at ingestion. Falling back to this index's own `embed`
        // is a reference-index convenience, not a production path.
        Err(Error::Rag("QdrantVectorIndex does not embed text itself; supply a pre-computed query embedding".to_string()))
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

fn point_to_document(point: qdrant_client::qdrant::ScoredPoint) -> Document {
    let mut content = String::new();
    let mut metadata = HashMap::new();

    for (key, value) in point.payload {
        match value.kind {
            Some(Kind::StringValue(s)) if key == "content" => content = s,
            Some(Kind::StringValue(s)) => {
                metadata.insert(key, serde_json::Value::String(s));
            }
            Some(Kind::IntegerValue(i)) => {
                metadata.insert(key, serde_json::Value::from(i));
            }
            Some(Kind::BoolValue(b)) => {
                metadata.insert(key, serde_json::Value::Bool(b));
            }
            _ => {}
        }
    }

    let id = point
        .id
        .and_then(|pid| pid.point_id_options)
        .map(|options| match options {
            qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u) => u,
            qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
        })
        .unwrap_or_default();

    Document { id, content, score: point.score, metadata }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_filter_compiles() {
        let filters = vec![MetadataFilter::eq("group", "A1")];
        let filter = build_filter(&filters).unwrap();
        assert!(filter.is_some());
    }

    #[test]
    fn range_filter_is_rejected_for_retry() {
        let filters = vec![MetadataFilter::ge("duration_min_minutes", 20)];
        assert!(build_filter(&filters).is_err());
    }
}
