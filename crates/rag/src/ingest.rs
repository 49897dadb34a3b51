//! Catalog ingestion seam — spec §1/§6: "ingestion of the code catalog
//! into the vector store" is an external collaborator the core doesn't
//! specify the format of, but `POST /rag/ingest`/`clear`/`refresh`
//! (`crates/server`) need something to call. `CatalogIndex` is the minimal
//! write-side contract both `VectorIndex` implementations in this crate
//! already satisfy by construction.

use async_trait::async_trait;
use mbs_core::{Document, Result};

use crate::memory_index::InMemoryVectorIndex;
use crate::qdrant_index::QdrantVectorIndex;

/// Write side of a vector index: upsert one catalog record, or wipe the
/// whole collection (spec §6: `POST /rag/clear` "wipes the index
/// namespace").
#[async_trait]
pub trait CatalogIndex: Send + Sync {
    async fn upsert_document(&self, document: Document) -> Result<()>;
    async fn clear_index(&self) -> Result<()>;
}

#[async_trait]
impl CatalogIndex for InMemoryVectorIndex {
    async fn upsert_document(&self, document: Document) -> Result<()> {
        self.upsert(document);
        Ok(())
    }

    async fn clear_index(&self) -> Result<()> {
        self.clear();
        Ok(())
    }
}

#[async_trait]
impl CatalogIndex for QdrantVectorIndex {
    async fn upsert_document(&self, document: Document) -> Result<()> {
        let embedding = self.embed(&document.content).await?;
        self.upsert(&document, embedding).await
    }

    async fn clear_index(&self) -> Result<()> {
        self.clear().await
    }
}

/// Parse one catalog ingestion source line into a `Document`. Each line is
/// a JSON object `{code, description, group?, subgroup?, schedule_fee?,
/// duration_min_minutes?, duration_max_minutes?}` (JSON Lines, the teacher's
/// idiom for bulk catalog loads — see `voice-agent/backend`'s domain YAML
/// loaders for the sibling "one record per line/document" convention this
/// mirrors).
pub fn parse_catalog_line(line: &str) -> Option<Document> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let code = value.get("code")?.as_str()?.to_string();
    let description = value.get("description")?.as_str()?.to_string();

    let mut document = Document::new(code, description, 0.0);
    for key in ["group", "subgroup"] {
        if let Some(v) = value.get(key).and_then(|v| v.as_str()) {
            document = document.with_metadata(key, v.to_string());
        }
    }
    for key in ["duration_min_minutes", "duration_max_minutes"] {
        if let Some(v) = value.get(key).and_then(|v| v.as_i64()) {
            document = document.with_metadata(key, v);
        }
    }
    if let Some(v) = value.get("schedule_fee").and_then(|v| v.as_f64()) {
        document = document.with_metadata("schedule_fee", v);
    }

    Some(document)
}

/// Ingest every parseable line of `contents` into `index`, returning the
/// count of documents written. Unparseable lines are skipped, not fatal —
/// a malformed catalog row shouldn't abort the whole ingest run.
pub async fn ingest_catalog(index: &dyn CatalogIndex, contents: &str) -> Result<usize> {
    let mut count = 0;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(document) = parse_catalog_line(line) {
            index.upsert_document(document).await?;
            count += 1;
        } else {
            tracing::warn!(line, "skipping unparseable catalog line");
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ingests_valid_lines_and_skips_malformed_ones() {
        let index = InMemoryVectorIndex::new();
        let contents = "{\"code\":\"23\",\"description\":\"GP attendance\",\"group\":\"A1\"}\nnot json\n{\"code\":\"36\",\"description\":\"Longer attendance\"}\n";
        let count = ingest_catalog(&index, contents).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn clear_empties_the_index() {
        let index = InMemoryVectorIndex::new();
        ingest_catalog(&index, "{\"code\":\"23\",\"description\":\"GP attendance\"}\n").await.unwrap();
        index.clear_index().await.unwrap();
        assert_eq!(index.len(), 0);
    }
}
