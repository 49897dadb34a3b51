//! BM25 lexical search — the sparse leg of the hybrid retriever's RRF
//! fusion, backed by `tantivy` (teacher's lexical engine, referenced as
//! `SparseIndex` from `retriever.rs` though the file itself wasn't in this
//! retrieval pack).

use std::sync::Arc;

use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Schema, TantivyDocument, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexWriter, ReloadPolicy};

use mbs_core::{Error, Result};

pub struct LexicalIndex {
    index: Index,
    writer: Mutex<IndexWriter>,
    id_field: tantivy::schema::Field,
    content_field: tantivy::schema::Field,
}

impl LexicalIndex {
    pub fn new() -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let content_field = schema_builder.add_text_field("content", TEXT | STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let writer = index
            .writer(16_000_000)
            .map_err(|e| Error::Rag(format!("tantivy writer init failed: {e}")))?;

        Ok(Self { index, writer: Mutex::new(writer), id_field, content_field })
    }

    pub fn upsert(&self, id: &str, content: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .add_document(doc!(self.id_field => id, self.content_field => content))
            .map_err(|e| Error::Rag(format!("tantivy add_document failed: {e}")))?;
        writer.commit().map_err(|e| Error::Rag(format!("tantivy commit failed: {e}")))?;
        Ok(())
    }

    /// Search by BM25 relevance, returning `(id, score)` pairs.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| Error::Rag(format!("tantivy reader init failed: {e}")))?;
        let searcher = reader.searcher();

        let query_parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        let parsed = query_parser
            .parse_query(&sanitize(query))
            .map_err(|e| Error::Rag(format!("tantivy query parse failed: {e}")))?;

        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(top_k.max(1)))
            .map_err(|e| Error::Rag(format!("tantivy search failed: {e}")))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let retrieved: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| Error::Rag(format!("tantivy doc fetch failed: {e}")))?;
            if let Some(id) = retrieved.get_first(self.id_field).and_then(|v| v.as_str()) {
                results.push((id.to_string(), score));
            }
        }
        Ok(results)
    }
}

/// `QueryParser` treats `:`/`+`/`-` as query syntax; the catalog query
/// string that reaches here has already had its `#constraints` block
/// stripped off by `constraints::parse_query`, but defensively strip any
/// leftover special characters so a stray colon doesn't error the parse.
fn sanitize(query: &str) -> String {
    query
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect()
}

pub type SharedLexicalIndex = Arc<LexicalIndex>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_documents_by_keyword() {
        let index = LexicalIndex::new().unwrap();
        index.upsert("23", "Professional attendance by a general practitioner").unwrap();
        index.upsert("110", "Comprehensive consultant physician assessment").unwrap();

        let results = index.search("general practitioner", 5).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, "23");
    }

    #[test]
    fn sanitize_strips_constraint_syntax() {
        assert_eq!(sanitize("gp:attendance"), "gp attendance");
    }
}
