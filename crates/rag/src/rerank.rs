//! Fusion and reranking — spec §4.3 steps 4-5.
//!
//! Grounded on the teacher's `HybridRetriever::rrf_fusion` (Reciprocal Rank
//! Fusion across dense/sparse legs) and `SimpleScorer` (the keyword-overlap
//! fallback the teacher's reranker uses when no cross-encoder model is
//! loaded — this system never loads one, so that fallback is the only
//! reranking stage here).

use std::collections::HashMap;

use mbs_core::Document;

#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    pub dense_weight: f32,
    pub rrf_k: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { dense_weight: 0.6, rrf_k: 60.0 }
    }
}

/// Reciprocal Rank Fusion of a dense result list and a lexical `(id, score)`
/// list into one ranked `Document` list.
pub fn rrf_fuse(dense: &[Document], lexical: &[(String, f32)], config: FusionConfig) -> Vec<Document> {
    let mut fused: HashMap<String, (f32, Document)> = HashMap::new();

    for (rank, doc) in dense.iter().enumerate() {
        let weighted = config.dense_weight / (config.rrf_k + rank as f32 + 1.0);
        fused
            .entry(doc.id.clone())
            .and_modify(|(score, _)| *score += weighted)
            .or_insert((weighted, doc.clone()));
    }

    let lexical_weight = 1.0 - config.dense_weight;
    for (rank, (id, _score)) in lexical.iter().enumerate() {
        let weighted = lexical_weight / (config.rrf_k + rank as f32 + 1.0);
        if let Some((score, _)) = fused.get_mut(id) {
            *score += weighted;
        }
        // A lexical-only hit with no dense counterpart is dropped: every
        // candidate must be embeddable and present in the vector index, so
        // a lexical match absent from dense results indicates a stale
        // lexical entry rather than a true candidate (spec §4.3 note).
    }

    let mut results: Vec<(f32, Document)> = fused.into_values().collect();
    results.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    results
        .into_iter()
        .map(|(score, mut doc)| {
            doc.score = score;
            doc
        })
        .collect()
}

/// Keyword-overlap scorer (Jaccard over whitespace tokens) — the teacher's
/// `SimpleScorer` fallback.
pub struct SimpleScorer;

impl SimpleScorer {
    pub fn score(query: &str, document: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let doc_lower = document.to_lowercase();
        let query_words: std::collections::HashSet<&str> = query_lower.split_whitespace().collect();
        let doc_words: std::collections::HashSet<&str> = doc_lower.split_whitespace().collect();

        let overlap = query_words.intersection(&doc_words).count();
        let union = query_words.union(&doc_words).count();

        if union > 0 {
            overlap as f32 / union as f32
        } else {
            0.0
        }
    }
}

/// Combine the fused retrieval score with a keyword-overlap rerank score,
/// the same 0.3/0.7 blend the teacher's fallback reranker uses.
pub fn composite_rerank(query: &str, docs: Vec<Document>) -> Vec<Document> {
    let mut scored: Vec<Document> = docs
        .into_iter()
        .map(|mut doc| {
            let keyword_score = SimpleScorer::score(query, &doc.content);
            doc.score = doc.score * 0.3 + keyword_score * 0.7;
            doc
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_boosts_docs_present_in_both_legs() {
        let dense = vec![Document::new("1", "doc1", 0.9), Document::new("2", "doc2", 0.8)];
        let lexical = vec![("2".to_string(), 0.85), ("3".to_string(), 0.7)];

        let fused = rrf_fuse(&dense, &lexical, FusionConfig::default());
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].id, "2");
    }

    #[test]
    fn simple_scorer_rewards_overlap() {
        let score = SimpleScorer::score("gp attendance review", "GP attendance, review consultation");
        assert!(score > 0.0);
    }

    #[test]
    fn composite_rerank_reorders_by_blended_score() {
        let docs = vec![
            Document::new("1", "unrelated content about surgery", 0.95),
            Document::new("2", "gp attendance review consultation", 0.5),
        ];
        let reranked = composite_rerank("gp attendance review", docs);
        assert_eq!(reranked[0].id, "2");
    }
}
