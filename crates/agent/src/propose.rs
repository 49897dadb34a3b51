//! The `propose`/`refine_propose` retry-and-accumulate loop — spec §4.6:
//! "retry up to 3 times accumulating unique codes until `topK+3` unique
//! non-banned results are collected or no more are available."

use std::collections::BTreeSet;

use mbs_core::{Document, Result};
use mbs_rag::Retriever;

const MAX_TRIES: usize = 3;

/// Query the retriever repeatedly, each retry excluding codes already
/// collected this call, until either `target` unique documents are in hand
/// or a retry comes back with nothing new.
pub async fn collect_unique(retriever: &Retriever, query: &str, target: usize, banned_codes: &BTreeSet<String>) -> Result<Vec<Document>> {
    let mut collected: Vec<Document> = Vec::new();
    let mut excluded = banned_codes.clone();

    for attempt in 0..MAX_TRIES {
        if collected.len() >= target {
            break;
        }
        let need = target - collected.len();
        let batch = retriever.search(query, need, &excluded).await?;

        if batch.is_empty() {
            tracing::debug!(attempt, collected = collected.len(), "propose retry returned no new candidates");
            break;
        }

        let mut found_new = false;
        for doc in batch {
            if excluded.insert(doc.id.clone()) {
                found_new = true;
                collected.push(doc);
            }
        }
        if !found_new {
            break;
        }
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_rag::{InMemoryVectorIndex, RetrieverConfig};
    use std::sync::Arc;

    fn seeded_retriever() -> Retriever {
        let index = InMemoryVectorIndex::new();
        index.upsert(Document::new("23", "GP attendance level B", 0.0));
        index.upsert(Document::new("36", "GP attendance level C", 0.0));
        index.upsert(Document::new("44", "GP attendance level D", 0.0));
        Retriever::new(Arc::new(index), RetrieverConfig::default())
    }

    #[tokio::test]
    async fn stops_once_target_reached() {
        let retriever = seeded_retriever();
        let docs = collect_unique(&retriever, "GP attendance", 2, &BTreeSet::new()).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn stops_when_no_more_available() {
        let retriever = seeded_retriever();
        let docs = collect_unique(&retriever, "GP attendance", 10, &BTreeSet::new()).await.unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[tokio::test]
    async fn excludes_banned_codes() {
        let retriever = seeded_retriever();
        let mut banned = BTreeSet::new();
        banned.insert("23".to_string());
        let docs = collect_unique(&retriever, "GP attendance", 5, &banned).await.unwrap();
        assert!(docs.iter().all(|d| d.id != "23"));
    }
}
