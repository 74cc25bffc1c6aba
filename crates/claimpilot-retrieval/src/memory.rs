//! Brute-force in-memory policy index.

use std::collections::BTreeMap;

use async_trait::async_trait;
use claimpilot_llm::{SharedEmbedder, cosine_similarity};
use claimpilot_types::{PolicyExcerpt, PolicySection};
use tokio::sync::RwLock;

use crate::error::{Result, RetrievalError};
use crate::retriever::{PolicyIndexer, PolicyRetriever};

/// Keeps every section and its embedding in memory and scores all of a
/// payer's sections on each query. Suited to tests and small policy sets.
pub struct InMemoryPolicyIndex {
    embedder: SharedEmbedder,
    entries: RwLock<Vec<(PolicySection, Vec<f32>)>>,
}

impl InMemoryPolicyIndex {
    pub fn new(embedder: SharedEmbedder) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PolicyRetriever for InMemoryPolicyIndex {
    async fn retrieve(&self, query: &str, payer: &str, top_k: usize) -> Result<Vec<PolicyExcerpt>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let entries = self.entries.read().await;

        let excerpts = entries
            .iter()
            .filter(|(section, _)| section.payer_name == payer)
            .map(|(section, embedding)| {
                let score = cosine_similarity(&query_embedding, embedding);
                section.clone().into_excerpt(score)
            })
            .collect();

        Ok(PolicyExcerpt::rank(excerpts, top_k))
    }
}

#[async_trait]
impl PolicyIndexer for InMemoryPolicyIndex {
    async fn index_section(&self, section: PolicySection) -> Result<()> {
        let embedding = self.embedder.embed(&section.section_text).await?;
        let dims = self.embedder.dimensions();
        if embedding.len() != dims {
            return Err(RetrievalError::DimensionMismatch {
                expected: dims,
                actual: embedding.len(),
            });
        }

        let mut entries = self.entries.write().await;
        entries.retain(|(existing, _)| existing.id != section.id);
        entries.push((section, embedding));
        Ok(())
    }

    async fn list_payers(&self) -> Result<Vec<(String, usize)>> {
        let entries = self.entries.read().await;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for (section, _) in entries.iter() {
            *counts.entry(section.payer_name.clone()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_sections(&self, payer: Option<&str>) -> Result<usize> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(section, _)| payer.is_none_or(|p| section.payer_name == p))
            .count())
    }

    async fn clear_payer(&self, payer: &str) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(section, _)| section.payer_name != payer);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimpilot_llm::MockEmbedder;
    use std::sync::Arc;

    fn index() -> InMemoryPolicyIndex {
        InMemoryPolicyIndex::new(Arc::new(MockEmbedder::new(128)))
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let index = index();
        index
            .index_sections(vec![
                PolicySection::new("Acme", "Dental", "Dental cleanings twice yearly"),
                PolicySection::new(
                    "Acme",
                    "Prior Authorization",
                    "Prior authorization is required for MRI imaging",
                ),
            ])
            .await
            .unwrap();

        let excerpts = index
            .retrieve("MRI denied without prior authorization", "Acme", 3)
            .await
            .unwrap();
        assert_eq!(excerpts.len(), 2);
        assert_eq!(excerpts[0].section_title, "Prior Authorization");
        assert!(excerpts[0].similarity_score >= excerpts[1].similarity_score);
        assert!(
            excerpts
                .iter()
                .all(|e| (0.0..=1.0).contains(&e.similarity_score))
        );
    }

    #[tokio::test]
    async fn test_retrieve_unknown_payer_is_empty() {
        let index = index();
        index
            .index_section(PolicySection::new("Acme", "t", "text"))
            .await
            .unwrap();
        assert!(index.retrieve("text", "Globex", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reindex_same_id_replaces() {
        let index = index();
        let mut section = PolicySection::new("Acme", "v1", "text");
        index.index_section(section.clone()).await.unwrap();
        section.section_title = "v2".to_string();
        index.index_section(section).await.unwrap();

        assert_eq!(index.count_sections(Some("Acme")).await.unwrap(), 1);
        assert_eq!(index.retrieve("text", "Acme", 1).await.unwrap()[0].section_title, "v2");
    }

    #[tokio::test]
    async fn test_payer_bookkeeping() {
        let index = index();
        index
            .index_sections(vec![
                PolicySection::new("Globex", "g", "x"),
                PolicySection::new("Acme", "a1", "y"),
                PolicySection::new("Acme", "a2", "z"),
            ])
            .await
            .unwrap();

        assert_eq!(
            index.list_payers().await.unwrap(),
            vec![("Acme".to_string(), 2), ("Globex".to_string(), 1)]
        );
        assert_eq!(index.clear_payer("Acme").await.unwrap(), 2);
        assert_eq!(index.count_sections(None).await.unwrap(), 1);
    }
}
