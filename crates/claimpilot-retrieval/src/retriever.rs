//! The similarity retriever contract.

use async_trait::async_trait;
use claimpilot_types::{PolicyExcerpt, PolicySection};
use std::sync::Arc;

use crate::error::Result;

/// Finds the policy excerpts most similar to a query, within one payer.
///
/// Implementations return at most `top_k` excerpts sorted by descending
/// similarity, with scores in `[0, 1]`. No matches is a valid, empty result.
#[async_trait]
pub trait PolicyRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, payer: &str, top_k: usize) -> Result<Vec<PolicyExcerpt>>;
}

/// A retriever that can be shared across threads.
pub type SharedRetriever = Arc<dyn PolicyRetriever>;

/// Offline indexing operations shared by the index implementations.
#[async_trait]
pub trait PolicyIndexer: Send + Sync {
    /// Embed and store one section, replacing any section with the same id.
    async fn index_section(&self, section: PolicySection) -> Result<()>;

    /// Embed and store many sections. Returns how many were stored.
    async fn index_sections(&self, sections: Vec<PolicySection>) -> Result<usize> {
        let count = sections.len();
        for section in sections {
            self.index_section(section).await?;
        }
        Ok(count)
    }

    /// Payers with indexed sections, with their section counts, by name.
    async fn list_payers(&self) -> Result<Vec<(String, usize)>>;

    /// Number of indexed sections, optionally for one payer.
    async fn count_sections(&self, payer: Option<&str>) -> Result<usize>;

    /// Remove every section of a payer. Returns the number removed.
    async fn clear_payer(&self, payer: &str) -> Result<usize>;
}

/// Convert a cosine distance into a similarity score in `[0, 1]`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_from_distance() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        assert!((similarity_from_distance(0.25) - 0.75).abs() < 1e-6);
        assert_eq!(similarity_from_distance(1.6), 0.0);
        assert_eq!(similarity_from_distance(-0.1), 1.0);
        assert_eq!(similarity_from_distance(f32::NAN), 0.0);
    }
}
