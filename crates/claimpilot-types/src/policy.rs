//! Policy sections and retrieved excerpts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A section of a payer's policy document, as fed to the offline indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySection {
    #[serde(default = "new_section_id")]
    pub id: String,
    pub payer_name: String,
    pub section_title: String,
    pub section_text: String,
}

fn new_section_id() -> String {
    Uuid::new_v4().to_string()
}

impl PolicySection {
    /// Create a section with a fresh id.
    pub fn new(
        payer_name: impl Into<String>,
        section_title: impl Into<String>,
        section_text: impl Into<String>,
    ) -> Self {
        Self {
            id: new_section_id(),
            payer_name: payer_name.into(),
            section_title: section_title.into(),
            section_text: section_text.into(),
        }
    }

    /// Turn this section into an excerpt carrying a similarity score.
    pub fn into_excerpt(self, similarity_score: f32) -> PolicyExcerpt {
        PolicyExcerpt {
            id: self.id,
            section_title: self.section_title,
            section_text: self.section_text,
            payer_name: self.payer_name,
            similarity_score: similarity_score.clamp(0.0, 1.0),
        }
    }
}

/// A policy section returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyExcerpt {
    pub id: String,
    pub section_title: String,
    pub section_text: String,
    pub payer_name: String,
    /// Cosine similarity to the query, in `[0, 1]`.
    pub similarity_score: f32,
}

impl PolicyExcerpt {
    /// Sort excerpts by descending similarity and keep at most `top_k`.
    ///
    /// Ties keep their original relative order.
    pub fn rank(mut excerpts: Vec<PolicyExcerpt>, top_k: usize) -> Vec<PolicyExcerpt> {
        excerpts.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        excerpts.truncate(top_k);
        excerpts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpt(title: &str, score: f32) -> PolicyExcerpt {
        PolicySection::new("Acme", title, "text").into_excerpt(score)
    }

    #[test]
    fn test_into_excerpt_clamps_score() {
        assert_eq!(excerpt("a", 1.7).similarity_score, 1.0);
        assert_eq!(excerpt("b", -0.2).similarity_score, 0.0);
    }

    #[test]
    fn test_rank_sorts_and_bounds() {
        let ranked = PolicyExcerpt::rank(
            vec![excerpt("low", 0.1), excerpt("high", 0.9), excerpt("mid", 0.5)],
            2,
        );
        let titles: Vec<_> = ranked.iter().map(|e| e.section_title.as_str()).collect();
        assert_eq!(titles, vec!["high", "mid"]);
    }

    #[test]
    fn test_section_id_defaults_when_absent() {
        let section: PolicySection = serde_json::from_str(
            r#"{"payer_name": "Acme", "section_title": "5.2", "section_text": "Prior auth."}"#,
        )
        .unwrap();
        assert!(Uuid::parse_str(&section.id).is_ok());
    }
}
