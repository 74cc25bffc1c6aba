//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use claimpilot_llm::{
    GenerationSettings, Generator, MockBackend, MockEmbedder, MockResponse, SharedProvider,
};
use claimpilot_retrieval::{
    InMemoryPolicyIndex, PolicyIndexer, PolicyRetriever, RetrievalError, SharedRetriever,
};
use claimpilot_types::{ClaimInput, PolicyExcerpt, PolicySection};

pub const PASSING_AUDIT: &str = r#"{"tone_compliant": true, "citations_valid": true, "addresses_denial": true, "length_appropriate": true, "issues": []}"#;

pub fn sample_claim() -> ClaimInput {
    ClaimInput::new(
        "C-1001",
        "CO-197",
        "Prior authorization was not obtained for MRI of the lumbar spine",
        "Acme Health",
    )
}

pub fn mock_provider(responses: Vec<MockResponse>) -> (Arc<MockBackend>, SharedProvider) {
    let backend = Arc::new(MockBackend::new(responses));
    let provider = Generator::new(backend.clone(), GenerationSettings::new("mock-model", 0.0, 100));
    (backend, provider.shared())
}

pub fn excerpt(title: &str, score: f32) -> PolicyExcerpt {
    PolicyExcerpt {
        id: format!("sec-{}", title.to_lowercase().replace(' ', "-")),
        section_title: title.to_string(),
        section_text: format!("Policy text for {title}"),
        payer_name: "Acme Health".to_string(),
        similarity_score: score,
    }
}

pub async fn seeded_index() -> SharedRetriever {
    let index = InMemoryPolicyIndex::new(Arc::new(MockEmbedder::new(64)));
    index
        .index_sections(vec![
            PolicySection::new(
                "Acme Health",
                "Prior Authorization",
                "Prior authorization is required for MRI of the spine",
            ),
            PolicySection::new(
                "Acme Health",
                "Imaging Coverage",
                "Advanced imaging is covered when conservative therapy failed",
            ),
            PolicySection::new("Acme Health", "Dental", "Dental cleanings twice a year"),
            PolicySection::new("Globex Mutual", "Prior Authorization", "Globex rules"),
        ])
        .await
        .unwrap();
    Arc::new(index)
}

/// A retriever whose every call fails.
pub struct FailingRetriever;

#[async_trait]
impl PolicyRetriever for FailingRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _payer: &str,
        _top_k: usize,
    ) -> claimpilot_retrieval::Result<Vec<PolicyExcerpt>> {
        Err(RetrievalError::Internal("index unavailable".to_string()))
    }
}
