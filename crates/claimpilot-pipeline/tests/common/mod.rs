#![allow(dead_code)]

use std::sync::Arc;

use claimpilot_llm::{GenerationSettings, Generator, MockBackend, MockEmbedder, MockResponse};
use claimpilot_pipeline::{AppealPipeline, PipelineSettings};
use claimpilot_retrieval::{InMemoryPolicyIndex, PolicyIndexer, SharedRetriever};
use claimpilot_types::{ClaimInput, PolicySection};

pub const PAYER: &str = "Acme Health";

pub fn audit_json(passed: bool, issues: &[&str]) -> String {
    serde_json::json!({
        "tone_compliant": true,
        "citations_valid": true,
        "addresses_denial": true,
        "length_appropriate": passed,
        "issues": issues,
    })
    .to_string()
}

pub fn claim() -> ClaimInput {
    ClaimInput::new(
        "C-2001",
        "CO-197",
        "Prior authorization was not obtained for MRI of the lumbar spine",
        PAYER,
    )
}

pub async fn seeded_retriever() -> SharedRetriever {
    let index = InMemoryPolicyIndex::new(Arc::new(MockEmbedder::new(64)));
    index
        .index_sections(vec![
            PolicySection::new(
                PAYER,
                "Prior Authorization",
                "Prior authorization is required for MRI of the spine",
            ),
            PolicySection::new(
                PAYER,
                "Retroactive Authorization",
                "Retroactive authorization may be granted within 14 days of service",
            ),
            PolicySection::new(
                PAYER,
                "Imaging Coverage",
                "Advanced imaging is covered when conservative therapy failed",
            ),
            PolicySection::new(PAYER, "Dental", "Dental cleanings twice a year"),
            PolicySection::new("Globex Mutual", "Globex Imaging", "Globex imaging rules"),
        ])
        .await
        .unwrap();
    Arc::new(index)
}

/// A pipeline over scripted backends, one per generating stage.
pub struct Harness {
    pub classifier: Arc<MockBackend>,
    pub drafter: Arc<MockBackend>,
    pub auditor: Arc<MockBackend>,
    pub pipeline: AppealPipeline,
}

impl Harness {
    pub async fn new(
        classify: Vec<MockResponse>,
        draft: Vec<MockResponse>,
        audit: Vec<MockResponse>,
        settings: PipelineSettings,
    ) -> Self {
        Self::with_retriever(classify, draft, audit, settings, seeded_retriever().await)
    }

    pub fn with_retriever(
        classify: Vec<MockResponse>,
        draft: Vec<MockResponse>,
        audit: Vec<MockResponse>,
        settings: PipelineSettings,
        retriever: SharedRetriever,
    ) -> Self {
        let classifier = Arc::new(MockBackend::new(classify).with_name("mock-classify"));
        let drafter = Arc::new(MockBackend::new(draft).with_name("mock-draft"));
        let auditor = Arc::new(MockBackend::new(audit).with_name("mock-audit"));

        let pipeline = AppealPipeline::new(
            Generator::new(classifier.clone(), GenerationSettings::new("m", 0.0, 100)).shared(),
            Generator::new(drafter.clone(), GenerationSettings::new("m", 0.3, 1500)).shared(),
            Generator::new(auditor.clone(), GenerationSettings::new("m", 0.0, 500)).shared(),
            retriever,
            settings,
        )
        .unwrap();

        Self {
            classifier,
            drafter,
            auditor,
            pipeline,
        }
    }
}
