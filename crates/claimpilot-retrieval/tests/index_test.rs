//! File-backed policy index tests.

use std::sync::Arc;

use claimpilot_llm::{MockEmbedder, SharedEmbedder};
use claimpilot_retrieval::{PolicyIndex, PolicyIndexer, PolicyRetriever, RetrievalError};
use claimpilot_types::PolicySection;
use tempfile::TempDir;

fn embedder(dims: usize) -> SharedEmbedder {
    Arc::new(MockEmbedder::new(dims))
}

fn sections() -> Vec<PolicySection> {
    vec![
        PolicySection::new(
            "Acme Health",
            "Section 4.1 Prior Authorization",
            "Prior authorization is required for advanced imaging such as MRI and CT scans.",
        ),
        PolicySection::new(
            "Acme Health",
            "Section 7.3 Medical Necessity",
            "Services are covered when medically necessary and supported by clinical documentation.",
        ),
        PolicySection::new(
            "Acme Health",
            "Section 9.2 Dental",
            "Routine dental cleanings are limited to two per year.",
        ),
        PolicySection::new(
            "Globex Insurance",
            "Article 2 Coding",
            "Claims must use valid CPT and ICD-10 codes for the date of service.",
        ),
    ]
}

#[tokio::test]
async fn test_retrieve_from_file_index() {
    let dir = TempDir::new().unwrap();
    let index = PolicyIndex::open(dir.path().join("policies.db"), embedder(256)).unwrap();
    assert_eq!(index.index_sections(sections()).await.unwrap(), 4);

    let excerpts = index
        .retrieve("MRI denied: prior authorization not obtained", "Acme Health", 2)
        .await
        .unwrap();

    assert_eq!(excerpts.len(), 2);
    assert_eq!(excerpts[0].section_title, "Section 4.1 Prior Authorization");
    assert!(excerpts[0].similarity_score >= excerpts[1].similarity_score);
    for excerpt in &excerpts {
        assert_eq!(excerpt.payer_name, "Acme Health");
        assert!((0.0..=1.0).contains(&excerpt.similarity_score));
    }
}

#[tokio::test]
async fn test_unknown_payer_returns_empty() {
    let index = PolicyIndex::open_in_memory(embedder(64)).unwrap();
    index.index_sections(sections()).await.unwrap();

    let excerpts = index.retrieve("anything", "Initech", 3).await.unwrap();
    assert!(excerpts.is_empty());
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("policies.db");

    {
        let index = PolicyIndex::open(&path, embedder(64)).unwrap();
        index.index_sections(sections()).await.unwrap();
    }

    let index = PolicyIndex::open(&path, embedder(64)).unwrap();
    assert_eq!(
        index.list_payers().await.unwrap(),
        vec![
            ("Acme Health".to_string(), 3),
            ("Globex Insurance".to_string(), 1)
        ]
    );
    assert_eq!(index.count_sections(Some("Globex Insurance")).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reopen_with_other_dimensions_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policies.db");

    PolicyIndex::open(&path, embedder(64)).unwrap();
    let err = PolicyIndex::open(&path, embedder(128)).unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::DimensionMismatch {
            expected: 64,
            actual: 128
        }
    ));
}

#[tokio::test]
async fn test_clear_payer() {
    let index = PolicyIndex::open_in_memory(embedder(64)).unwrap();
    index.index_sections(sections()).await.unwrap();

    assert_eq!(index.clear_payer("Acme Health").await.unwrap(), 3);
    assert!(
        index
            .retrieve("prior authorization", "Acme Health", 3)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(index.count_sections(None).await.unwrap(), 1);
}
