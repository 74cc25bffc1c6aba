use std::time::Duration;

use async_trait::async_trait;
use claimpilot_retrieval::SharedRetriever;
use claimpilot_types::{ClaimInput, PolicyExcerpt};
use tracing::{info, warn};

use super::{Stage, call_with_deadline};
use crate::state::{RunState, StageName};

/// Fetches the payer's policy sections closest to the denial description.
pub struct RetrieveStage {
    retriever: SharedRetriever,
    top_k: usize,
    timeout: Duration,
}

impl RetrieveStage {
    pub fn new(retriever: SharedRetriever, top_k: usize, timeout: Duration) -> Self {
        Self {
            retriever,
            top_k,
            timeout,
        }
    }
}

#[async_trait]
impl Stage for RetrieveStage {
    fn name(&self) -> StageName {
        StageName::Retrieve
    }

    async fn run(&self, claim: &ClaimInput, mut state: RunState) -> RunState {
        let query = claim.denial_description_or_empty();
        let payer = claim.payer_name_or_empty();

        let result = call_with_deadline(
            self.timeout,
            self.retriever.retrieve(query, payer, self.top_k),
        )
        .await;

        let excerpts = match result {
            // at most top_k, descending, whatever the retriever returned
            Ok(found) => PolicyExcerpt::rank(found, self.top_k),
            Err(message) => {
                warn!(run_id = %state.run_id, error = %message, "Retrieval failed, continuing without excerpts");
                state.record_error(StageName::Retrieve, format!("Policy retrieval failed: {message}"));
                Vec::new()
            }
        };

        info!(
            run_id = %state.run_id,
            num_excerpts = excerpts.len(),
            top_similarity = excerpts.first().map(|e| e.similarity_score).unwrap_or(0.0),
            top_k = self.top_k,
            "Retrieval finished"
        );
        state.policy_excerpts = Some(excerpts);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingRetriever, sample_claim, seeded_index};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retrieves_sorted_and_bounded() {
        let retriever = seeded_index().await;
        let state = RetrieveStage::new(retriever, 2, Duration::from_secs(5))
            .run(&sample_claim(), RunState::new())
            .await;

        let excerpts = state.policy_excerpts.unwrap();
        assert_eq!(excerpts.len(), 2);
        assert!(excerpts[0].similarity_score >= excerpts[1].similarity_score);
        assert!(excerpts.iter().all(|e| e.payer_name == "Acme Health"));
        assert!(state.errors.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_payer_is_empty_not_error() {
        let retriever = seeded_index().await;
        let mut claim = sample_claim();
        claim.payer_name = Some("Nobody Mutual".to_string());

        let state = RetrieveStage::new(retriever, 3, Duration::from_secs(5))
            .run(&claim, RunState::new())
            .await;
        assert_eq!(state.policy_excerpts, Some(vec![]));
        assert!(state.errors.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_empty_with_error() {
        let state = RetrieveStage::new(Arc::new(FailingRetriever), 3, Duration::from_secs(5))
            .run(&sample_claim(), RunState::new())
            .await;
        assert_eq!(state.policy_excerpts, Some(vec![]));
        assert_eq!(state.errors[0].stage, StageName::Retrieve);
    }

    /// Answers only after a long pause.
    struct SlowRetriever;

    #[async_trait]
    impl claimpilot_retrieval::PolicyRetriever for SlowRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _payer: &str,
            _top_k: usize,
        ) -> claimpilot_retrieval::Result<Vec<PolicyExcerpt>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![crate::test_support::excerpt("Prior Authorization", 0.9)])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_empty_with_error() {
        let state = RetrieveStage::new(Arc::new(SlowRetriever), 3, Duration::from_secs(2))
            .run(&sample_claim(), RunState::new())
            .await;

        assert_eq!(state.policy_excerpts, Some(vec![]));
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].stage, StageName::Retrieve);
        assert!(state.errors[0].message.contains("timed out after 2000 ms"));
    }
}
