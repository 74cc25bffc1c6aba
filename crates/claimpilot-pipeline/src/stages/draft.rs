use std::time::Duration;

use async_trait::async_trait;
use claimpilot_llm::SharedProvider;
use claimpilot_types::{ClaimInput, DenialCategory, PolicyExcerpt};
use tracing::{info, warn};

use super::{Stage, call_with_deadline};
use crate::prompts;
use crate::state::{RunState, StageName};

/// Writes the appeal letter from the category and retrieved excerpts.
///
/// Citations are the titles of the excerpts handed to the provider, never
/// text scraped from the letter. A failed call leaves an empty draft, which
/// the audit stage rejects.
pub struct DraftStage {
    provider: SharedProvider,
    timeout: Duration,
}

impl DraftStage {
    pub fn new(provider: SharedProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }
}

/// Unique section titles, in excerpt order.
pub fn citations_from(excerpts: &[PolicyExcerpt]) -> Vec<String> {
    let mut titles: Vec<String> = Vec::with_capacity(excerpts.len());
    for excerpt in excerpts {
        if !titles.iter().any(|t| t == &excerpt.section_title) {
            titles.push(excerpt.section_title.clone());
        }
    }
    titles
}

#[async_trait]
impl Stage for DraftStage {
    fn name(&self) -> StageName {
        StageName::Draft
    }

    async fn run(&self, claim: &ClaimInput, mut state: RunState) -> RunState {
        let category = state.category.unwrap_or(DenialCategory::Other);
        let excerpts = state.excerpts().to_vec();
        let prompt = prompts::draft_prompt(claim, category, &excerpts);
        state.draft_attempts += 1;

        let result = call_with_deadline(
            self.timeout,
            self.provider.generate(&prompt, Some(prompts::DRAFT_SYSTEM)),
        )
        .await;

        let (draft, citations) = match result {
            Ok(text) => (text.trim().to_string(), citations_from(&excerpts)),
            Err(message) => {
                warn!(run_id = %state.run_id, attempt = state.draft_attempts, error = %message, "Drafting failed");
                state.record_error(StageName::Draft, format!("Appeal drafting failed: {message}"));
                (String::new(), Vec::new())
            }
        };

        info!(
            run_id = %state.run_id,
            attempt = state.draft_attempts,
            draft_len = draft.len(),
            citations = citations.len(),
            provider = self.provider.name(),
            "Drafting finished"
        );
        state.draft_text = Some(draft);
        state.policy_citations = Some(citations);
        state
    }
}
