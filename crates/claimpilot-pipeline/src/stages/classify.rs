use std::time::Duration;

use async_trait::async_trait;
use claimpilot_llm::SharedProvider;
use claimpilot_types::{ClaimInput, DenialCategory};
use tracing::{info, warn};

use super::{Stage, call_with_deadline};
use crate::prompts;
use crate::state::{RunState, StageName};

/// Assigns one of the five denial categories.
///
/// Falls back to [`DenialCategory::Other`] when the provider fails, times
/// out, or answers with no recognizable label.
pub struct ClassifyStage {
    provider: SharedProvider,
    timeout: Duration,
}

impl ClassifyStage {
    pub fn new(provider: SharedProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }
}

#[async_trait]
impl Stage for ClassifyStage {
    fn name(&self) -> StageName {
        StageName::Classify
    }

    async fn run(&self, claim: &ClaimInput, mut state: RunState) -> RunState {
        let prompt = prompts::classify_prompt(claim);
        let result = call_with_deadline(
            self.timeout,
            self.provider.generate(&prompt, Some(prompts::CLASSIFY_SYSTEM)),
        )
        .await;

        let category = match result {
            Ok(text) => DenialCategory::from_model_output(text.trim()),
            Err(message) => {
                warn!(run_id = %state.run_id, error = %message, "Classification failed, using Other");
                state.record_error(StageName::Classify, format!("Classification failed: {message}"));
                DenialCategory::Other
            }
        };

        info!(
            run_id = %state.run_id,
            category = %category,
            provider = self.provider.name(),
            "Classification finished"
        );
        state.category = Some(category);
        state
    }
}
