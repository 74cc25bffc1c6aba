use async_trait::async_trait;
use claimpilot_types::ClaimInput;
use tracing::info;

use super::Stage;
use crate::state::{RoutingDecision, RunState, StageName};

/// Required-field presence check. The only hard gate of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateStage;

impl ValidateStage {
    /// The validation outcome for a claim, independent of any run.
    pub fn evaluate(claim: &ClaimInput) -> (RoutingDecision, String, Vec<String>) {
        let missing = claim.missing_fields();
        if missing.is_empty() {
            (
                RoutingDecision::Proceed,
                "Input validation passed".to_string(),
                missing,
            )
        } else {
            let message = format!("Missing required fields: {}", missing.join(", "));
            (RoutingDecision::Reject, message, missing)
        }
    }
}

#[async_trait]
impl Stage for ValidateStage {
    fn name(&self) -> StageName {
        StageName::Validate
    }

    async fn run(&self, claim: &ClaimInput, mut state: RunState) -> RunState {
        let (decision, message, missing) = Self::evaluate(claim);
        info!(
            run_id = %state.run_id,
            decision = ?decision,
            missing = missing.len(),
            "Validation finished"
        );
        state.routing_decision = Some(decision);
        state.validation_message = Some(message);
        state.missing_fields = missing;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_claim_proceeds() {
        let claim = ClaimInput::new("C-1", "CO-50", "Not medically necessary", "Acme");
        let state = ValidateStage.run(&claim, RunState::new()).await;

        assert_eq!(state.routing_decision, Some(RoutingDecision::Proceed));
        assert_eq!(state.validation_message.as_deref(), Some("Input validation passed"));
        assert!(state.missing_fields.is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_reject_in_order() {
        let mut claim = ClaimInput::new("C-1", "CO-50", "desc", "Acme");
        claim.payer_name = None;
        claim.claim_id = Some("   ".to_string());

        let state = ValidateStage.run(&claim, RunState::new()).await;
        assert_eq!(state.routing_decision, Some(RoutingDecision::Reject));
        assert_eq!(state.missing_fields, vec!["claim_id", "payer_name"]);
        assert_eq!(
            state.validation_message.as_deref(),
            Some("Missing required fields: claim_id, payer_name")
        );
    }

    #[tokio::test]
    async fn test_validate_is_idempotent() {
        let claim = ClaimInput {
            denial_code: Some("CO-16".to_string()),
            ..Default::default()
        };
        let first = ValidateStage.run(&claim, RunState::new()).await;
        let second = ValidateStage.run(&claim, first.clone()).await;

        assert_eq!(first.routing_decision, second.routing_decision);
        assert_eq!(first.missing_fields, second.missing_fields);
        assert_eq!(first.validation_message, second.validation_message);
    }
}
