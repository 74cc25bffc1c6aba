use std::time::Duration;

use async_trait::async_trait;
use claimpilot_llm::SharedProvider;
use claimpilot_types::ClaimInput;
use serde_json::Value;
use tracing::{info, warn};

use super::{Stage, call_with_deadline};
use crate::prompts;
use crate::state::{ComplianceChecks, ComplianceReport, RunState, StageName};

/// Issue recorded for a draft with no text.
pub const EMPTY_DRAFT_ISSUE: &str = "draft is empty";

/// Checks the draft against the compliance criteria.
///
/// Parse failures are not retried here; they become a failed report with
/// `evaluation = unavailable` and the controller decides what happens next.
pub struct AuditStage {
    provider: SharedProvider,
    timeout: Duration,
}

impl AuditStage {
    pub fn new(provider: SharedProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }
}

/// Parse the auditor's reply.
///
/// Accepts prose or code fences around the object by taking everything from
/// the first `{` to the last `}`. Missing booleans read as `false`. Returns
/// `None` when no JSON object can be recovered.
pub fn parse_compliance(raw: &str) -> Option<(ComplianceChecks, Vec<String>)> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let object = value.as_object()?;
    let flag = |key: &str| object.get(key).and_then(Value::as_bool).unwrap_or(false);

    let checks = ComplianceChecks {
        tone_compliant: flag("tone_compliant"),
        citations_valid: flag("citations_valid"),
        addresses_denial: flag("addresses_denial"),
        length_appropriate: flag("length_appropriate"),
    };

    let issues = match object.get("issues") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    };

    Some((checks, issues))
}

#[async_trait]
impl Stage for AuditStage {
    fn name(&self) -> StageName {
        StageName::Audit
    }

    async fn run(&self, claim: &ClaimInput, mut state: RunState) -> RunState {
        let draft = state.draft_text.clone().unwrap_or_default();

        let report = if draft.trim().is_empty() {
            ComplianceReport::failed(EMPTY_DRAFT_ISSUE)
        } else {
            let prompt = prompts::audit_prompt(
                &draft,
                state.excerpts(),
                claim.denial_description_or_empty(),
            );
            let result = call_with_deadline(
                self.timeout,
                self.provider.generate(&prompt, Some(prompts::AUDIT_SYSTEM)),
            )
            .await;

            match result {
                Ok(raw) => match parse_compliance(&raw) {
                    Some((checks, issues)) => ComplianceReport::evaluated(checks, issues),
                    None => {
                        warn!(run_id = %state.run_id, response_len = raw.len(), "Compliance reply was not parsable");
                        state.record_error(
                            StageName::Audit,
                            "Compliance evaluation returned unparsable output",
                        );
                        ComplianceReport::unavailable()
                    }
                },
                Err(message) => {
                    warn!(run_id = %state.run_id, error = %message, "Compliance check failed");
                    state.record_error(StageName::Audit, format!("Compliance check failed: {message}"));
                    ComplianceReport::unavailable()
                }
            }
        };

        info!(
            run_id = %state.run_id,
            passed = report.passed,
            evaluation = ?report.evaluation,
            issues = report.issues.len(),
            "Compliance check finished"
        );
        state.compliance = Some(report);
        state
    }
}
