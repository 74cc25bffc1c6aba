//! The run state threaded through every stage.

use chrono::{DateTime, Utc};
use claimpilot_types::{DenialCategory, PolicyExcerpt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Stage identity
// ─────────────────────────────────────────────────────────────────────────────

/// The five pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Validate,
    Classify,
    Retrieve,
    Draft,
    Audit,
}

impl StageName {
    /// Every stage, in pipeline order.
    pub const ALL: [StageName; 5] = [
        StageName::Validate,
        StageName::Classify,
        StageName::Retrieve,
        StageName::Draft,
        StageName::Audit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Validate => "validate",
            StageName::Classify => "classify",
            StageName::Retrieve => "retrieve",
            StageName::Draft => "draft",
            StageName::Audit => "audit",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State components
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingDecision {
    Proceed,
    Reject,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Input failed validation.
    Rejected,
    /// The draft passed audit and awaits human approval.
    Complete,
    /// Retries exhausted; the last draft and its issues need manual handling.
    Escalated,
    /// An unexpected fault stopped the run.
    Failed,
    /// The caller cancelled the run.
    Cancelled,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Rejected => "rejected",
            Outcome::Complete => "complete",
            Outcome::Escalated => "escalated",
            Outcome::Failed => "failed",
            Outcome::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four compliance sub-checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceChecks {
    pub tone_compliant: bool,
    pub citations_valid: bool,
    pub addresses_denial: bool,
    pub length_appropriate: bool,
}

impl ComplianceChecks {
    pub fn all_passed(&self) -> bool {
        self.tone_compliant && self.citations_valid && self.addresses_denial && self.length_appropriate
    }

    /// Names of the sub-checks that did not pass, in a fixed order.
    pub fn failed_checks(&self) -> Vec<&'static str> {
        [
            ("tone_compliant", self.tone_compliant),
            ("citations_valid", self.citations_valid),
            ("addresses_denial", self.addresses_denial),
            ("length_appropriate", self.length_appropriate),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Whether the audit produced a real evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Evaluation {
    Completed,
    /// The provider failed or its answer could not be parsed.
    Unavailable,
}

/// Result of one audit pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub passed: bool,
    pub checks: ComplianceChecks,
    pub issues: Vec<String>,
    pub evaluation: Evaluation,
}

impl ComplianceReport {
    /// A completed evaluation; `passed` is derived from the checks.
    ///
    /// A failing evaluation always carries at least one issue: when the
    /// auditor listed none, each failed sub-check becomes one.
    pub fn evaluated(checks: ComplianceChecks, mut issues: Vec<String>) -> Self {
        if !checks.all_passed() && issues.iter().all(|i| i.trim().is_empty()) {
            issues = checks
                .failed_checks()
                .into_iter()
                .map(|name| format!("{name} check failed"))
                .collect();
        }
        Self {
            passed: checks.all_passed(),
            checks,
            issues,
            evaluation: Evaluation::Completed,
        }
    }

    /// A deterministic failure with a single issue and no provider call.
    pub fn failed(issue: impl Into<String>) -> Self {
        Self {
            passed: false,
            checks: ComplianceChecks::default(),
            issues: vec![issue.into()],
            evaluation: Evaluation::Completed,
        }
    }

    /// A full failure because no evaluation could be obtained.
    pub fn unavailable() -> Self {
        Self {
            passed: false,
            checks: ComplianceChecks::default(),
            issues: vec![EVALUATION_UNAVAILABLE.to_string()],
            evaluation: Evaluation::Unavailable,
        }
    }
}

/// Issue recorded when the audit could not be evaluated.
pub const EVALUATION_UNAVAILABLE: &str = "evaluation could not be completed";

/// A soft failure absorbed by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: StageName,
    pub message: String,
}

/// Wall-clock time of one stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: StageName,
    pub duration_ms: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// RunState
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a run has decided so far.
///
/// Fields owned by a stage stay `None` until that stage runs, so a rejected
/// run carries no category, excerpts, draft or compliance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    // ── Validate ─────────────────────────────────────────────────────────
    pub routing_decision: Option<RoutingDecision>,
    pub validation_message: Option<String>,
    pub missing_fields: Vec<String>,

    // ── Classify / Retrieve ──────────────────────────────────────────────
    pub category: Option<DenialCategory>,
    pub policy_excerpts: Option<Vec<PolicyExcerpt>>,

    // ── Draft / Audit ────────────────────────────────────────────────────
    pub draft_text: Option<String>,
    pub policy_citations: Option<Vec<String>>,
    pub draft_attempts: u32,
    pub compliance: Option<ComplianceReport>,

    // ── Control ──────────────────────────────────────────────────────────
    pub retry_count: u32,
    pub errors: Vec<StageError>,
    pub error: Option<String>,
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub stage_timings: Vec<StageTiming>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    /// A fresh state with a new run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            routing_decision: None,
            validation_message: None,
            missing_fields: Vec::new(),
            category: None,
            policy_excerpts: None,
            draft_text: None,
            policy_citations: None,
            draft_attempts: 0,
            compliance: None,
            retry_count: 0,
            errors: Vec::new(),
            error: None,
            outcome: None,
            stage_timings: Vec::new(),
        }
    }

    /// Record a soft stage failure.
    pub fn record_error(&mut self, stage: StageName, message: impl Into<String>) {
        self.errors.push(StageError {
            stage,
            message: message.into(),
        });
    }

    /// Mark the run as ended.
    pub fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Excerpts seen by drafting, or an empty slice before retrieval.
    pub fn excerpts(&self) -> &[PolicyExcerpt] {
        self.policy_excerpts.as_deref().unwrap_or_default()
    }

    /// Issues of the latest audit, or none.
    pub fn compliance_issues(&self) -> &[String] {
        self.compliance
            .as_ref()
            .map(|c| c.issues.as_slice())
            .unwrap_or_default()
    }

    pub fn compliance_passed(&self) -> bool {
        self.compliance.as_ref().is_some_and(|c| c.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_blank() {
        let state = RunState::new();
        assert!(state.routing_decision.is_none());
        assert!(state.category.is_none());
        assert!(state.policy_excerpts.is_none());
        assert_eq!(state.retry_count, 0);
        assert!(!state.is_finished());
        assert!(state.excerpts().is_empty());
        assert!(state.compliance_issues().is_empty());
    }

    #[test]
    fn test_finish_sets_outcome_and_time() {
        let mut state = RunState::new();
        state.finish(Outcome::Escalated);
        assert_eq!(state.outcome, Some(Outcome::Escalated));
        assert!(state.finished_at.is_some());
    }

    #[test]
    fn test_report_constructors() {
        let all = ComplianceChecks {
            tone_compliant: true,
            citations_valid: true,
            addresses_denial: true,
            length_appropriate: true,
        };
        assert!(ComplianceReport::evaluated(all, vec![]).passed);

        let mut one_off = all;
        one_off.length_appropriate = false;
        assert!(!ComplianceReport::evaluated(one_off, vec![]).passed);

        let unavailable = ComplianceReport::unavailable();
        assert!(!unavailable.passed);
        assert_eq!(unavailable.evaluation, Evaluation::Unavailable);
        assert_eq!(unavailable.issues, vec![EVALUATION_UNAVAILABLE.to_string()]);
    }

    #[test]
    fn test_failing_report_without_issues_names_failed_checks() {
        let checks = ComplianceChecks {
            tone_compliant: true,
            citations_valid: false,
            addresses_denial: true,
            length_appropriate: false,
        };
        let report = ComplianceReport::evaluated(checks, vec![]);
        assert!(!report.passed);
        assert_eq!(
            report.issues,
            vec!["citations_valid check failed", "length_appropriate check failed"]
        );

        let listed = ComplianceReport::evaluated(checks, vec!["too long".to_string()]);
        assert_eq!(listed.issues, vec!["too long"]);

        let all = ComplianceChecks {
            tone_compliant: true,
            citations_valid: true,
            addresses_denial: true,
            length_appropriate: true,
        };
        assert!(ComplianceReport::evaluated(all, vec![]).issues.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let mut state = RunState::new();
        state.routing_decision = Some(RoutingDecision::Reject);
        state.record_error(StageName::Classify, "boom");
        state.finish(Outcome::Rejected);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["routing_decision"], "reject");
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["errors"][0]["stage"], "classify");
        assert!(json["category"].is_null());

        let back: RunState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
