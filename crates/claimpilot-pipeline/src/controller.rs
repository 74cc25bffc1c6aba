//! The pipeline controller.
//!
//! Drives a run through `Validate → Classify → Retrieve → Draft → Audit`,
//! looping back to Draft while the audit fails and retries remain:
//!
//! ```text
//!   Validate ──reject──────────────────────────────────────▶ rejected
//!      │ proceed
//!      ▼
//!   Classify ─▶ Retrieve ─▶ Draft ─▶ Audit ──pass────────────▶ complete
//!                             ▲        │ fail, retries left
//!                             └────────┘
//!                                      │ fail, no retries left
//!                                      └─────────────────────▶ escalated
//! ```
//!
//! Cancellation is honoured between stages. A panicking stage ends the run
//! as `failed` with the state as it was before that stage.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use claimpilot_llm::SharedProvider;
use claimpilot_retrieval::SharedRetriever;
use claimpilot_types::ClaimInput;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::audit_log::{StageAuditLogger, StageRecord};
use crate::edges::{ComplianceEdge, RouteEdge, is_compliant, should_proceed};
use crate::error::{PipelineError, Result};
use crate::stages::{
    AuditStage, ClassifyStage, DraftStage, RetrieveStage, SharedStage, ValidateStage,
};
use crate::state::{Outcome, RunState, StageName, StageTiming};

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Knobs the controller and its stages consume.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Draft/Audit re-runs before escalation.
    pub max_compliance_retries: u32,
    /// Deadline for each provider and retriever call.
    pub call_timeout: Duration,
    /// Excerpts retrieved per run.
    pub top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_compliance_retries: 2,
            call_timeout: Duration::from_secs(120),
            top_k: 3,
        }
    }
}

impl PipelineSettings {
    pub fn with_max_compliance_retries(mut self, retries: u32) -> Self {
        self.max_compliance_retries = retries;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.call_timeout.is_zero() {
            return Err(PipelineError::InvalidSettings(
                "call_timeout must be greater than zero".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::InvalidSettings(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The stage implementations a pipeline runs.
#[derive(Clone)]
pub struct PipelineStages {
    pub validate: SharedStage,
    pub classify: SharedStage,
    pub retrieve: SharedStage,
    pub draft: SharedStage,
    pub audit: SharedStage,
}

impl PipelineStages {
    /// Check that each slot holds the stage it is named for.
    pub fn validate(&self) -> Result<()> {
        for slot in StageName::ALL {
            let found = self.get(slot).name();
            if found != slot {
                return Err(PipelineError::MisplacedStage { slot, found });
            }
        }
        Ok(())
    }

    fn get(&self, name: StageName) -> &SharedStage {
        match name {
            StageName::Validate => &self.validate,
            StageName::Classify => &self.classify,
            StageName::Retrieve => &self.retrieve,
            StageName::Draft => &self.draft,
            StageName::Audit => &self.audit,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AppealPipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Runs claims through the appeal pipeline.
///
/// Cheap to share: independent runs may execute concurrently against one
/// pipeline, each owning its own [`RunState`].
#[derive(Clone)]
pub struct AppealPipeline {
    stages: PipelineStages,
    settings: PipelineSettings,
    audit_log: Option<Arc<StageAuditLogger>>,
}

impl std::fmt::Debug for AppealPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppealPipeline")
            .field("settings", &self.settings)
            .field("audit_log", &self.audit_log.is_some())
            .finish_non_exhaustive()
    }
}

impl AppealPipeline {
    /// Build the standard stages around a provider per generating stage and
    /// a retriever.
    pub fn new(
        classifier: SharedProvider,
        drafter: SharedProvider,
        auditor: SharedProvider,
        retriever: SharedRetriever,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let timeout = settings.call_timeout;
        let stages = PipelineStages {
            validate: Arc::new(ValidateStage),
            classify: Arc::new(ClassifyStage::new(classifier, timeout)),
            retrieve: Arc::new(RetrieveStage::new(retriever, settings.top_k, timeout)),
            draft: Arc::new(DraftStage::new(drafter, timeout)),
            audit: Arc::new(AuditStage::new(auditor, timeout)),
        };
        Self::from_stages(stages, settings)
    }

    /// Use custom stage implementations.
    pub fn from_stages(stages: PipelineStages, settings: PipelineSettings) -> Result<Self> {
        settings.validate()?;
        stages.validate()?;
        Ok(Self {
            stages,
            settings,
            audit_log: None,
        })
    }

    /// Record every stage execution to `logger`.
    pub fn with_audit_log(mut self, logger: Arc<StageAuditLogger>) -> Self {
        self.audit_log = Some(logger);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run a claim to a terminal state.
    pub async fn run(&self, claim: ClaimInput) -> RunState {
        self.run_with_cancellation(claim, CancellationToken::new())
            .await
    }

    /// Run a claim, stopping at the next stage boundary once `cancel` fires.
    ///
    /// Always returns a state with `outcome` set.
    pub async fn run_with_cancellation(
        &self,
        claim: ClaimInput,
        cancel: CancellationToken,
    ) -> RunState {
        let mut state = RunState::new();
        info!(
            run_id = %state.run_id,
            claim_id = claim.claim_id_or_empty(),
            "Appeal run started"
        );

        let mut next = StageName::Validate;
        loop {
            if cancel.is_cancelled() {
                info!(run_id = %state.run_id, before = %next, "Run cancelled");
                state.finish(Outcome::Cancelled);
                break;
            }

            match self.execute(next, &claim, state).await {
                Ok(updated) => state = updated,
                Err(failed) => {
                    state = failed;
                    break;
                }
            }

            next = match next {
                StageName::Validate => match should_proceed(&state) {
                    RouteEdge::Classify => StageName::Classify,
                    RouteEdge::End => {
                        state.finish(Outcome::Rejected);
                        break;
                    }
                },
                StageName::Classify => StageName::Retrieve,
                StageName::Retrieve => StageName::Draft,
                StageName::Draft => StageName::Audit,
                StageName::Audit => {
                    match is_compliant(&state, self.settings.max_compliance_retries) {
                        ComplianceEdge::Complete => {
                            state.finish(Outcome::Complete);
                            break;
                        }
                        ComplianceEdge::Retry => {
                            state.retry_count += 1;
                            info!(
                                run_id = %state.run_id,
                                retry = state.retry_count,
                                max = self.settings.max_compliance_retries,
                                "Compliance failed, re-drafting"
                            );
                            StageName::Draft
                        }
                        ComplianceEdge::Escalate => {
                            state.finish(Outcome::Escalated);
                            break;
                        }
                    }
                }
            };
        }

        info!(
            run_id = %state.run_id,
            outcome = ?state.outcome,
            retry_count = state.retry_count,
            soft_errors = state.errors.len(),
            "Appeal run finished"
        );
        state
    }

    /// Run one stage, catching a panic.
    ///
    /// On panic the returned `Err` holds the pre-stage state marked failed.
    async fn execute(
        &self,
        name: StageName,
        claim: &ClaimInput,
        state: RunState,
    ) -> std::result::Result<RunState, RunState> {
        let stage = self.stages.get(name);
        let snapshot = state.clone();
        let started = Instant::now();

        let outcome = AssertUnwindSafe(stage.run(claim, state))
            .catch_unwind()
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(mut state) => {
                state.stage_timings.push(StageTiming {
                    stage: name,
                    duration_ms,
                });
                self.record(name, claim, &state, duration_ms);
                Ok(state)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(run_id = %snapshot.run_id, stage = %name, panic = %message, "Stage panicked");

                let mut failed = snapshot;
                failed.error = Some(format!("Unexpected failure in {name} stage: {message}"));
                failed.finish(Outcome::Failed);
                Err(failed)
            }
        }
    }

    fn record(&self, name: StageName, claim: &ClaimInput, state: &RunState, duration_ms: u64) {
        info!(run_id = %state.run_id, stage = %name, duration_ms, "Stage finished");

        if let Some(ref logger) = self.audit_log {
            let record = StageRecord::from_stage(name, claim, state, duration_ms);
            if let Err(e) = logger.log(&record) {
                warn!(run_id = %state.run_id, stage = %name, error = %e, "Failed to write stage audit record");
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.max_compliance_retries, 2);
        assert_eq!(settings.call_timeout, Duration::from_secs(120));
        assert_eq!(settings.top_k, 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let zero_timeout = PipelineSettings::default().with_call_timeout(Duration::ZERO);
        assert!(matches!(
            zero_timeout.validate(),
            Err(PipelineError::InvalidSettings(_))
        ));
        assert!(PipelineSettings::default().with_top_k(0).validate().is_err());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
