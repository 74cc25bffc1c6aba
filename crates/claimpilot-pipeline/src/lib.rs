//! Appeal drafting pipeline for ClaimPilot.
//!
//! A run threads one [`RunState`] through five stages:
//!
//! 1. **Validate** checks required claim fields and may reject the run
//! 2. **Classify** assigns a [`DenialCategory`](claimpilot_types::DenialCategory)
//! 3. **Retrieve** fetches the payer's most relevant policy excerpts
//! 4. **Draft** writes the appeal letter and its citations
//! 5. **Audit** checks the letter for compliance
//!
//! [`AppealPipeline`] wires them together with the routing in [`edges`],
//! retrying Draft/Audit until the audit passes or retries run out.
//!
//! # Example
//!
//! ```rust,ignore
//! let pipeline = AppealPipeline::new(classifier, drafter, auditor, retriever,
//!     PipelineSettings::default())?;
//! let state = pipeline.run(claim).await;
//! println!("{:?}: {:?}", state.outcome, state.draft_text);
//! ```

pub mod audit_log;
pub mod controller;
pub mod edges;
pub mod error;
pub mod prompts;
pub mod stages;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit_log::{StageAuditConfig, StageAuditLogger, StageRecord};
pub use controller::{AppealPipeline, PipelineSettings, PipelineStages};
pub use edges::{ComplianceEdge, RouteEdge, is_compliant, should_proceed};
pub use error::{PipelineError, Result};
pub use stages::{
    AuditStage, ClassifyStage, DraftStage, RetrieveStage, SharedStage, Stage, ValidateStage,
};
pub use state::{
    ComplianceChecks, ComplianceReport, Evaluation, Outcome, RoutingDecision, RunState,
    StageError, StageName, StageTiming,
};
pub use store::{JsonRunStore, ReviewStatus, RunStore, SharedRunStore, StoredRun};

pub use tokio_util::sync::CancellationToken;
