//! The five pipeline stages.
//!
//! A stage takes the claim and the current [`RunState`] and returns the
//! updated state. Stages never fail: provider and retriever errors, and
//! calls that outlive their deadline, are absorbed into the state according
//! to each stage's failure policy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use claimpilot_types::ClaimInput;

use crate::state::{RunState, StageName};

mod audit;
mod classify;
mod draft;
mod retrieve;
mod validate;

pub use audit::{AuditStage, parse_compliance};
pub use classify::ClassifyStage;
pub use draft::{DraftStage, citations_from};
pub use retrieve::RetrieveStage;
pub use validate::ValidateStage;

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    /// Apply the stage to `state` and return it.
    async fn run(&self, claim: &ClaimInput, state: RunState) -> RunState;
}

/// A stage that can be shared across concurrent runs.
pub type SharedStage = Arc<dyn Stage>;

/// Await an external call with a deadline.
///
/// Errors and timeouts come back as a message for [`RunState::record_error`].
pub(crate) async fn call_with_deadline<T, E, F>(deadline: Duration, call: F) -> Result<T, String>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("call timed out after {} ms", deadline.as_millis())),
    }
}
