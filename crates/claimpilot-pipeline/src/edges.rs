//! Transition functions of the run state machine.
//!
//! Pure functions over [`RunState`]; the controller owns the side effects
//! (incrementing the retry counter, finishing the run).

use crate::state::{RoutingDecision, RunState};

/// Where the run goes after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteEdge {
    Classify,
    End,
}

/// Where the run goes after an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceEdge {
    /// The draft passed.
    Complete,
    /// Re-draft with the same category and excerpts.
    Retry,
    /// Retries are used up.
    Escalate,
}

/// Proceed only on an explicit `proceed` decision.
pub fn should_proceed(state: &RunState) -> RouteEdge {
    match state.routing_decision {
        Some(RoutingDecision::Proceed) => RouteEdge::Classify,
        Some(RoutingDecision::Reject) | None => RouteEdge::End,
    }
}

/// Decide the next step from the latest compliance report.
pub fn is_compliant(state: &RunState, max_retries: u32) -> ComplianceEdge {
    if state.compliance_passed() {
        ComplianceEdge::Complete
    } else if state.retry_count < max_retries {
        ComplianceEdge::Retry
    } else {
        ComplianceEdge::Escalate
    }
}
