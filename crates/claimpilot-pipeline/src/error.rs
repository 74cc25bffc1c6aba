//! Error types for the pipeline crate.
//!
//! Stages never return these: a stage absorbs its own failures into the run
//! state. They cover the collaborators around a run (persistence, the audit
//! log, pipeline construction).

use thiserror::Error;

use crate::state::StageName;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur outside of a running stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid pipeline settings.
    #[error("Invalid pipeline settings: {0}")]
    InvalidSettings(String),

    /// A stage was installed in another stage's slot.
    #[error("Stage {found} installed in the {slot} slot")]
    MisplacedStage { slot: StageName, found: StageName },

    /// Stored run not found.
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Filesystem failure in a store or log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
