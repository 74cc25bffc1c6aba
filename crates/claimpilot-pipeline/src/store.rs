//! Persistence of finished runs.
//!
//! The controller never touches storage; callers hand a finished
//! [`RunState`] and its claim to a [`RunStore`] once the run returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use claimpilot_types::ClaimInput;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::state::RunState;

/// Human sign-off on a stored run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run as written to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRun {
    pub claim: ClaimInput,
    pub state: RunState,
    pub stored_at: DateTime<Utc>,
    #[serde(default)]
    pub review: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
}

/// Accepts finished runs and returns an identifier for each.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Store a run. Returns the stored identifier.
    async fn save(&self, claim: &ClaimInput, state: &RunState) -> Result<String>;

    /// Load a stored run by identifier.
    async fn load(&self, id: &str) -> Result<StoredRun>;

    /// Identifiers of every stored run, sorted.
    async fn list(&self) -> Result<Vec<String>>;

    /// Record a review decision on a stored run and return the updated run.
    ///
    /// Setting [`ReviewStatus::Pending`] reopens the run and clears the
    /// previous decision.
    async fn review(
        &self,
        id: &str,
        status: ReviewStatus,
        note: Option<String>,
    ) -> Result<StoredRun>;
}

pub type SharedRunStore = Arc<dyn RunStore>;

/// One pretty-printed JSON file per run, named `<run_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonRunStore {
    dir: PathBuf,
}

impl JsonRunStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        // ids become file names
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(PipelineError::RunNotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    /// Write through a temp file so readers never see a partial record.
    async fn write(&self, id: &str, record: &StoredRun) -> Result<PathBuf> {
        let contents = serde_json::to_vec_pretty(record)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(id)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }
}

#[async_trait]
impl RunStore for JsonRunStore {
    async fn save(&self, claim: &ClaimInput, state: &RunState) -> Result<String> {
        let id = state.run_id.to_string();
        let record = StoredRun {
            claim: claim.clone(),
            state: state.clone(),
            stored_at: Utc::now(),
            review: ReviewStatus::Pending,
            reviewed_at: None,
            review_note: None,
        };
        let path = self.write(&id, &record).await?;

        tracing::info!(run_id = %id, path = %path.display(), "Run saved");
        Ok(id)
    }

    async fn load(&self, id: &str) -> Result<StoredRun> {
        let path = self.path_for(id)?;
        let contents = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::RunNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&contents)?)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn review(
        &self,
        id: &str,
        status: ReviewStatus,
        note: Option<String>,
    ) -> Result<StoredRun> {
        let mut record = self.load(id).await?;
        record.review = status;
        if status == ReviewStatus::Pending {
            record.reviewed_at = None;
            record.review_note = None;
        } else {
            record.reviewed_at = Some(Utc::now());
            record.review_note = note.filter(|n| !n.trim().is_empty());
        }
        self.write(id, &record).await?;

        tracing::info!(run_id = %id, review = %status, "Run reviewed");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Outcome;
    use crate::test_support::sample_claim;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStore::new(dir.path().join("runs"));

        let mut state = RunState::new();
        state.finish(Outcome::Complete);
        let id = store.save(&sample_claim(), &state).await.unwrap();

        assert_eq!(id, state.run_id.to_string());
        assert!(dir.path().join("runs").join(format!("{id}.json")).is_file());

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.claim, sample_claim());
        assert_eq!(store.list().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_missing_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStore::new(dir.path());

        assert!(matches!(
            store.load("does-not-exist").await,
            Err(PipelineError::RunNotFound(_))
        ));
        assert!(matches!(
            store.load("../escape").await,
            Err(PipelineError::RunNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_new_run_awaits_review() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStore::new(dir.path());
        let id = store.save(&sample_claim(), &RunState::new()).await.unwrap();

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.review, ReviewStatus::Pending);
        assert!(loaded.reviewed_at.is_none());
    }

    #[tokio::test]
    async fn test_review_persists_decision() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStore::new(dir.path());
        let mut state = RunState::new();
        state.finish(Outcome::Escalated);
        let id = store.save(&sample_claim(), &state).await.unwrap();

        let reviewed = store
            .review(&id, ReviewStatus::Approved, Some("tone fixed by hand".to_string()))
            .await
            .unwrap();
        assert_eq!(reviewed.review, ReviewStatus::Approved);
        assert!(reviewed.reviewed_at.is_some());

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.review, ReviewStatus::Approved);
        assert_eq!(loaded.review_note.as_deref(), Some("tone fixed by hand"));
        assert_eq!(loaded.state, state);
        assert_eq!(store.list().await.unwrap(), vec![id.clone()]);

        let reopened = store.review(&id, ReviewStatus::Pending, None).await.unwrap();
        assert_eq!(reopened.review, ReviewStatus::Pending);
        assert!(reopened.reviewed_at.is_none());
        assert!(reopened.review_note.is_none());
    }

    #[tokio::test]
    async fn test_review_missing_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStore::new(dir.path());
        assert!(matches!(
            store.review("nope", ReviewStatus::Rejected, None).await,
            Err(PipelineError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_record_without_review_fields_is_pending() {
        let record = serde_json::json!({
            "claim": sample_claim(),
            "state": RunState::new(),
            "stored_at": Utc::now(),
        });
        let run: StoredRun = serde_json::from_value(record).unwrap();
        assert_eq!(run.review, ReviewStatus::Pending);
        assert!(run.review_note.is_none());
    }

    #[tokio::test]
    async fn test_list_without_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRunStore::new(dir.path().join("never-created"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
