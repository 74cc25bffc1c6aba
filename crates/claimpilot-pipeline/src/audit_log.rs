//! Stage audit trail.
//!
//! Every stage execution becomes one [`StageRecord`] appended to a
//! daily-rotating JSONL file. Records carry ids, counts, lengths and
//! decisions only, never claim text or letter text.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use claimpilot_types::ClaimInput;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::Result;
use crate::state::{RunState, StageName};

const FILE_PREFIX: &str = "stages-";
const FILE_SUFFIX: &str = ".jsonl";

// ─────────────────────────────────────────────────────────────────────────────
// Record
// ─────────────────────────────────────────────────────────────────────────────

/// One stage execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub id: String,
    pub run_id: Uuid,
    pub claim_id: String,
    pub stage: StageName,
    /// RFC 3339 time the stage finished.
    pub timestamp: String,
    pub duration_ms: u64,
    pub input: Value,
    pub output: Value,
}

impl StageRecord {
    /// Summarize a finished stage from the claim and the state it produced.
    pub fn from_stage(
        stage: StageName,
        claim: &ClaimInput,
        state: &RunState,
        duration_ms: u64,
    ) -> Self {
        let (input, output) = summarize(stage, claim, state);
        Self {
            id: Uuid::new_v4().to_string(),
            run_id: state.run_id,
            claim_id: claim.claim_id_or_empty().to_string(),
            stage,
            timestamp: Utc::now().to_rfc3339(),
            duration_ms,
            input,
            output,
        }
    }
}

fn summarize(stage: StageName, claim: &ClaimInput, state: &RunState) -> (Value, Value) {
    let stage_errors = state.errors.iter().filter(|e| e.stage == stage).count();

    match stage {
        StageName::Validate => (
            json!({ "missing_count": state.missing_fields.len() }),
            json!({
                "routing_decision": state.routing_decision,
                "missing_fields": state.missing_fields,
            }),
        ),
        StageName::Classify => (
            json!({ "denial_code": claim.denial_code_or_empty() }),
            json!({ "category": state.category, "errors": stage_errors }),
        ),
        StageName::Retrieve => (
            json!({
                "payer_name": claim.payer_name_or_empty(),
                "query_len": claim.denial_description_or_empty().len(),
            }),
            json!({
                "num_excerpts": state.excerpts().len(),
                "top_similarity": state.excerpts().first().map(|e| e.similarity_score),
                "errors": stage_errors,
            }),
        ),
        StageName::Draft => (
            json!({
                "category": state.category,
                "num_excerpts": state.excerpts().len(),
                "attempt": state.draft_attempts,
            }),
            json!({
                "draft_len": state.draft_text.as_deref().map(str::len).unwrap_or(0),
                "citations": state.policy_citations.as_ref().map(Vec::len).unwrap_or(0),
                "errors": stage_errors,
            }),
        ),
        StageName::Audit => (
            json!({
                "draft_len": state.draft_text.as_deref().map(str::len).unwrap_or(0),
                "retry_count": state.retry_count,
            }),
            json!({
                "passed": state.compliance_passed(),
                "evaluation": state.compliance.as_ref().map(|c| c.evaluation),
                "issues": state.compliance_issues().len(),
            }),
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logger
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the stage audit log.
#[derive(Debug, Clone)]
pub struct StageAuditConfig {
    pub enabled: bool,
    /// Directory for JSONL files.
    pub dir: PathBuf,
    /// Days to retain log files.
    pub retention_days: u32,
}

impl StageAuditConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            dir: dir.into(),
            retention_days: 90,
        }
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::new(),
            retention_days: 0,
        }
    }
}

/// Thread-safe JSONL writer with daily file rotation.
pub struct StageAuditLogger {
    config: StageAuditConfig,
    state: Mutex<WriterState>,
}

struct WriterState {
    current_date: Option<NaiveDate>,
    writer: Option<BufWriter<File>>,
}

impl StageAuditLogger {
    /// Create a new logger. Runs retention cleanup on init.
    pub fn new(config: StageAuditConfig) -> Result<Self> {
        if config.enabled {
            fs::create_dir_all(&config.dir)?;
            cleanup_old_files(&config.dir, config.retention_days)?;
        }

        Ok(Self {
            config,
            state: Mutex::new(WriterState {
                current_date: None,
                writer: None,
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Append a record. No-op if disabled.
    pub fn log(&self, record: &StageRecord) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let line = serde_json::to_string(record)?;
        let today = Utc::now().date_naive();
        let mut state = self
            .state
            .lock()
            .map_err(|_| std::io::Error::other("audit log writer lock poisoned"))?;

        if state.current_date != Some(today) {
            let path = log_file_path(&self.config.dir, today);
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            state.writer = Some(BufWriter::new(file));
            state.current_date = Some(today);
        }

        if let Some(ref mut w) = state.writer {
            writeln!(w, "{}", line)?;
            w.flush()?;
        }

        tracing::debug!(
            run_id = %record.run_id,
            stage = %record.stage,
            duration_ms = record.duration_ms,
            "stage record logged"
        );

        Ok(())
    }
}

fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{date}{FILE_SUFFIX}"))
}

/// Delete JSONL files older than `retention_days`.
fn cleanup_old_files(dir: &Path, retention_days: u32) -> Result<()> {
    let cutoff = Utc::now().date_naive() - chrono::Duration::days(i64::from(retention_days));

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if let Some(date_str) = name
            .strip_prefix(FILE_PREFIX)
            .and_then(|s| s.strip_suffix(FILE_SUFFIX))
            && let Ok(file_date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            && file_date < cutoff
        {
            fs::remove_file(entry.path())?;
            tracing::info!(file = %name, "removed expired stage audit log");
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RoutingDecision;
    use crate::test_support::sample_claim;

    fn validated() -> RunState {
        let mut state = RunState::new();
        state.routing_decision = Some(RoutingDecision::Proceed);
        state
    }

    #[test]
    fn test_record_has_no_claim_text() {
        let claim = sample_claim();
        let mut state = validated();
        state.draft_text = Some("Dear Committee, my patient".to_string());
        state.draft_attempts = 1;

        let record = StageRecord::from_stage(StageName::Draft, &claim, &state, 12);
        let json = serde_json::to_string(&record).unwrap();

        assert!(!json.contains('\n'));
        assert!(!json.contains("Dear Committee"));
        assert!(!json.contains(claim.denial_description_or_empty()));
        assert_eq!(record.output["draft_len"], 26);
        assert_eq!(record.claim_id, "C-1001");
    }

    #[test]
    fn test_disabled_logger_is_noop() {
        let logger = StageAuditLogger::new(StageAuditConfig::disabled()).unwrap();
        let record = StageRecord::from_stage(StageName::Validate, &sample_claim(), &validated(), 0);
        logger.log(&record).unwrap();
        assert!(!logger.is_enabled());
    }

    #[test]
    fn test_logger_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let logger = StageAuditLogger::new(StageAuditConfig::new(dir.path())).unwrap();

        let state = validated();
        for stage in [StageName::Validate, StageName::Classify] {
            let record = StageRecord::from_stage(stage, &sample_claim(), &state, 3);
            logger.log(&record).unwrap();
        }

        let files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);

        let content = fs::read_to_string(files[0].path()).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);
        let first: StageRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.stage, StageName::Validate);
        assert_eq!(first.run_id, state.run_id);
    }

    #[test]
    fn test_cleanup_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = log_file_path(dir.path(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let unrelated = dir.path().join("notes.txt");
        fs::write(&old, "{}\n").unwrap();
        fs::write(&unrelated, "keep").unwrap();

        StageAuditLogger::new(StageAuditConfig::new(dir.path()).with_retention_days(30)).unwrap();

        assert!(!old.exists());
        assert!(unrelated.exists());
    }
}
