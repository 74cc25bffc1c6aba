//! CLI integration tests for the ClaimPilot command-line interface.
//!
//! Every test points the binary at a temporary config directory using the
//! mock embedder and a local Ollama URL that is never contacted, so no test
//! needs network access.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
[llm]
backend = "ollama"
model = "llama3.1:8b"
base_url = "http://127.0.0.1:9/v1"

[stages.draft]
temperature = 0.3
max_tokens = 1500

[embedding]
provider = "mock"
dimensions = 64
"#;

const SECTIONS: &str = r#"[
  {"payer_name": "Acme Health", "section_title": "Prior Authorization",
   "section_text": "Advanced imaging including MRI requires prior authorization."},
  {"payer_name": "Acme Health", "section_title": "Retroactive Authorization",
   "section_text": "Retroactive authorization may be granted within 14 days for urgent care."},
  {"payer_name": "Globex Care", "section_title": "Coding Corrections",
   "section_text": "Corrected claims must be submitted within 90 days."}
]"#;

/// A config dir holding `config.toml`, used as both config dir and cwd.
fn workspace(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), config).unwrap();
    dir
}

/// Get a command for the claimpilot binary rooted at `dir`.
fn claimpilot(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("claimpilot").unwrap();
    cmd.current_dir(dir)
        .env("CLAIMPILOT_CONFIG_DIR", dir)
        .env_remove("CLAIMPILOT_CONFIG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("appeal"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("payers"))
        .stdout(predicate::str::contains("runs"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version_displays() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("claimpilot"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path()).arg("appeal-everything").assert().failure();
}

#[test]
fn test_run_requires_claim_path() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLAIM"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_json() {
    let dir = workspace(CONFIG);
    let json = stdout_json(claimpilot(dir.path()).args(["--json", "config"]));

    assert_eq!(json["llm"]["backend"], "ollama");
    assert_eq!(json["llm"]["model"], "llama3.1:8b");
    assert!(json["llm"]["api_key"].is_null());
    assert_eq!(json["max_compliance_retries"], 2);
    assert_eq!(json["top_k"], 3);
    assert_eq!(json["embedding"]["provider"], "mock");
    assert_eq!(json["embedding"]["dimensions"], 64);

    let stages = json["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 3);
    let draft = stages.iter().find(|s| s["stage"] == "draft").unwrap();
    assert_eq!(draft["max_tokens"], 1500);
}

#[test]
fn test_config_show_masks_api_key() {
    let dir = workspace(
        r#"
[llm]
backend = "openai"
api_key = "sk-plaintext-secret-value"

[embedding]
provider = "mock"
"#,
    );

    claimpilot(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sk-p****"))
        .stdout(predicate::str::contains("sk-plaintext-secret-value").not())
        .stdout(predicate::str::contains("Warnings:"));
}

#[test]
fn test_config_show_json_uses_backend_identifier() {
    let dir = workspace(
        r#"
[llm]
backend = "openai"

[embedding]
provider = "mock"
"#,
    );

    let json = stdout_json(claimpilot(dir.path()).args(["--json", "config", "show"]));
    assert_eq!(json["llm"]["backend"], "openai");
    assert!(json["llm"]["error"].is_string());
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .args(["--config", "missing.toml", "config"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Index and payers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_index_then_list_payers() {
    let dir = workspace(CONFIG);
    std::fs::write(dir.path().join("sections.json"), SECTIONS).unwrap();

    let indexed = stdout_json(claimpilot(dir.path()).args(["--json", "index", "sections.json"]));
    assert_eq!(indexed["indexed"], 3);
    assert!(dir.path().join("policies.db").is_file());

    let payers = stdout_json(claimpilot(dir.path()).args(["--json", "payers"]));
    let payers = payers.as_array().unwrap();
    assert_eq!(payers.len(), 2);
    let acme = payers
        .iter()
        .find(|p| p["payer_name"] == "Acme Health")
        .unwrap();
    assert_eq!(acme["sections"], 2);
}

#[test]
fn test_index_replace_does_not_duplicate() {
    let dir = workspace(CONFIG);
    std::fs::write(dir.path().join("sections.json"), SECTIONS).unwrap();

    claimpilot(dir.path())
        .args(["index", "sections.json"])
        .assert()
        .success();
    let replaced = stdout_json(claimpilot(dir.path()).args([
        "--json",
        "index",
        "--replace",
        "sections.json",
    ]));
    assert_eq!(replaced["removed"], 3);

    let payers = stdout_json(claimpilot(dir.path()).args(["--json", "payers"]));
    let total: u64 = payers
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["sections"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 3);
}

#[test]
fn test_index_rejects_blank_section() {
    let dir = workspace(CONFIG);
    std::fs::write(
        dir.path().join("sections.json"),
        r#"[{"payer_name": " ", "section_title": "T", "section_text": "x"}]"#,
    )
    .unwrap();

    claimpilot(dir.path())
        .args(["index", "sections.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty payer_name"));
}

#[test]
fn test_payers_empty_index() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .arg("payers")
        .assert()
        .success()
        .stdout(predicate::str::contains("No payers indexed"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Run
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_rejects_incomplete_claim_and_saves() {
    let dir = workspace(CONFIG);
    std::fs::write(
        dir.path().join("claim.json"),
        r#"{"claim_id": "C-77", "denial_description": "No prior auth", "payer_name": ""}"#,
    )
    .unwrap();

    let json = stdout_json(claimpilot(dir.path()).args(["--json", "run", "claim.json", "--save"]));

    assert_eq!(json["outcome"], "rejected");
    assert_eq!(json["routing_decision"], "reject");
    let missing: Vec<&str> = json["missing_fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(missing, vec!["denial_code", "payer_name"]);
    assert!(json["category"].is_null());

    let run_id = json["saved_as"].as_str().unwrap();
    assert!(dir.path().join("runs").join(format!("{run_id}.json")).is_file());
    assert!(dir.path().join("audit").is_dir());
}

#[test]
fn test_run_human_output_shows_reason() {
    let dir = workspace(CONFIG);
    std::fs::write(dir.path().join("claim.json"), r#"{"claim_id": "C-78"}"#).unwrap();

    claimpilot(dir.path())
        .args(["run", "claim.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected"))
        .stdout(predicate::str::contains("Missing required fields"));
}

#[test]
fn test_run_missing_claim_file() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .args(["run", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read claim file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Saved runs and review
// ─────────────────────────────────────────────────────────────────────────────

fn save_rejected_run(dir: &Path) -> String {
    std::fs::write(
        dir.join("claim.json"),
        r#"{"claim_id": "C-90", "denial_code": "CO-197", "payer_name": "Acme Health"}"#,
    )
    .unwrap();
    let json = stdout_json(claimpilot(dir).args(["--json", "run", "claim.json", "--save"]));
    json["saved_as"].as_str().unwrap().to_string()
}

#[test]
fn test_runs_list_show_and_review() {
    let dir = workspace(CONFIG);
    let run_id = save_rejected_run(dir.path());

    let listed = stdout_json(claimpilot(dir.path()).args(["--json", "runs", "list"]));
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["run_id"], run_id.as_str());
    assert_eq!(listed[0]["claim_id"], "C-90");
    assert_eq!(listed[0]["outcome"], "rejected");
    assert_eq!(listed[0]["review"], "pending");

    let shown = stdout_json(claimpilot(dir.path()).args(["--json", "runs", "show", &run_id]));
    assert_eq!(shown["claim"]["claim_id"], "C-90");
    assert_eq!(shown["state"]["outcome"], "rejected");
    assert_eq!(shown["review"], "pending");

    let approved = stdout_json(claimpilot(dir.path()).args([
        "--json",
        "runs",
        "approve",
        &run_id,
        "--note",
        "checked by hand",
    ]));
    assert_eq!(approved["review"], "approved");

    let shown = stdout_json(claimpilot(dir.path()).args(["--json", "runs", "show", &run_id]));
    assert_eq!(shown["review"], "approved");
    assert_eq!(shown["review_note"], "checked by hand");
    assert!(shown["reviewed_at"].is_string());

    claimpilot(dir.path())
        .args(["runs", "reject", &run_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected"));
    claimpilot(dir.path())
        .args(["runs", "show", &run_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Review:"))
        .stdout(predicate::str::contains("rejected"));
}

#[test]
fn test_runs_list_empty() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .arg("runs")
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved runs"));
}

#[test]
fn test_runs_review_unknown_id_fails() {
    let dir = workspace(CONFIG);
    claimpilot(dir.path())
        .args(["runs", "approve", "no-such-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run not found"));
}
