//! Run command - drive one claim through the appeal pipeline.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use claimpilot_pipeline::{CancellationToken, Outcome, RunState, RunStore};
use claimpilot_types::ClaimInput;

use super::Context;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Claim JSON file (claim_id, denial_code, denial_description, payer_name)
    pub claim: PathBuf,

    /// Save the finished run to the runs directory
    #[arg(long)]
    pub save: bool,
}

/// Run output for JSON mode.
#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    #[serde(flatten)]
    state: &'a RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_as: Option<String>,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let contents = tokio::fs::read_to_string(&args.claim)
        .await
        .with_context(|| format!("failed to read claim file {}", args.claim.display()))?;
    let claim: ClaimInput = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid claim", args.claim.display()))?;

    let pipeline = ctx.pipeline()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current stage");
            on_interrupt.cancel();
        }
    });

    let state = pipeline.run_with_cancellation(claim.clone(), cancel).await;

    let saved_as = if args.save {
        Some(ctx.run_store().save(&claim, &state).await?)
    } else {
        None
    };

    if ctx.json_output {
        let output = RunOutput {
            state: &state,
            saved_as,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_run(&state, saved_as.as_deref(), ctx);
    }

    Ok(())
}

fn outcome_style(outcome: Option<Outcome>) -> Style {
    match outcome {
        Some(Outcome::Complete) => Style::new().green(),
        Some(Outcome::Escalated) => Style::new().yellow(),
        Some(Outcome::Rejected) | Some(Outcome::Failed) => Style::new().red(),
        Some(Outcome::Cancelled) | None => Style::new().dim(),
    }
}

pub(super) fn print_run(state: &RunState, saved_as: Option<&str>, ctx: &Context) {
    let dim = Style::new().dim();
    let outcome = state
        .outcome
        .map(|o| o.as_str())
        .unwrap_or("unfinished");

    println!();
    println!("{}", style("Appeal Run").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Run:"), state.run_id);
    println!(
        "  {} {}",
        dim.apply_to("Outcome:"),
        outcome_style(state.outcome).apply_to(outcome)
    );

    if state.outcome == Some(Outcome::Rejected) {
        if let Some(ref message) = state.validation_message {
            println!("  {} {}", dim.apply_to("Reason:"), message);
        }
        print_saved(saved_as);
        return;
    }

    if let Some(category) = state.category {
        println!("  {} {}", dim.apply_to("Category:"), category);
    }
    println!(
        "  {} {} excerpt(s), {} draft attempt(s), {} retr{}",
        dim.apply_to("Work:"),
        state.excerpts().len(),
        state.draft_attempts,
        state.retry_count,
        if state.retry_count == 1 { "y" } else { "ies" }
    );

    if let Some(ref citations) = state.policy_citations
        && !citations.is_empty()
    {
        println!();
        println!("  {}", dim.apply_to("Citations:"));
        for citation in citations {
            println!("    - {}", citation);
        }
    }

    let issues = state.compliance_issues();
    if !issues.is_empty() {
        println!();
        println!("  {}", dim.apply_to("Compliance issues:"));
        for issue in issues {
            println!("    - {}", style(issue).yellow());
        }
    }

    if let Some(ref error) = state.error {
        println!();
        println!("  {} {}", dim.apply_to("Error:"), style(error).red());
    }
    if ctx.verbose && !state.errors.is_empty() {
        println!();
        println!("  {}", dim.apply_to("Stage errors:"));
        for e in &state.errors {
            println!("    [{}] {}", e.stage, e.message);
        }
    }

    if let Some(ref draft) = state.draft_text
        && !draft.is_empty()
    {
        println!();
        println!("{}", dim.apply_to("─".repeat(40)));
        println!();
        println!("{}", draft);
    }

    print_saved(saved_as);
}

fn print_saved(saved_as: Option<&str>) {
    if let Some(id) = saved_as {
        println!();
        println!("  {} {}", Style::new().dim().apply_to("Saved:"), id);
    }
    println!();
}
