//! Runs command - inspect saved runs and record review decisions.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde::Serialize;

use claimpilot_pipeline::{ReviewStatus, RunStore, StoredRun};

use super::Context;
use super::run::print_run;

/// Arguments for the runs command.
#[derive(Args, Debug)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub command: Option<RunsCommand>,
}

#[derive(Subcommand, Debug)]
pub enum RunsCommand {
    /// List saved runs (default)
    List,

    /// Show one saved run with its draft
    Show {
        /// Run identifier
        id: String,
    },

    /// Approve a saved run's appeal for submission
    Approve {
        /// Run identifier
        id: String,

        /// Reviewer note stored with the decision
        #[arg(long)]
        note: Option<String>,
    },

    /// Reject a saved run's appeal
    Reject {
        /// Run identifier
        id: String,

        /// Reviewer note stored with the decision
        #[arg(long)]
        note: Option<String>,
    },
}

/// Run the runs command.
pub async fn run(args: RunsArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(RunsCommand::List) {
        RunsCommand::List => cmd_list(ctx).await,
        RunsCommand::Show { id } => cmd_show(ctx, &id).await,
        RunsCommand::Approve { id, note } => {
            cmd_review(ctx, &id, ReviewStatus::Approved, note).await
        }
        RunsCommand::Reject { id, note } => {
            cmd_review(ctx, &id, ReviewStatus::Rejected, note).await
        }
    }
}

#[derive(Debug, Serialize)]
struct RunSummary {
    run_id: String,
    claim_id: String,
    outcome: Option<String>,
    review: ReviewStatus,
    stored_at: DateTime<Utc>,
}

impl RunSummary {
    fn new(run_id: String, run: &StoredRun) -> Self {
        Self {
            run_id,
            claim_id: run.claim.claim_id_or_empty().to_string(),
            outcome: run.state.outcome.map(|o| o.as_str().to_string()),
            review: run.review,
            stored_at: run.stored_at,
        }
    }
}

fn review_style(review: ReviewStatus) -> Style {
    match review {
        ReviewStatus::Approved => Style::new().green(),
        ReviewStatus::Rejected => Style::new().red(),
        ReviewStatus::Pending => Style::new().yellow(),
    }
}

async fn cmd_list(ctx: &Context) -> Result<()> {
    let store = ctx.run_store();
    let mut summaries = Vec::new();
    for id in store.list().await? {
        match store.load(&id).await {
            Ok(run) => summaries.push(RunSummary::new(id, &run)),
            Err(e) => tracing::warn!(run_id = %id, error = %e, "Skipping unreadable run"),
        }
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if summaries.is_empty() {
        println!(
            "{}",
            dim.apply_to("No saved runs. Save one with: claimpilot run <claim.json> --save")
        );
        return Ok(());
    }

    println!();
    println!("{}", style("Saved Runs").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    for summary in &summaries {
        println!(
            "  {}  {:<12} {:<10} {}",
            summary.run_id,
            summary.claim_id,
            summary.outcome.as_deref().unwrap_or("unfinished"),
            review_style(summary.review).apply_to(summary.review)
        );
    }
    println!();

    Ok(())
}

async fn cmd_show(ctx: &Context, id: &str) -> Result<()> {
    let run = ctx.run_store().load(id).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    print_review(&run);
    print_run(&run.state, None, ctx);
    Ok(())
}

async fn cmd_review(
    ctx: &Context,
    id: &str,
    status: ReviewStatus,
    note: Option<String>,
) -> Result<()> {
    let run = ctx.run_store().review(id, status, note).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&RunSummary::new(id.to_string(), &run))?);
        return Ok(());
    }

    println!(
        "✓ Run {} marked {}",
        id,
        review_style(run.review).apply_to(run.review)
    );
    Ok(())
}

fn print_review(run: &StoredRun) {
    let dim = Style::new().dim();
    println!();
    println!(
        "  {} {}",
        dim.apply_to("Review:"),
        review_style(run.review).apply_to(run.review)
    );
    if let Some(at) = run.reviewed_at {
        println!("  {} {}", dim.apply_to("Reviewed:"), at.to_rfc3339());
    }
    if let Some(ref note) = run.review_note {
        println!("  {} {}", dim.apply_to("Note:"), note);
    }
}
