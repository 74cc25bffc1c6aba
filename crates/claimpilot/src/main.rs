//! ClaimPilot - appeal letter drafting for denied insurance claims.
//!
//! Main entry point for the ClaimPilot CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, index, payers, run, runs, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// ClaimPilot - drafts and audits appeal letters for denied insurance claims
#[derive(Parser)]
#[command(name = "claimpilot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Load this config file instead of discovering config layers
    #[arg(long, global = true, env = "CLAIMPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a denied claim through the appeal pipeline
    Run(run::RunArgs),

    /// List saved runs and record review decisions
    Runs(runs::RunsArgs),

    /// Index payer policy sections for retrieval
    Index(index::IndexArgs),

    /// List indexed payers
    Payers(payers::PayersArgs),

    /// Show the resolved configuration
    Config(config::ConfigArgs),

    /// Check that the generation backend is reachable
    Status(status::StatusArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing: console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "claimpilot=debug,claimpilot_pipeline=debug,claimpilot_llm=debug,claimpilot_retrieval=debug,claimpilot_config=debug,info"
    } else {
        "claimpilot=info,claimpilot_pipeline=info,claimpilot_llm=info,claimpilot_retrieval=info,warn"
    };

    let log_dir = claimpilot_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "claimpilot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "claimpilot=trace,claimpilot_pipeline=trace,claimpilot_llm=trace,claimpilot_retrieval=trace,claimpilot_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context::load(cli.config.as_deref(), cli.json, cli.verbose)?;

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Runs(args) => runs::run(args, &ctx).await,
        Commands::Index(args) => index::run(args, &ctx).await,
        Commands::Payers(args) => payers::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
    }
}
