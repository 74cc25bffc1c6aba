//! Index command - offline indexing of payer policy sections.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::Style;
use serde::Serialize;

use claimpilot_retrieval::PolicyIndexer;
use claimpilot_types::PolicySection;

use super::Context;

/// Arguments for the index command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// JSON array of sections (payer_name, section_title, section_text)
    pub sections: PathBuf,

    /// Remove existing sections for each payer in the file first
    #[arg(long)]
    pub replace: bool,
}

#[derive(Debug, Serialize)]
struct IndexOutput {
    indexed: usize,
    removed: usize,
    payers: Vec<String>,
    database: String,
}

/// Run the index command.
pub async fn run(args: IndexArgs, ctx: &Context) -> Result<()> {
    let contents = tokio::fs::read_to_string(&args.sections)
        .await
        .with_context(|| format!("failed to read {}", args.sections.display()))?;
    let sections: Vec<PolicySection> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a list of policy sections", args.sections.display()))?;

    if let Some(blank) = sections
        .iter()
        .position(|s| s.payer_name.trim().is_empty() || s.section_text.trim().is_empty())
    {
        bail!("section {} has an empty payer_name or section_text", blank + 1);
    }

    let payers: Vec<String> = sections
        .iter()
        .map(|s| s.payer_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let index = ctx.open_index()?;

    let mut removed = 0;
    if args.replace {
        for payer in &payers {
            removed += index.clear_payer(payer).await?;
        }
    }

    let indexed = index.index_sections(sections).await?;
    tracing::info!(indexed, removed, payers = payers.len(), "Policy sections indexed");

    let database = ctx.database_path().display().to_string();
    if ctx.json_output {
        let output = IndexOutput {
            indexed,
            removed,
            payers,
            database,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!(
            "{} Indexed {} section(s) for {} payer(s)",
            green.apply_to("✓"),
            indexed,
            payers.len()
        );
        if removed > 0 {
            println!("  {} {}", dim.apply_to("Replaced:"), removed);
        }
        println!("  {} {}", dim.apply_to("Database:"), database);
    }

    Ok(())
}
