//! Payers command - list indexed payers.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use claimpilot_retrieval::PolicyIndexer;

use super::Context;

/// Arguments for the payers command.
#[derive(Args, Debug)]
pub struct PayersArgs {}

#[derive(Debug, Serialize)]
struct PayerOutput {
    payer_name: String,
    sections: usize,
}

/// Run the payers command.
pub async fn run(_args: PayersArgs, ctx: &Context) -> Result<()> {
    let index = ctx.open_index()?;
    let payers = index.list_payers().await?;

    if ctx.json_output {
        let output: Vec<PayerOutput> = payers
            .into_iter()
            .map(|(payer_name, sections)| PayerOutput {
                payer_name,
                sections,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if payers.is_empty() {
        println!("{}", dim.apply_to("No payers indexed. Add some with: claimpilot index <sections.json>"));
        return Ok(());
    }

    println!();
    println!("{}", style("Indexed Payers").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    for (payer, count) in payers {
        println!("  {:<30} {}", payer, dim.apply_to(format!("{count} section(s)")));
    }
    println!();

    Ok(())
}
