//! Status command - checks that the generation backend is reachable.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    healthy: bool,
    backend: String,
    model: String,
    error: Option<String>,
}

/// Run the status command.
pub async fn run(_args: StatusArgs, ctx: &Context) -> Result<()> {
    let (resolved, backend) = ctx.backend()?;
    let check = backend.health_check().await;

    if ctx.json_output {
        let output = StatusOutput {
            healthy: check.is_ok(),
            backend: resolved.backend.as_str().to_string(),
            model: resolved.model,
            error: check.err().map(|e| e.to_string()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("ClaimPilot Backend Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();

    match check {
        Ok(()) => {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().green().apply_to("● reachable")
            );
        }
        Err(ref e) => {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().red().apply_to("● unreachable")
            );
            println!("  {} {}", dim.apply_to("Error:"), e);
        }
    }
    println!(
        "  {} {}",
        dim.apply_to("Backend:"),
        resolved.backend.display_name()
    );
    println!("  {} {}", dim.apply_to("Model:"), resolved.model);
    if let Some(ref url) = resolved.base_url {
        println!("  {} {}", dim.apply_to("URL:"), url);
    }
    println!();

    Ok(())
}
