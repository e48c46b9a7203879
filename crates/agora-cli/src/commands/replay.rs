//! Replay command - Run a transcript through the engine
//!
//! Usage:
//! ```bash
//! agora replay dinner.json
//! agora replay dinner.json --json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use std::path::PathBuf;

use super::load_transcript;
use crate::session::{self, Outcome, Report};
use crate::{print_error, print_success, print_warning};
use agora_dialogue::EngineConfig;

/// Arguments for the replay command
#[derive(Args)]
pub struct ReplayArgs {
    /// Transcript JSON file
    #[arg(value_name = "FILE")]
    transcript: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Run the replay command
pub fn run(args: ReplayArgs, config: EngineConfig) -> Result<()> {
    let transcript = load_transcript(&args.transcript)?;
    let replay = session::replay(&transcript, config);
    let report = replay.report().context("Failed to evaluate final dialogue state")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    println!("{}", format!("🗣  Agora Replay: {}", report.topic).bold().cyan());
    println!("{}", "═".repeat(40).cyan());
    println!();
    println!("  {} {:?}", "Kind:".dimmed(), report.kind);
    println!("  {} {}", "State:".dimmed(), report.state);
    println!("  {} {}", "Batches:".dimmed(), report.batches.len());
    println!();

    for batch in report.batches.iter().filter(|b| !b.accepted()) {
        print_warning(&format!(
            "round {}: batch from {} discarded ({})",
            batch.round,
            batch.player,
            batch.error.as_deref().unwrap_or_default()
        ));
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Move").fg(Color::Cyan),
            Cell::new("Player").fg(Color::Cyan),
            Cell::new("Locution").fg(Color::Cyan),
            Cell::new("Target").fg(Color::Cyan),
            Cell::new("Status").fg(Color::Cyan),
        ]);
    for mv in &report.moves {
        let status = if mv.is_in {
            Cell::new("in").fg(Color::Green)
        } else {
            Cell::new("out").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(format!("#{}", mv.id)),
            Cell::new(mv.player.as_ref().map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(&mv.locution).fg(Color::Yellow),
            Cell::new(mv.target.map(|t| format!("#{}", t)).unwrap_or_else(|| "-".to_string())),
            status,
        ]);
    }
    println!("{table}");
    println!();

    let active: Vec<String> = report.active_attackers.iter().map(|id| format!("#{}", id)).collect();
    println!("  {} {}", "Active attackers:".dimmed(), if active.is_empty() { "none".to_string() } else { active.join(", ") });
    if !report.informed.is_empty() {
        let informed: Vec<String> = report.informed.iter().map(|p| p.to_string()).collect();
        println!("  {} {}", "Informed:".dimmed(), informed.join(", "));
    }
    match &report.termination {
        Some(reason) => println!("  {} {}", "Terminated:".dimmed(), reason),
        None => println!("  {} {}", "Terminated:".dimmed(), "no".yellow()),
    }
    println!();

    match &report.outcome {
        Outcome::Deliberation { rule, proposal: Some(id), option } => {
            let option = option.as_ref().map(|o| o.to_string()).unwrap_or_default();
            print_success(&format!("{}: proposal #{} ({}) wins", rule, id, option.green()));
        }
        Outcome::Deliberation { rule, proposal: None, .. } => {
            print_error(&format!("{}: no proposal is in", rule));
        }
        Outcome::Persuasion { rule, winners } if winners.is_empty() => {
            print_error(&format!("{}: nobody wins", rule));
        }
        Outcome::Persuasion { rule, winners } => {
            let names: Vec<String> = winners.iter().map(|w| w.to_string()).collect();
            print_success(&format!("{}: {} win", rule, names.join(", ").green()));
        }
    }
}
