//! Check command - Validate a transcript
//!
//! Usage:
//! ```bash
//! agora check dinner.json
//! ```

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::load_transcript;
use crate::print_success;
use crate::session;
use agora_dialogue::EngineConfig;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Transcript JSON file
    #[arg(value_name = "FILE")]
    transcript: PathBuf,
}

/// Run the check command
pub fn run(args: CheckArgs, config: EngineConfig) -> Result<()> {
    let transcript = load_transcript(&args.transcript)?;
    let replay = session::replay(&transcript, config);

    if let Some(batch) = replay.first_rejection() {
        let ids: Vec<String> = batch.moves.iter().map(|id| format!("#{}", id)).collect();
        bail!(
            "round {}: batch [{}] from {} rejected: {}",
            batch.round,
            ids.join(", "),
            batch.player,
            batch.error.as_deref().unwrap_or_default()
        );
    }

    print_success(&format!(
        "{} valid ({} batches)",
        args.transcript.display().to_string().bold(),
        replay.batches.len()
    ));
    if let Some(reason) = &replay.termination {
        println!("  {} {}", "Terminated:".dimmed(), reason);
    }
    Ok(())
}
