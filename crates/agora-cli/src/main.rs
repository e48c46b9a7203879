//! Agora CLI - replay and check argumentation dialogue transcripts
//!
//! # Usage
//!
//! ```bash
//! # Replay a transcript and print per-move status and the outcome
//! agora replay dinner.json
//!
//! # Same, as JSON
//! agora replay dinner.json --json
//!
//! # Validate a transcript without the report
//! agora check dinner.json
//!
//! # List the available rules
//! agora rules
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod session;
mod settings;

use commands::{check, replay, rules};

/// Agora - dialogue protocol engine
///
/// Replays deliberation and persuasion transcripts through the engine.
#[derive(Parser)]
#[command(
    name = "agora",
    version,
    about = "Agora CLI - argumentation dialogue engine",
    long_about = "Agora replays multi-party dialogue transcripts.\n\n\
                  Every batch of moves is checked against the protocol rules,\n\
                  and the final dialectical status of each move is reported."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine settings file (TOML or JSON)
    #[arg(long, short = 'c', value_name = "FILE", global = true, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a transcript and report the result
    #[command(name = "replay")]
    Replay(replay::ReplayArgs),

    /// Validate a transcript
    #[command(name = "check")]
    Check(check::CheckArgs),

    /// List protocol, termination and outcome rules
    #[command(name = "rules")]
    Rules(rules::RulesArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Replay(args) => {
            let config = settings::load(cli.config.as_deref())?;
            replay::run(args, config)
        }
        Commands::Check(args) => {
            let config = settings::load(cli.config.as_deref())?;
            check::run(args, config)
        }
        Commands::Rules(args) => rules::run(args),
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Print a success message with a checkmark
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message with an X
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}
