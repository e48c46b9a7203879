//! Rules command - List the rules a session can be configured with
//!
//! Usage:
//! ```bash
//! agora rules
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use agora_dialogue::{
    ConcedeMatching, DeliberationOutcome, EngineConfig, PersuasionOutcome, ProtocolRule,
    TerminationRule,
};

/// Arguments for the rules command
#[derive(Args)]
pub struct RulesArgs;

/// Run the rules command
pub fn run(_args: RulesArgs) -> Result<()> {
    let defaults = EngineConfig::default();

    println!("{}", "📜 Agora Rules".bold().cyan());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Description").fg(Color::Cyan),
            Cell::new("Default").fg(Color::Cyan),
        ]);

    for rule in ProtocolRule::ALL {
        let on = defaults.protocol_rules.contains(&rule);
        table.add_row(row("protocol_rules", rule.name(), rule.description(), on));
    }
    for rule in TerminationRule::ALL {
        let on = defaults.termination_rules.contains(&rule);
        table.add_row(row("termination_rules", rule.name(), rule.description(), on));
    }
    for rule in DeliberationOutcome::ALL {
        let on = defaults.deliberation_outcome == rule;
        table.add_row(row("deliberation_outcome", rule.name(), rule.description(), on));
    }
    for rule in PersuasionOutcome::ALL {
        let on = defaults.persuasion_outcome == rule;
        table.add_row(row("persuasion_outcome", rule.name(), rule.description(), on));
    }
    for matching in [ConcedeMatching::Structural, ConcedeMatching::AlphaEquivalent] {
        let description = match matching {
            ConcedeMatching::Structural => "a concede must repeat the claim exactly",
            ConcedeMatching::AlphaEquivalent => "a concede may rename the claim's variables",
        };
        let on = defaults.concede_matching == matching;
        table.add_row(row("concede_matching", &matching.to_string(), description, on));
    }

    println!("{table}");
    println!();
    println!("Settings file: {}", "agora --config agora.toml replay <FILE>".green());
    println!("Environment: {}", "AGORA_SEED, AGORA_CONCEDE_MATCHING".green());
    Ok(())
}

fn row(setting: &str, name: &str, description: &str, default: bool) -> Vec<Cell> {
    vec![
        Cell::new(setting).fg(Color::Yellow),
        Cell::new(name).fg(Color::Green),
        Cell::new(description),
        Cell::new(if default { "✓" } else { "" }),
    ]
}
