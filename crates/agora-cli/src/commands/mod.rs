//! CLI subcommands

pub mod check;
pub mod replay;
pub mod rules;

use crate::session::Transcript;
use anyhow::{Context, Result};
use std::path::Path;

/// Read and parse a transcript file
pub fn load_transcript(path: &Path) -> Result<Transcript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse transcript JSON: {}", path.display()))
}
