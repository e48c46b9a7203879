//! Engine settings for a CLI run
//!
//! Defaults, then the optional settings file, then `AGORA_*` environment
//! variables.

use agora_dialogue::EngineConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Load and validate the engine configuration
pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let settings = config::Config::builder()
                .add_source(config::File::from(path).required(true))
                .build()
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            settings
                .try_deserialize::<EngineConfig>()
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let config = config
        .with_env_overrides()
        .context("Invalid AGORA_* environment variable")?;
    config.validate().context("Invalid engine configuration")?;
    debug!(?config, "engine configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_dialogue::{ConcedeMatching, DeliberationOutcome, TerminationRule};
    use std::fs;

    fn write_settings(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("agora-{}-{}.toml", name, std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let path = write_settings(
            "override",
            "deliberation_outcome = \"random_in_proposal\"\nconcede_matching = \"alpha_equivalent\"\n",
        );
        let config = load(Some(path.as_path())).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(config.deliberation_outcome, DeliberationOutcome::RandomInProposal);
        assert_eq!(config.concede_matching, ConcedeMatching::AlphaEquivalent);
        assert_eq!(config.termination_rules, TerminationRule::ALL.to_vec());
    }

    #[test]
    fn test_empty_termination_list_is_rejected() {
        let path = write_settings("invalid", "termination_rules = []\n");
        let result = load(Some(path.as_path()));
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/agora.toml"))).is_err());
    }
}
