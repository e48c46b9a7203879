//! Engine configuration
//!
//! Rule lists and policies a dialogue session runs with. Values come from
//! `Default`, a deserialised settings file, or `AGORA_*` environment
//! variables.

use crate::rules::{DeliberationOutcome, PersuasionOutcome, ProtocolRule, TerminationRule};
use crate::status::ConcedeMatching;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::env;

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidEnvVar { var: &'static str, reason: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Rules and policies for one dialogue session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Checked in order against every incoming move
    pub protocol_rules: Vec<ProtocolRule>,
    /// Checked in order after each round
    pub termination_rules: Vec<TerminationRule>,
    pub deliberation_outcome: DeliberationOutcome,
    pub persuasion_outcome: PersuasionOutcome,
    /// How a concede is matched against the claim it answers (env: AGORA_CONCEDE_MATCHING)
    pub concede_matching: ConcedeMatching,
    /// Seed for randomised outcome rules (env: AGORA_SEED)
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            protocol_rules: ProtocolRule::ALL.to_vec(),
            termination_rules: TerminationRule::ALL.to_vec(),
            deliberation_outcome: DeliberationOutcome::default(),
            persuasion_outcome: PersuasionOutcome::default(),
            concede_matching: ConcedeMatching::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `AGORA_SEED` and `AGORA_CONCEDE_MATCHING` when set
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(seed) = env::var("AGORA_SEED") {
            let seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: "AGORA_SEED",
                    reason: e.to_string(),
                })?;
            self.seed = Some(seed);
        }
        if let Ok(matching) = env::var("AGORA_CONCEDE_MATCHING") {
            self.concede_matching =
                matching
                    .parse()
                    .map_err(|reason| ConfigError::InvalidEnvVar {
                        var: "AGORA_CONCEDE_MATCHING",
                        reason,
                    })?;
        }
        Ok(self)
    }

    /// Reject settings no dialogue can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.termination_rules.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one termination rule is required".to_string(),
            ));
        }
        let mut seen = Vec::with_capacity(self.protocol_rules.len());
        for rule in &self.protocol_rules {
            if seen.contains(rule) {
                return Err(ConfigError::Invalid(format!(
                    "protocol rule '{}' is listed twice",
                    rule
                )));
            }
            seen.push(*rule);
        }
        Ok(())
    }

    /// RNG for randomised outcome rules: seeded when a seed is set
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.protocol_rules, ProtocolRule::ALL.to_vec());
        assert_eq!(config.concede_matching, ConcedeMatching::Structural);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_termination() {
        let config = EngineConfig {
            termination_rules: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_protocol_rules() {
        let config = EngineConfig {
            protocol_rules: vec![ProtocolRule::AttackOnOwnMove, ProtocolRule::AttackOnOwnMove],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = EngineConfig {
            seed: Some(99),
            ..Default::default()
        };
        let a: u64 = config.rng().random();
        let b: u64 = config.rng().random();
        assert_eq!(a, b);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"concede_matching":"alpha_equivalent","seed":3}"#).unwrap();
        assert_eq!(config.concede_matching, ConcedeMatching::AlphaEquivalent);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.termination_rules, TerminationRule::ALL.to_vec());
    }
}
