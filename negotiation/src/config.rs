//! Negotiation configuration.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Error loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables shared by every agent of a negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Share of its own ranking an agent accepts without argument, in percent.
    pub initial_threshold_percent: u32,
    /// How much the threshold widens after each NOT_AGREE, in percent.
    pub threshold_increment_percent: u32,
    /// Round budget for one negotiation.
    pub max_rounds: u32,
    /// Seed for tie-breaking and preference generation (None = OS entropy).
    pub seed: Option<u64>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            initial_threshold_percent: 10,
            threshold_increment_percent: 20,
            max_rounds: 100,
            seed: None,
        }
    }
}

impl NegotiationConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.initial_threshold_percent) {
            return Err(ConfigError::Invalid(format!(
                "initial_threshold_percent must be in 1..=100, got {}",
                self.initial_threshold_percent
            )));
        }
        if !(1..=100).contains(&self.threshold_increment_percent) {
            return Err(ConfigError::Invalid(format!(
                "threshold_increment_percent must be in 1..=100, got {}",
                self.threshold_increment_percent
            )));
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be positive".into()));
        }
        Ok(())
    }

    /// Random source for this run: seeded when `seed` is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
