//! Run configuration: TOML file, then `NEGOTIATION_*` environment
//! variables, then command-line flags.

use std::path::Path;

use anyhow::{Context, Result};
use negotiation::NegotiationConfig;

/// Load `path` (or defaults) and apply environment overrides.
pub fn load(path: Option<&Path>) -> Result<NegotiationConfig> {
    let config = match path {
        Some(path) => NegotiationConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NegotiationConfig::default(),
    };
    apply_env(config, |key| std::env::var(key).ok())
}

/// Overlay `NEGOTIATION_MAX_ROUNDS` and `NEGOTIATION_SEED` from `lookup`.
pub fn apply_env(
    mut config: NegotiationConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<NegotiationConfig> {
    if let Some(raw) = lookup("NEGOTIATION_MAX_ROUNDS") {
        config.max_rounds = raw
            .trim()
            .parse()
            .with_context(|| format!("NEGOTIATION_MAX_ROUNDS={raw} is not a round count"))?;
    }
    if let Some(raw) = lookup("NEGOTIATION_SEED") {
        config.seed = Some(
            raw.trim()
                .parse()
                .with_context(|| format!("NEGOTIATION_SEED={raw} is not a u64"))?,
        );
    }
    config.validate()?;
    Ok(config)
}
