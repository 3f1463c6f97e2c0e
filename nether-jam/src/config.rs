//! Engine configuration (jam.toml)
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.
//!
//! ```toml
//! [allocation]
//! steal_lookahead = 0.25
//! min_hold = 0.0166
//! policy = "steal"          # or "drop_newest"
//!
//! [animation]
//! presence_margin = 1.0
//!
//! [animation.envelope]      # optional, replaces every family's envelope
//! attack = 0.05
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::allocator::AllocatorConfig;
use crate::envelope::EnvelopeConfig;
use crate::error::ConfigError;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Note-to-clone allocation
    #[serde(default)]
    pub allocation: AllocatorConfig,
    /// Frame evaluation
    #[serde(default)]
    pub animation: AnimationConfig,
}

/// Frame evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Time the instrument stays shown around its notes (default: 1.0)
    #[serde(default = "default_presence_margin")]
    pub presence_margin: f64,
    /// Envelope applied to every family instead of its own (default: none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<EnvelopeConfig>,
}

fn default_presence_margin() -> f64 {
    1.0
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            presence_margin: default_presence_margin(),
            envelope: None,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("allocation.steal_lookahead", self.allocation.steal_lookahead),
            ("allocation.min_hold", self.allocation.min_hold),
            ("animation.presence_margin", self.animation.presence_margin),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }

        if let Some(envelope) = &self.animation.envelope {
            if envelope.attack < 0.0 || envelope.release < 0.0 || envelope.stretch_decay < 0.0 {
                return Err(ConfigError::Invalid(
                    "animation.envelope times must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Parse and validate a configuration.
pub fn from_toml_str(source: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    from_toml_str(&content)
}

/// Loads the configuration from `path`.
///
/// Returns default values if the file doesn't exist or is invalid.
pub fn load_or_default(path: impl AsRef<Path>) -> EngineConfig {
    let path = path.as_ref();
    match load(path) {
        Ok(config) => config,
        Err(ConfigError::Io(_)) => EngineConfig::default(),
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            EngineConfig::default()
        }
    }
}
