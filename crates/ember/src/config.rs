//! # Simulation Configuration
//!
//! Tuning values, loaded once when a simulation is created.
//!
//! ```toml
//! max_proxies = 16384
//! rng_seed = 42
//! default_spawn_cap = 256
//! assumed_frame_rate = 60.0
//! frame_rate_smoothing = 0.1
//! debug = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EmberError, EmberResult};

/// Simulation tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Capacity of the proxy pool. Spawns beyond it are dropped.
    pub max_proxies: usize,
    /// Seed for the generator that draws each proxy's random bytes.
    pub rng_seed: u64,
    /// Spawn cap for emitters that do not declare one.
    pub default_spawn_cap: u32,
    /// Frame rate assumed before any frame has been measured.
    pub assumed_frame_rate: f32,
    /// Weight of the newest sample in the frame-rate moving average.
    pub frame_rate_smoothing: f32,
    /// Enables debug logging of every tick.
    pub debug: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_proxies: 16_384,
            rng_seed: 0x00E3_BE12,
            default_spawn_cap: 256,
            assumed_frame_rate: 60.0,
            frame_rate_smoothing: 0.1,
            debug: false,
        }
    }
}

impl SimulationConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EmberError::InvalidConfig`] on syntax errors, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(source: &str) -> EmberResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EmberError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EmberError::ConfigIo`] if the file cannot be read, otherwise
    /// as [`SimulationConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> EmberResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EmberError::ConfigIo(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EmberError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> EmberResult<()> {
        if self.max_proxies == 0 {
            return Err(EmberError::InvalidConfig(
                "max_proxies must be greater than zero".into(),
            ));
        }
        if !(self.assumed_frame_rate.is_finite() && self.assumed_frame_rate > 0.0) {
            return Err(EmberError::InvalidConfig(format!(
                "assumed_frame_rate must be positive, got {}",
                self.assumed_frame_rate
            )));
        }
        if !(self.frame_rate_smoothing > 0.0 && self.frame_rate_smoothing <= 1.0) {
            return Err(EmberError::InvalidConfig(format!(
                "frame_rate_smoothing must be in (0, 1], got {}",
                self.frame_rate_smoothing
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SimulationConfig::from_toml_str("max_proxies = 64\ndebug = true").unwrap();
        assert_eq!(config.max_proxies, 64);
        assert!(config.debug);
        assert_eq!(config.default_spawn_cap, SimulationConfig::default().default_spawn_cap);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = SimulationConfig::from_toml_str("max_particles = 3").unwrap_err();
        assert!(matches!(err, EmberError::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = SimulationConfig::from_toml_str("frame_rate_smoothing = 0.0").unwrap_err();
        assert!(matches!(
            err,
            EmberError::InvalidConfig(msg) if msg.contains("frame_rate_smoothing")
        ));
        assert!(SimulationConfig::from_toml_str("max_proxies = 0").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = SimulationConfig::from_toml_file("/nonexistent/ember.toml").unwrap_err();
        assert!(matches!(err, EmberError::ConfigIo(_)));
    }
}
