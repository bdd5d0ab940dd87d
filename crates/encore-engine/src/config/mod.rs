//! Player configuration
//!
//! YAML configuration with defaults for every field, so a missing or
//! partially written config file always yields a usable player.

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{default_config_path, default_library_path};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_SAMPLE_RATE;

/// Mixer runtime tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Playback clock sample rate in Hz
    pub sample_rate: u32,
    /// How often the clock folds while playing, in milliseconds
    pub fold_interval_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fold_interval_ms: 100,
        }
    }
}

/// Top-level player configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub mixer: MixerConfig,
    /// Where song packs live; `None` means the standard library path
    pub library_dir: Option<PathBuf>,
}

impl PlayerConfig {
    /// The effective song pack directory
    pub fn library_dir(&self) -> PathBuf {
        self.library_dir
            .clone()
            .unwrap_or_else(default_library_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = PlayerConfig::default();
        assert_eq!(config.mixer.sample_rate, 48_000);
        assert_eq!(config.mixer.fold_interval_ms, 100);
        assert!(config.library_dir().is_absolute() || config.library_dir().starts_with("."));
    }

    #[test]
    fn test_partial_yaml_fills_in_defaults() {
        let config: PlayerConfig =
            serde_yaml::from_str("mixer:\n  sample_rate: 44100\n").unwrap();
        assert_eq!(config.mixer.sample_rate, 44_100);
        assert_eq!(config.mixer.fold_interval_ms, 100);
        assert!(config.library_dir.is_none());
    }
}
