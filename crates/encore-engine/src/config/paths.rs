//! Standard paths for Encore files

use std::path::PathBuf;

/// Default config file path
///
/// Returns `{config_dir}/encore/config.yaml`, e.g.
/// `~/.config/encore/config.yaml` on Linux.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("encore")
        .join("config.yaml")
}

/// Default song pack library path
///
/// Returns `~/Music/encore-library`.
pub fn default_library_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Music")
        .join("encore-library")
}
