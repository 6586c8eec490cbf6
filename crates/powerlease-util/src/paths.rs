//! Default paths for powerlease components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/powerlease/config.toml` or `~/.config/powerlease/config.toml`
//! - Data: `$XDG_DATA_HOME/powerlease` or `~/.local/share/powerlease`

use std::path::PathBuf;

/// Application subdirectory name
const APP_DIR: &str = "powerlease";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Lease database filename within the data directory
pub const LEASE_DB_FILENAME: &str = "leases.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/powerlease/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/powerlease/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// `$XDG_DATA_HOME/powerlease` if set, otherwise `~/.local/share/powerlease`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_powerlease() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("powerlease"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn data_dir_contains_powerlease() {
        let path = default_data_dir();
        assert!(path.to_string_lossy().contains("powerlease"));
    }
}
