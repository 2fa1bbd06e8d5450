//! Platform data and configuration directory lookup.

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Subdirectory created under the platform data directory.
pub const APP_DIR_NAME: &str = "clientbook";

/// File name of the per-user configuration file.
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Per-user application data directory, e.g.
/// `~/.local/share/clientbook` on Linux or
/// `%LOCALAPPDATA%\clientbook` on Windows.
///
/// # Errors
///
/// Returns [`ConfigError::NoDataDirectory`] when the platform reports none
/// (for example, no `HOME` on Unix).
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoDataDirectory)
}

/// Per-user configuration file, e.g. `~/.config/clientbook/config.yml`.
///
/// Returns `None` when the platform has no configuration directory; callers
/// fall back to [`AppConfig::default`](crate::AppConfig::default).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_ends_with_app_name() {
        // Only meaningful where the platform has a data dir (CI runners do).
        if let Ok(dir) = default_data_dir() {
            assert!(dir.ends_with(APP_DIR_NAME));
        }
    }

    #[test]
    fn test_default_config_path_shape() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("clientbook/config.yml"));
        }
    }
}
