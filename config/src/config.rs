//! Application configuration.
//!
//! Defines the YAML-serializable configuration that tells the application
//! where its database lives and how verbosely to log. Every field has a
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! database:
//!   file_name: clientsDatabase.db
//!   data_dir: /srv/clientbook
//! logging:
//!   filter: info
//! ```

use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::paths;

/// Configuration format version written by [`AppConfig::default`].
pub const CONFIG_VERSION: &str = "1.0";

/// Database file name used when none is configured.
pub const DEFAULT_DATABASE_FILE: &str = "clientsDatabase.db";

/// Log filter used when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Where the database file lives.
///
/// # Examples
///
/// ```
/// # use clientbook_config::DatabaseConfig;
/// let db = DatabaseConfig::default();
/// assert_eq!(db.file_name, "clientsDatabase.db");
/// assert!(db.data_dir.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Bare file name of the SQLite database.
    pub file_name: String,
    /// Directory override. When unset the platform data directory is used.
    pub data_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_DATABASE_FILE.to_string(),
            data_dir: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `clientbook_sqlite=debug`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Top-level application configuration.
///
/// # Examples
///
/// ```no_run
/// use clientbook_config::AppConfig;
///
/// let config = AppConfig::load("clientbook.yml").unwrap();
/// let db_path = config.ensure_database_path().unwrap();
/// println!("database at {}", db_path.display());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Database location.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be read,
    /// [`YamlError`](ConfigError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](ConfigError::InvalidConfig) if a value is unusable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut raw = String::new();
        BufReader::new(file).read_to_string(&mut raw)?;
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&raw)?
        };
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Loads configuration from `path` when it exists, otherwise returns the
    /// defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file; using defaults");
            Ok(Self::default())
        }
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be
    /// written, or [`YamlError`](ConfigError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks values that serde cannot express.
    ///
    /// `database.file_name` must be a non-empty bare file name.
    pub fn validate(&self) -> Result<()> {
        let name = self.database.file_name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "database.file_name cannot be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(ConfigError::InvalidConfig(format!(
                "database.file_name must be a bare file name, got '{name}'"
            )));
        }
        Ok(())
    }

    /// Directory that holds the database file.
    ///
    /// The configured `data_dir` wins; otherwise the platform data directory
    /// from [`paths::default_data_dir`].
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.database.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::default_data_dir(),
        }
    }

    /// Full path of the database file. Does not touch the filesystem.
    pub fn database_path(&self) -> Result<PathBuf> {
        self.validate()?;
        Ok(self.data_dir()?.join(&self.database.file_name))
    }

    /// Full path of the database file, creating its directory if needed.
    pub fn ensure_database_path(&self) -> Result<PathBuf> {
        let path = self.database_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
database:
  file_name: shop.db
  data_dir: /srv/clientbook
logging:
  filter: clientbook_sqlite=debug
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: AppConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.database.file_name, "shop.db");
        assert_eq!(config.database.data_dir, Some(PathBuf::from("/srv/clientbook")));
        assert_eq!(config.logging.filter, "clientbook_sqlite=debug");
    }

    #[test]
    fn test_deserialize_partial_fills_defaults() {
        let config: AppConfig = serde_yaml::from_str("database:\n  data_dir: /tmp/x\n").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.database.file_name, DEFAULT_DATABASE_FILE);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_database_path_uses_override() {
        let config: AppConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/srv/clientbook/shop.db")
        );
    }

    #[test]
    fn test_validate_rejects_empty_file_name() {
        let mut config = AppConfig::default();
        config.database.file_name = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_path_in_file_name() {
        let mut config = AppConfig::default();
        config.database.file_name = "../escape.db".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
        config.database.file_name = "sub\\dir.db".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }
}
