//! Error types for configuration loading and path resolution.

use thiserror::Error;

/// Errors that can occur while loading configuration or resolving paths.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The platform reports no per-user data directory and no override is set.
    #[error("no application data directory available; set database.data_dir")]
    NoDataDirectory,

    /// A configuration value is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
