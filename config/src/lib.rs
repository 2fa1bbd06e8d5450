//! Configuration and data-directory resolution for clientbook.
//!
//! The application keeps a single SQLite file in a per-user data directory.
//! This crate loads the YAML configuration that may override that location
//! and resolves the final database path once at startup.
//!
//! # Quick start
//!
//! ```no_run
//! use clientbook_config::AppConfig;
//!
//! let config = AppConfig::load_or_default("clientbook.yml").unwrap();
//! let path = config.ensure_database_path().unwrap();
//! let conn_target = path.display().to_string();
//! println!("opening {conn_target}");
//! ```

mod config;
mod error;
mod paths;

pub use config::{
    AppConfig, CONFIG_VERSION, DEFAULT_DATABASE_FILE, DEFAULT_LOG_FILTER, DatabaseConfig,
    LoggingConfig,
};
pub use error::{ConfigError, Result};
pub use paths::{APP_DIR_NAME, CONFIG_FILE_NAME, default_config_path, default_data_dir};
