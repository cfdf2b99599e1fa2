//! Configuration system for the practice server
//!
//! Loads configuration from:
//! 1. config.yaml - operational settings (port, database, practice, logging)
//! 2. .env file - local overrides
//!
//! Environment variables always override config.yaml values. A missing
//! config file is not an error; defaults are used instead.

use serde::{Deserialize, Serialize};
use sqlgrade_core::FormatOptions;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnvVar { name: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// DuckDB file; in-memory when unset
    pub path: Option<String>,

    /// SQL files run once at start-up to seed the practice dataset
    pub setup_scripts: Vec<String>,

    pub memory_limit_mb: Option<u64>,

    /// Hard cap on rows a single query may return
    pub max_rows: Option<u64>,
}

/// Practice session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    pub questions_path: Option<String>,
    pub history_capacity: usize,
    pub max_cell_length: usize,
    /// Rows rendered per result; grading always sees every row
    pub max_rows: Option<usize>,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            questions_path: None,
            history_capacity: sqlgrade_core::DEFAULT_HISTORY_CAPACITY,
            max_cell_length: sqlgrade_core::DEFAULT_MAX_CELL_LENGTH,
            max_rows: Some(1000),
        }
    }
}

impl PracticeConfig {
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            max_cell_length: self.max_cell_length,
            max_rows: self.max_rows,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub practice: PracticeConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => serde_yaml::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(err) => return Err(err.into()),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("SQLGRADE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SQLGRADE_SERVER_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnvVar {
                name: "SQLGRADE_SERVER_PORT",
                value: port,
            })?;
        }

        if let Ok(path) = std::env::var("SQLGRADE_DATABASE_PATH") {
            self.database.path = Some(path);
        }
        if let Ok(path) = std::env::var("SQLGRADE_QUESTIONS") {
            self.practice.questions_path = Some(path);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }

        Ok(())
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}
