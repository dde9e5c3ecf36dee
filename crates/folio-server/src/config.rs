//! Configuration file parsing for the server.
//!
//! Loads bind address, database location, batch settings and the extraction
//! adapter from a TOML file.

use folio_batch::BatchConfig;
use folio_extract::ExtractorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// SQLite database file (`:memory:` for a throwaway database)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Batch scheduler settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Extraction adapter
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("folio.db")
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("database_path".to_string()));
        }
        if let ExtractorConfig::Http { endpoint, .. } = &self.extractor {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::MissingField("extractor.endpoint".to_string()));
            }
        }
        self.batch.validate().map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            database_path: PathBuf::from(":memory:"),
            batch: BatchConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
