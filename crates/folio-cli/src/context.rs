//! Wiring from global flags to a ready [`BatchService`].

use crate::cli::Cli;
use crate::error::Result;
use folio_batch::{BatchConfig, BatchService};
use folio_extract::http::DEFAULT_MAX_RETRIES;
use folio_extract::ExtractorConfig;
use folio_store::SqliteStore;
use std::path::PathBuf;

/// Resolved locations shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// SQLite database file
    pub database: PathBuf,
    /// Session checkpoint/log directory
    pub data_dir: PathBuf,
    /// Directory file ids are relative to
    pub source_root: PathBuf,
    /// Extraction adapter selection
    pub extractor: ExtractorConfig,
}

impl Context {
    /// Resolve the global flags.
    pub fn from_cli(cli: &Cli) -> Self {
        let extractor = match &cli.extract_url {
            Some(endpoint) => ExtractorConfig::Http {
                endpoint: endpoint.clone(),
                max_retries: DEFAULT_MAX_RETRIES,
                timeout_secs: None,
            },
            None => ExtractorConfig::Local {
                root: cli.source_root.clone(),
            },
        };

        Self {
            database: cli.database.clone(),
            data_dir: cli.data_dir.clone(),
            source_root: cli.source_root.clone(),
            extractor,
        }
    }

    /// Open the document database.
    pub fn open_store(&self) -> Result<SqliteStore> {
        Ok(SqliteStore::new(&self.database)?)
    }

    /// Build a service with default batch settings.
    pub fn service(&self) -> Result<BatchService<SqliteStore>> {
        self.service_with(BatchConfig::with_data_dir(&self.data_dir))
    }

    /// Build a service with explicit batch settings; `data_dir` is taken from the flags.
    pub fn service_with(&self, config: BatchConfig) -> Result<BatchService<SqliteStore>> {
        let config = BatchConfig {
            data_dir: self.data_dir.clone(),
            ..config
        };
        let adapter = self.extractor.build()?;
        Ok(BatchService::new(self.open_store()?, adapter, config)?)
    }
}
