//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Folio CLI - Import documents and run batch text extraction.
#[derive(Debug, Parser)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite database holding the documents
    #[arg(long, global = true, env = "FOLIO_DATABASE", default_value = "folio.db")]
    pub database: PathBuf,

    /// Directory for session checkpoints and progress logs
    #[arg(long, global = true, env = "FOLIO_DATA_DIR", default_value = "batch_processing_logs")]
    pub data_dir: PathBuf,

    /// Directory the documents' file ids are relative to
    #[arg(long, global = true, env = "FOLIO_SOURCE_ROOT", default_value = "documents")]
    pub source_root: PathBuf,

    /// Remote extraction service; documents are read locally when unset
    #[arg(long, global = true, env = "FOLIO_EXTRACT_URL")]
    pub extract_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "table")]
    pub format: CliFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (ids and counts only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register every file below the source root as a pending document
    Import(ImportArgs),

    /// Run a batch session in the foreground (Ctrl+C stops at the next batch)
    Run(RunArgs),

    /// Show extraction statistics per MIME type
    Stats,

    /// List sessions, newest first
    Sessions,

    /// Show one session's checkpoint and recent log
    Session {
        /// Session id
        id: String,
    },

    /// Mark a finished session as resumed
    Resume {
        /// Session id
        id: String,
    },

    /// Flag extracted documents for another extraction attempt
    Reprocess(ReprocessArgs),
}

/// Arguments for the import command.
#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Only import files of this MIME type
    #[arg(short, long)]
    pub mime_type: Option<String>,

    /// Show what would be imported without writing
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Documents per batch (1-500)
    #[arg(short, long, default_value = "10")]
    pub batch_size: usize,

    /// Only process documents of this MIME type
    #[arg(short, long)]
    pub mime_type: Option<String>,

    /// Commit after this many documents within a batch
    #[arg(long, default_value = "10")]
    pub commit_interval: usize,
}

/// Arguments for the reprocess command.
#[derive(Debug, Parser)]
pub struct ReprocessArgs {
    /// Only documents extracted with this method label
    #[arg(long)]
    pub method: Option<String>,

    /// Only documents of this MIME type
    #[arg(short, long)]
    pub mime_type: Option<String>,

    /// Also flag documents already rechecked by an earlier comparison
    #[arg(long)]
    pub include_rechecked: bool,

    /// Maximum documents to flag
    #[arg(short, long)]
    pub limit: Option<usize>,
}

impl From<CliFormat> for crate::output::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::output::OutputFormat::Table,
            CliFormat::Json => crate::output::OutputFormat::Json,
            CliFormat::Quiet => crate::output::OutputFormat::Quiet,
        }
    }
}

impl From<&ReprocessArgs> for folio_domain::ReprocessCriteria {
    fn from(args: &ReprocessArgs) -> Self {
        folio_domain::ReprocessCriteria {
            method: args.method.clone(),
            mime_type: args.mime_type.clone(),
            include_rechecked: args.include_rechecked,
            limit: args.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["folio", "run"]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.batch_size, 10);
                assert_eq!(args.commit_interval, 10);
                assert!(args.mime_type.is_none());
            }
            _ => panic!("Expected Run command"),
        }
        assert_eq!(cli.format, CliFormat::Table);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "folio",
            "stats",
            "--database",
            "/tmp/x.db",
            "--format",
            "json",
            "--extract-url",
            "http://extractor:9000",
        ]);
        assert!(matches!(cli.command, Command::Stats));
        assert_eq!(cli.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(cli.format, CliFormat::Json);
        assert_eq!(cli.extract_url.as_deref(), Some("http://extractor:9000"));
    }

    #[test]
    fn test_session_requires_id() {
        assert!(Cli::try_parse_from(["folio", "session"]).is_err());
        let cli = Cli::parse_from(["folio", "resume", "0123456789abcdef"]);
        assert!(matches!(cli.command, Command::Resume { ref id } if id == "0123456789abcdef"));
    }

    #[test]
    fn test_reprocess_criteria_conversion() {
        let cli =
            Cli::parse_from(["folio", "reprocess", "--method", "basic_pdfpig", "--limit", "5"]);
        let Command::Reprocess(args) = cli.command else {
            panic!("Expected Reprocess command");
        };
        let criteria: folio_domain::ReprocessCriteria = (&args).into();
        assert_eq!(criteria.method.as_deref(), Some("basic_pdfpig"));
        assert_eq!(criteria.limit, Some(5));
        assert!(!criteria.include_rechecked);
    }
}
