//! Folio CLI library.
//!
//! Command-line front end to the batch extraction pipeline: import a
//! directory of documents, run sessions in the foreground, and inspect or
//! resume sessions and extraction statistics.

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use context::Context;
pub use error::{CliError, Result};
pub use output::Formatter;
