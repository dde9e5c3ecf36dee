//! Folio CLI - Command-line interface for batch text extraction.

use clap::Parser;
use folio_cli::commands;
use folio_cli::{Cli, Command, Context, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> folio_cli::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so table and JSON output stay clean
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let formatter = Formatter::new(cli.format.into(), !cli.no_color);
    let ctx = Context::from_cli(&cli);

    match cli.command {
        Command::Import(args) => commands::execute_import(args, &ctx, &formatter)?,
        Command::Run(args) => commands::execute_run(args, &ctx, &formatter).await?,
        Command::Stats => commands::execute_stats(&ctx, &formatter)?,
        Command::Sessions => commands::execute_sessions(&ctx, &formatter)?,
        Command::Session { id } => commands::execute_session(&id, &ctx, &formatter)?,
        Command::Resume { id } => commands::execute_resume(&id, &ctx, &formatter)?,
        Command::Reprocess(args) => commands::execute_reprocess(args, &ctx, &formatter)?,
    }

    Ok(())
}
