//! Folio Server binary
//!
//! Starts the HTTP trigger surface for batch extraction sessions.

use anyhow::Context;
use folio_server::{config::ServerConfig, start_server};
use std::env;
use std::process;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        let config_path = &args[2];
        ServerConfig::from_file(config_path).with_context(|| format!("loading {}", config_path))?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using default test configuration");
        eprintln!("Usage: folio-server --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::default_test_config()
    };

    start_server(config).await?;
    Ok(())
}

fn print_help() {
    println!("Folio Server - Batch Text Extraction");
    println!();
    println!("USAGE:");
    println!("    folio-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("CONFIGURATION:");
    println!("    bind_address       IP address to bind (e.g., '127.0.0.1')");
    println!("    bind_port          Port number (e.g., 8080)");
    println!("    database_path      SQLite database file (default: folio.db)");
    println!("    [batch]            batch_size, commit_interval, data_dir, recent_log_lines");
    println!("    [extractor]        kind = \"local\" (root)");
    println!("                       or \"http\" (endpoint, max_retries, timeout_secs)");
    println!();
    println!("    RUST_LOG controls log verbosity (default: info)");
    println!();
}
