//! Run command implementation.

use crate::cli::RunArgs;
use crate::context::Context;
use crate::error::{CliError, Result};
use crate::output::{Formatter, OutputFormat};
use folio_batch::{BatchConfig, StartRequest};
use folio_domain::SessionStatus;
use std::sync::Arc;

/// Execute the run command.
///
/// Starts a session and waits for it to finish. The first Ctrl+C asks the
/// session to stop at the next batch boundary; the final report is printed
/// either way.
pub async fn execute_run(args: RunArgs, ctx: &Context, formatter: &Formatter) -> Result<()> {
    let service = ctx.service_with(BatchConfig {
        commit_interval: args.commit_interval,
        ..BatchConfig::default()
    })?;

    let started = service.start(StartRequest {
        batch_size: Some(args.batch_size),
        mime_type_filter: args.mime_type,
    })?;
    if formatter.format() == OutputFormat::Table {
        eprintln!(
            "{}",
            formatter.info(&format!(
                "Session {} started, logging to {}",
                started.session_id,
                started.log_path.display()
            ))
        );
    }

    let guard = Arc::clone(service.guard());
    let notice = formatter.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && guard.stop().is_ok() {
            eprintln!("{}", notice.warning("Stopping after the current batch..."));
        }
    });

    service.wait().await?;
    interrupt.abort();

    let report = service.session_report(started.session_id.as_str())?;
    println!("{}", formatter.format_report(&report)?);

    if SessionStatus::parse(&report.checkpoint.status) == Some(SessionStatus::Failed) {
        return Err(CliError::SessionFailed {
            session_id: report.checkpoint.session_id.clone(),
            message: report.checkpoint.error.clone().unwrap_or_default(),
        });
    }
    Ok(())
}
