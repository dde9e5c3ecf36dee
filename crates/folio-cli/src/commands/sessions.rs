//! Session inspection commands: list, show, resume.

use crate::context::Context;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the sessions command.
pub fn execute_sessions(ctx: &Context, formatter: &Formatter) -> Result<()> {
    let sessions = ctx.service()?.list_sessions()?;
    println!("{}", formatter.format_sessions(&sessions)?);
    Ok(())
}

/// Execute the session command.
pub fn execute_session(id: &str, ctx: &Context, formatter: &Formatter) -> Result<()> {
    let report = ctx.service()?.session_report(id)?;
    println!("{}", formatter.format_report(&report)?);
    Ok(())
}

/// Execute the resume command.
pub fn execute_resume(id: &str, ctx: &Context, formatter: &Formatter) -> Result<()> {
    let record = ctx.service()?.resume(id)?;
    println!("{}", formatter.format_record(&record)?);
    Ok(())
}
