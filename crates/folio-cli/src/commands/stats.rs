//! Stats command implementation.

use crate::context::Context;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the stats command.
pub fn execute_stats(ctx: &Context, formatter: &Formatter) -> Result<()> {
    let overview = ctx.service()?.overview()?;
    println!("{}", formatter.format_overview(&overview)?);
    Ok(())
}
