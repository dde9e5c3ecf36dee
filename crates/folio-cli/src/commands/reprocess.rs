//! Reprocess command implementation.

use crate::cli::ReprocessArgs;
use crate::context::Context;
use crate::error::Result;
use crate::output::{Formatter, OutputFormat};
use folio_domain::ReprocessCriteria;
use serde_json::json;

/// Execute the reprocess command.
pub fn execute_reprocess(args: ReprocessArgs, ctx: &Context, formatter: &Formatter) -> Result<()> {
    let criteria = ReprocessCriteria::from(&args);
    let flagged = ctx.service()?.flag_for_reprocess(&criteria)?;

    let output = match formatter.format() {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({ "flagged": flagged }))?,
        OutputFormat::Quiet => flagged.to_string(),
        OutputFormat::Table if flagged == 0 => formatter.warning("No documents matched"),
        OutputFormat::Table => formatter.success(&format!(
            "Flagged {} document(s); run `folio run` to re-extract them",
            flagged
        )),
    };
    println!("{}", output);

    Ok(())
}
