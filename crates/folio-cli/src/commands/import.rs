//! Import command implementation.
//!
//! Walks the source root and registers every regular file as a pending
//! document. The external file id is the path relative to the root, so the
//! local adapter can find the file again; ids already in the database are
//! left untouched.

use crate::cli::ImportArgs;
use crate::context::Context;
use crate::error::{CliError, Result};
use crate::output::{Formatter, OutputFormat};
use folio_domain::NewDocument;
use serde_json::json;
use std::path::{Component, Path};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Files found below the root
    pub found: usize,
    /// Newly registered documents
    pub imported: usize,
    /// Files whose id was already registered
    pub skipped: usize,
}

/// Execute the import command.
pub fn execute_import(args: ImportArgs, ctx: &Context, formatter: &Formatter) -> Result<()> {
    let documents = scan(&ctx.source_root, args.mime_type.as_deref())?;

    if args.dry_run {
        for doc in &documents {
            println!("{}\t{}", doc.external_file_id, doc.mime_type);
        }
        println!("{}", formatter.info(&format!("{} file(s) would be considered", documents.len())));
        return Ok(());
    }

    let store = ctx.open_store()?;
    let mut summary = ImportSummary {
        found: documents.len(),
        ..Default::default()
    };
    for doc in &documents {
        match store.insert_document(doc)? {
            Some(id) => {
                debug!("Registered {} as document {}", doc.external_file_id, id);
                summary.imported += 1;
            }
            None => summary.skipped += 1,
        }
    }
    info!(
        "Imported {} of {} files from {}",
        summary.imported,
        summary.found,
        ctx.source_root.display()
    );

    let output = match formatter.format() {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "found": summary.found,
            "imported": summary.imported,
            "skipped": summary.skipped,
        }))?,
        OutputFormat::Quiet => summary.imported.to_string(),
        OutputFormat::Table => formatter.success(&format!(
            "Imported {} document(s), {} already registered",
            summary.imported, summary.skipped
        )),
    };
    println!("{}", output);

    Ok(())
}

/// Collect the files below `root` as new documents, in path order.
///
/// Hidden files and directories are skipped, as are paths that are not
/// valid UTF-8.
pub fn scan(root: &Path, mime_filter: Option<&str>) -> Result<Vec<NewDocument>> {
    if !root.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "source root is not a directory: {}",
            root.display()
        )));
    }

    let mut documents = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(external_file_id) = relative_id(root, path) else {
            warn!("Skipping {}: path is not valid UTF-8", path.display());
            continue;
        };

        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        if mime_filter.is_some_and(|m| !m.eq_ignore_ascii_case(&mime_type)) {
            continue;
        }

        documents.push(NewDocument {
            name: entry.file_name().to_string_lossy().into_owned(),
            external_file_id,
            mime_type,
        });
    }

    Ok(documents)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Path below `root` joined with `/`, whatever the platform separator.
fn relative_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
