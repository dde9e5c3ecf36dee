//! Output formatting for the CLI.

use crate::error::Result;
use chrono::{DateTime, Utc};
use colored::*;
use folio_batch::{Overview, SessionReport};
use folio_domain::MimeTypeStats;
use folio_store::CheckpointRecord;
use serde_json::json;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet format
    Quiet,
}

/// Output formatter.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self { format, color_enabled }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the guard state and per-MIME-type statistics.
    pub fn format_overview(&self, overview: &Overview) -> Result<String> {
        let totals = overview.extraction.totals();
        match self.format {
            OutputFormat::Json => {
                let by_mime_type: Vec<serde_json::Value> =
                    overview.extraction.by_mime_type.iter().map(stats_json).collect();
                Ok(serde_json::to_string_pretty(&json!({
                    "isRunning": overview.guard.is_running,
                    "currentSessionId": overview.guard.session_id.as_ref().map(|id| id.to_string()),
                    "stopRequested": overview.guard.stop_requested,
                    "byMimeType": by_mime_type,
                    "totals": stats_json(&totals),
                }))?)
            }
            OutputFormat::Quiet => Ok(format!("{:.2}", totals.percentage())),
            OutputFormat::Table => {
                let session = match &overview.guard.session_id {
                    Some(id) if overview.guard.stop_requested => {
                        self.colorize(&format!("Session {} running (stop requested)", id), "yellow")
                    }
                    Some(id) => self.colorize(&format!("Session {} running", id), "green"),
                    None => "No session running".to_string(),
                };

                if overview.extraction.by_mime_type.is_empty() {
                    let empty = self.colorize("No documents found.", "yellow");
                    return Ok(format!("{}\n{}", session, empty));
                }

                let mut builder = Builder::default();
                builder.push_record([
                    "MIME Type",
                    "Total",
                    "Extracted",
                    "Not Attempted",
                    "Reprocess",
                    "Failed",
                    "%",
                ]);
                let rows = overview.extraction.by_mime_type.iter();
                for stats in rows.chain(std::iter::once(&totals)) {
                    builder.push_record(stats_row(stats));
                }

                Ok(format!("{}\n{}", session, self.table(builder)))
            }
        }
    }

    /// Format a session listing.
    pub fn format_sessions(&self, sessions: &[CheckpointRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(sessions)?),
            OutputFormat::Quiet => Ok(sessions
                .iter()
                .map(|s| s.session_id.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if sessions.is_empty() {
                    return Ok(self.colorize("No sessions found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record([
                    "Session",
                    "Status",
                    "Started",
                    "Processed",
                    "Succeeded",
                    "Failed",
                    "Batch",
                    "Filter",
                ]);
                for s in sessions {
                    builder.push_record([
                        s.session_id.clone(),
                        self.status(&s.status),
                        s.start_time.format(TIME_FORMAT).to_string(),
                        s.processed_in_session.to_string(),
                        s.success_count.to_string(),
                        s.error_count.to_string(),
                        s.current_batch.to_string(),
                        s.mime_type_filter.clone().unwrap_or_else(|| "-".to_string()),
                    ]);
                }

                Ok(self.table(builder))
            }
        }
    }

    /// Format a single checkpoint.
    pub fn format_record(&self, record: &CheckpointRecord) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
            OutputFormat::Quiet => Ok(record.status.clone()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (field, value) in self.record_fields(record) {
                    builder.push_record([field.to_string(), value]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format a checkpoint with the tail of its progress log.
    pub fn format_report(&self, report: &SessionReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut value = serde_json::to_value(&report.checkpoint)?;
                value["recentLog"] = json!(report.recent_log);
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => self.format_record(&report.checkpoint),
            OutputFormat::Table => {
                let mut out = self.format_record(&report.checkpoint)?;
                if !report.recent_log.is_empty() {
                    out.push('\n');
                    out.push_str(&self.colorize("Recent log:", "cyan"));
                    for line in &report.recent_log {
                        out.push_str("\n  ");
                        out.push_str(line);
                    }
                }
                Ok(out)
            }
        }
    }

    fn record_fields(&self, r: &CheckpointRecord) -> Vec<(&'static str, String)> {
        let time = |t: &Option<DateTime<Utc>>| {
            t.as_ref()
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string())
        };

        let mut fields = vec![
            ("Session", r.session_id.clone()),
            ("Status", self.status(&r.status)),
            ("Started", r.start_time.format(TIME_FORMAT).to_string()),
            ("Last batch", time(&r.last_batch_time)),
            ("Ended", time(&r.end_time)),
            ("Resumed", time(&r.resume_time)),
            ("Total documents", r.total_documents.to_string()),
            ("Processed", r.processed_in_session.to_string()),
            ("Succeeded", r.success_count.to_string()),
            ("Failed", r.error_count.to_string()),
            ("Current batch", r.current_batch.to_string()),
            ("Batch size", r.batch_size.to_string()),
            ("MIME filter", r.mime_type_filter.clone().unwrap_or_else(|| "all types".to_string())),
        ];
        if let Some(error) = &r.error {
            fields.push(("Error", self.colorize(error, "red")));
        }
        fields
    }

    fn status(&self, status: &str) -> String {
        let color = match status {
            "completed" => "green",
            "failed" => "red",
            "stopped" | "resumed" => "yellow",
            _ => "blue",
        };
        self.colorize(status, color)
    }

    fn table(&self, builder: Builder) -> String {
        builder
            .build()
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn stats_json(s: &MimeTypeStats) -> serde_json::Value {
    json!({
        "mimeType": s.mime_type,
        "total": s.total,
        "extracted": s.extracted,
        "notAttempted": s.not_attempted,
        "reprocessPending": s.reprocess_pending,
        "failed": s.failed,
        "percentage": s.percentage(),
    })
}

fn stats_row(s: &MimeTypeStats) -> [String; 7] {
    [
        s.mime_type.clone(),
        s.total.to_string(),
        s.extracted.to_string(),
        s.not_attempted.to_string(),
        s.reprocess_pending.to_string(),
        s.failed.to_string(),
        format!("{:.2}", s.percentage()),
    ]
}
