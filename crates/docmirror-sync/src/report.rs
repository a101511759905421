//! Run reporting
//!
//! Turns the final [`RunTally`] of a run into:
//! - a severity classification ([`Severity`])
//! - a human-readable summary ([`summarize`])
//! - a plain-text error report next to the run log ([`write_error_report`])
//! - a serializable [`RunReport`] for machine-readable output

use std::fmt::{self, Display, Formatter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use docmirror_core::domain::{ErrorKind, RunTally};
use serde::Serialize;
use tracing::info;

// ============================================================================
// Severity
// ============================================================================

/// Log target of the end-of-run summary
///
/// The CLI keeps this target out of the console, where the summary is
/// printed directly, and lets it through to the run transcript.
pub const SUMMARY_TARGET: &str = "docmirror::summary";

/// Error rate (percent of remote files) at and above which a run is
/// reported as having significant errors
pub const SIGNIFICANT_ERROR_PERCENT: usize = 5;

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No errors at all
    Success,
    /// Some errors, strictly below the significance threshold
    MinorIssues,
    /// Errors at or above the significance threshold
    SignificantErrors,
}

impl Severity {
    /// Classifies a run by its error count relative to the remote file count
    pub fn classify(total_errors: usize, total_files: usize) -> Self {
        if total_errors == 0 {
            Severity::Success
        } else if total_errors.saturating_mul(100)
            < total_files.saturating_mul(SIGNIFICANT_ERROR_PERCENT)
        {
            Severity::MinorIssues
        } else {
            Severity::SignificantErrors
        }
    }

    /// One-line banner shown at the end of the summary
    pub fn banner(self) -> &'static str {
        match self {
            Severity::Success => "Sync completed successfully",
            Severity::MinorIssues => "Sync completed with minor issues",
            Severity::SignificantErrors => "Sync completed with significant errors",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.banner())
    }
}

// ============================================================================
// RunReport
// ============================================================================

/// Final report of one mirror run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub library: String,
    pub target: PathBuf,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// Number of files in the remote listing
    pub total_remote_files: usize,
    /// Whether the run was cancelled before every file was scheduled
    pub cancelled: bool,
    pub tally: RunTally,
    /// Where the error report was written, if any
    pub error_report: Option<PathBuf>,
}

impl RunReport {
    /// Files that reached a final outcome
    pub fn processed(&self) -> usize {
        self.tally.processed()
    }

    /// Remote files never processed (cancellation or the fatal path)
    pub fn not_processed(&self) -> usize {
        self.total_remote_files.saturating_sub(self.processed())
    }

    pub fn severity(&self) -> Severity {
        Severity::classify(self.tally.total_errors(), self.total_remote_files)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// JSON rendering including the derived fields
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.insert("processed".into(), self.processed().into());
            obj.insert("not_processed".into(), self.not_processed().into());
            obj.insert(
                "duration_secs".into(),
                (self.duration().num_milliseconds() as f64 / 1000.0).into(),
            );
            obj.insert(
                "severity".into(),
                serde_json::to_value(self.severity()).unwrap_or(serde_json::Value::Null),
            );
        }
        value
    }
}

/// Formats a duration as `1h 02m 03s`, `2m 03s` or `3.4s`
pub fn format_duration(duration: chrono::Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    let secs = millis / 1000;
    match secs {
        s if s >= 3600 => format!("{}h {:02}m {:02}s", s / 3600, (s % 3600) / 60, s % 60),
        s if s >= 60 => format!("{}m {:02}s", s / 60, s % 60),
        _ => format!("{:.1}s", millis as f64 / 1000.0),
    }
}

/// Builds the end-of-run summary
pub fn summarize(report: &RunReport) -> String {
    let tally = &report.tally;
    let mut out = String::new();

    let _ = writeln!(out, "Sync summary for '{}'", report.library);
    let _ = writeln!(out, "  Target:             {}", report.target.display());
    let _ = writeln!(
        out,
        "  Started:            {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(
        out,
        "  Finished:           {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "  Duration:           {}", format_duration(report.duration()));
    let _ = writeln!(out, "  Remote files:       {}", report.total_remote_files);
    let _ = writeln!(out, "  Processed:          {}", report.processed());
    if report.not_processed() > 0 {
        let _ = writeln!(out, "  Not processed:      {}", report.not_processed());
    }
    let _ = writeln!(out, "  Downloaded:         {}", tally.downloaded());
    let _ = writeln!(out, "  Skipped (current):  {}", tally.skipped());
    let _ = writeln!(out, "  Errors:             {}", tally.total_errors());
    for kind in ErrorKind::ALL {
        let count = tally.errors_of(kind);
        if count > 0 {
            let _ = writeln!(out, "    {:<24}{}", format!("{}:", kind.label()), count);
        }
    }
    if report.cancelled {
        let _ = writeln!(out, "  Run was cancelled before all files were scheduled");
    }
    if let Some(path) = &report.error_report {
        let _ = writeln!(out, "  Error report:       {}", path.display());
    }
    let _ = write!(out, "{}", report.severity().banner());
    out
}

// ============================================================================
// Error report
// ============================================================================

/// Derives the error report path from the run log path
///
/// `logs/docmirror.log` becomes `logs/docmirror_errors.log`; a log path
/// without extension gets `_errors` appended.
pub fn error_report_path(log_path: &Path) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "docmirror".to_string());
    let name = match log_path.extension() {
        Some(ext) => format!("{stem}_errors.{}", ext.to_string_lossy()),
        None => format!("{stem}_errors"),
    };
    log_path.with_file_name(name)
}

/// Renders every error record, grouped by kind
pub fn render_error_report(tally: &RunTally) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "docmirror error report");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Total errors: {}", tally.total_errors());

    for (kind, records) in tally.records_by_kind() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ({}) ==", kind.label(), records.len());
        for record in records {
            let _ = writeln!(
                out,
                "[{}] {}",
                record.occurred_at().with_timezone(&Local).format("%H:%M:%S"),
                record.file_name()
            );
            if let Some(remote) = record.remote_path() {
                let _ = writeln!(out, "    remote: {remote}");
            }
            if !record.local_path().as_os_str().is_empty() {
                let _ = writeln!(out, "    local:  {}", record.local_path().display());
            }
            let _ = writeln!(out, "    error:  {}", record.message());
        }
    }
    out
}

/// Writes the error report to `path` if the run had any errors
///
/// A clean run removes the report left by an earlier run. Returns whether a
/// report was written.
pub fn write_error_report(tally: &RunTally, path: &Path) -> anyhow::Result<bool> {
    if tally.total_errors() == 0 {
        match std::fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "Removed error report of a previous run"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove stale error report {}", path.display())
                })
            }
        }
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }
    std::fs::write(path, render_error_report(tally))
        .with_context(|| format!("Failed to write error report {}", path.display()))?;
    info!(path = %path.display(), errors = tally.total_errors(), "Error report written");
    Ok(true)
}
