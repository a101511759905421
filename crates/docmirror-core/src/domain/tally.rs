//! Error taxonomy and run tally
//!
//! Every failure in a run is classified into one [`ErrorKind`] and kept as an
//! [`ErrorRecord`]. The [`RunTally`] aggregates outcomes for one run:
//! downloaded and skipped counters, per-kind error counts and the records
//! themselves.
//!
//! ## Invariants
//!
//! - `total_errors == sum(errors_by_kind)`. The only way to add an error is
//!   [`RunTally::record`], which updates both.
//! - [`ErrorKind::Other`] is reserved for the run-level fatal path and is
//!   populated at most once per run through [`RunTally::record_fatal`].

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ErrorKind
// ============================================================================

/// Closed set of failure categories used for aggregation and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The parent directory of the target could not be created
    DirectoryCreation,
    /// The content fetch failed
    Download,
    /// The fetch reported success but no file exists afterwards
    MissingAfterDownload,
    /// The local modification time could not be set
    TimestampSet,
    /// A run-level failure not attributable to a single file
    Other,
}

impl ErrorKind {
    /// All kinds, in reporting order
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::DirectoryCreation,
        ErrorKind::Download,
        ErrorKind::MissingAfterDownload,
        ErrorKind::TimestampSet,
        ErrorKind::Other,
    ];

    /// Human-readable label used in summaries and reports
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::DirectoryCreation => "Directory creation",
            ErrorKind::Download => "Download",
            ErrorKind::MissingAfterDownload => "Missing after download",
            ErrorKind::TimestampSet => "Timestamp set",
            ErrorKind::Other => "Other",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// ErrorRecord
// ============================================================================

/// A single classified failure
///
/// Created at the point of failure and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    kind: ErrorKind,
    file_name: String,
    remote_path: Option<String>,
    local_path: PathBuf,
    message: String,
    occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    /// Creates a record stamped with the current time
    pub fn new(
        kind: ErrorKind,
        file_name: impl Into<String>,
        local_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            remote_path: None,
            local_path: local_path.into(),
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    /// Attaches the server-relative path of the remote item
    #[must_use]
    pub fn with_remote_path(mut self, remote_path: impl Into<String>) -> Self {
        self.remote_path = Some(remote_path.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn remote_path(&self) -> Option<&str> {
        self.remote_path.as_deref()
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

// ============================================================================
// RunTally
// ============================================================================

/// Running totals of outcomes for one sync pass
///
/// Created fresh at the start of every run and passed by reference through
/// the components that complete operations. Read-only once the run ends.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTally {
    downloaded: usize,
    skipped: usize,
    errors_by_kind: BTreeMap<ErrorKind, usize>,
    total_errors: usize,
    #[serde(skip)]
    records: BTreeMap<ErrorKind, Vec<ErrorRecord>>,
}

impl RunTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a file as downloaded
    pub fn record_downloaded(&mut self) {
        self.downloaded += 1;
    }

    /// Counts a file as skipped (already current)
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Classifies a failure: bumps its kind, the total and keeps the record
    pub fn record(&mut self, record: ErrorRecord) {
        let kind = record.kind();
        *self.errors_by_kind.entry(kind).or_insert(0) += 1;
        self.total_errors += 1;
        self.records.entry(kind).or_default().push(record);
    }

    /// Records the run-level fatal failure into [`ErrorKind::Other`]
    ///
    /// Returns false (and records nothing) if a fatal failure was already
    /// recorded in this run.
    pub fn record_fatal(&mut self, message: impl Into<String>) -> bool {
        if self.has_fatal() {
            return false;
        }
        self.record(ErrorRecord::new(
            ErrorKind::Other,
            "(run)",
            PathBuf::new(),
            message,
        ));
        true
    }

    pub fn downloaded(&self) -> usize {
        self.downloaded
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn total_errors(&self) -> usize {
        self.total_errors
    }

    /// Number of errors of the given kind
    pub fn errors_of(&self, kind: ErrorKind) -> usize {
        self.errors_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Records of the given kind, in the order they were recorded
    pub fn records_of(&self, kind: ErrorKind) -> &[ErrorRecord] {
        self.records.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All records grouped by kind, in reporting order
    pub fn records_by_kind(&self) -> impl Iterator<Item = (ErrorKind, &[ErrorRecord])> {
        self.records
            .iter()
            .map(|(kind, records)| (*kind, records.as_slice()))
    }

    /// Whether the fatal bucket has been populated
    pub fn has_fatal(&self) -> bool {
        self.errors_of(ErrorKind::Other) > 0
    }

    /// Errors attributable to individual files (everything except `Other`)
    ///
    /// `TimestampSet` is included even though those files are also counted as
    /// downloaded.
    pub fn per_file_errors(&self) -> usize {
        self.total_errors - self.errors_of(ErrorKind::Other)
    }

    /// Number of files that reached a final outcome
    ///
    /// Files with a `TimestampSet` error are counted once, as downloaded.
    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped + self.per_file_errors()
            - self.errors_of(ErrorKind::TimestampSet)
    }

    /// Checks `total_errors == sum(errors_by_kind)`
    pub fn is_consistent(&self) -> bool {
        self.errors_by_kind.values().sum::<usize>() == self.total_errors
            && self.records.values().map(Vec::len).sum::<usize>() == self.total_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ErrorKind, name: &str) -> ErrorRecord {
        ErrorRecord::new(kind, name, format!("/tmp/{name}"), "boom")
    }

    #[test]
    fn test_new_tally_is_empty() {
        let tally = RunTally::new();
        assert_eq!(tally.downloaded(), 0);
        assert_eq!(tally.skipped(), 0);
        assert_eq!(tally.total_errors(), 0);
        assert!(tally.is_consistent());
        for kind in ErrorKind::ALL {
            assert_eq!(tally.errors_of(kind), 0);
            assert!(tally.records_of(kind).is_empty());
        }
    }

    #[test]
    fn test_record_updates_kind_and_total() {
        let mut tally = RunTally::new();
        tally.record(record(ErrorKind::Download, "a.txt"));
        tally.record(record(ErrorKind::Download, "b.txt"));
        tally.record(record(ErrorKind::DirectoryCreation, "c.txt"));

        assert_eq!(tally.errors_of(ErrorKind::Download), 2);
        assert_eq!(tally.errors_of(ErrorKind::DirectoryCreation), 1);
        assert_eq!(tally.total_errors(), 3);
        assert!(tally.is_consistent());

        let names: Vec<_> = tally
            .records_of(ErrorKind::Download)
            .iter()
            .map(ErrorRecord::file_name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_records_by_kind_in_reporting_order() {
        let mut tally = RunTally::new();
        tally.record(record(ErrorKind::TimestampSet, "t.txt"));
        tally.record(record(ErrorKind::DirectoryCreation, "d.txt"));

        let kinds: Vec<_> = tally.records_by_kind().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![ErrorKind::DirectoryCreation, ErrorKind::TimestampSet]);
    }

    #[test]
    fn test_record_fatal_only_once() {
        let mut tally = RunTally::new();
        assert!(tally.record_fatal("listing failed"));
        assert!(!tally.record_fatal("second failure"));

        assert_eq!(tally.errors_of(ErrorKind::Other), 1);
        assert_eq!(tally.total_errors(), 1);
        assert!(tally.has_fatal());
        assert!(tally.is_consistent());
    }

    #[test]
    fn test_processed_counts_timestamp_failures_once() {
        let mut tally = RunTally::new();
        tally.record_downloaded();
        tally.record(record(ErrorKind::TimestampSet, "a.txt"));
        tally.record_skipped();
        tally.record(record(ErrorKind::Download, "b.txt"));
        tally.record_fatal("aborted");

        assert_eq!(tally.per_file_errors(), 2);
        assert_eq!(tally.processed(), 3);
    }

    #[test]
    fn test_record_keeps_remote_path() {
        let rec = record(ErrorKind::Download, "a.txt").with_remote_path("/sites/T/a.txt");
        assert_eq!(rec.remote_path(), Some("/sites/T/a.txt"));
        assert_eq!(rec.local_path(), Path::new("/tmp/a.txt"));
        assert_eq!(rec.message(), "boom");
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ErrorKind::MissingAfterDownload.to_string(), "Missing after download");
        assert_eq!(ErrorKind::ALL.len(), 5);
    }
}
