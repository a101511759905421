//! Timestamp reconciliation
//!
//! After a successful transfer the local file's modification time is set to
//! the remote modification time, so the next run sees the two as equal and
//! skips the file.

use std::path::Path;

use chrono::{DateTime, Utc};
use docmirror_core::ports::ILocalFileSystem;
use tracing::{debug, warn};

use crate::ReconcileError;

/// Stamps `path` with the remote modification time
pub async fn reconcile(
    fs: &dyn ILocalFileSystem,
    path: &Path,
    source_modified: DateTime<Utc>,
) -> Result<(), ReconcileError> {
    match fs.set_modified(path, source_modified).await {
        Ok(()) => {
            debug!(path = %path.display(), modified = %source_modified, "Local timestamp reconciled");
            Ok(())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to set local modification time");
            Err(ReconcileError::SetFailed {
                path: path.to_path_buf(),
                message: format!("{e:#}"),
            })
        }
    }
}
