//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Fresh reads**: `get_state` stats the path on every call.
//! - **Race-tolerant directories**: `create_dir_all` succeeds when another
//!   worker created the directory first.
//! - **Timestamps**: modification times are applied with `filetime` inside
//!   `spawn_blocking`, because the standard library has no async equivalent.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use docmirror_core::{domain::LocalState, ports::ILocalFileSystem};
use filetime::FileTime;
use tracing::{debug, instrument};

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
///
/// This is a zero-sized struct because all operations derive their context
/// from the path arguments. The mirror root lives at a higher layer.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn get_state(&self, path: &Path) -> LocalState {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return LocalState::Missing,
            Err(e) => {
                return LocalState::Unreadable {
                    reason: e.to_string(),
                }
            }
        };

        if !metadata.is_file() {
            return LocalState::Unreadable {
                reason: "path exists but is not a regular file".to_string(),
            };
        }

        match metadata.modified() {
            Ok(modified) => {
                let modified: DateTime<Local> = modified.into();
                debug!(%modified, "read local state");
                LocalState::Present { modified }
            }
            Err(e) => LocalState::Unreadable {
                reason: e.to_string(),
            },
        }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn create_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        match tokio::fs::create_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to create directory {}", path.display())),
        }
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> anyhow::Result<()> {
        let owned = path.to_path_buf();
        let mtime = FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos());

        tokio::task::spawn_blocking(move || filetime::set_file_mtime(&owned, mtime))
            .await
            .context("Timestamp task panicked")?
            .with_context(|| format!("Failed to set modification time on {}", path.display()))?;

        debug!(%modified, "modification time set");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
