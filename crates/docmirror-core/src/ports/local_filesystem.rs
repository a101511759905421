//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to inspect and
//! prepare the local mirror: reading a target's state, creating directories,
//! checking that a transfer produced a file, and stamping modification times.
//!
//! ## Design Notes
//!
//! - `get_state` never fails. A missing path is [`LocalState::Missing`]; any
//!   other read failure is [`LocalState::Unreadable`], which the decision
//!   engine treats as input rather than as an error.
//! - Mutating operations use `anyhow::Result` because filesystem errors are
//!   adapter-specific.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::local::LocalState;

/// Port trait for local filesystem operations
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Reads the current state of a path
    ///
    /// Must be called fresh before every decision; results are not cached.
    async fn get_state(&self, path: &Path) -> LocalState;

    /// Creates a directory and all missing parents (`mkdir -p`)
    ///
    /// Succeeds if the directory already exists, including when another
    /// worker created it concurrently.
    async fn create_dir_all(&self, path: &Path) -> anyhow::Result<()>;

    /// Returns true if a regular file exists at `path`
    async fn is_file(&self, path: &Path) -> bool;

    /// Sets the modification time of the file at `path`
    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> anyhow::Result<()>;
}
