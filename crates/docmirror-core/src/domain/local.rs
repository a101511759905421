//! Local target state
//!
//! A [`LocalTarget`] is the resolved on-disk location of a remote file plus
//! its current state. It is read fresh before every decision; nothing in the
//! run caches it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Observed state of a local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalState {
    /// Nothing exists at the path
    Missing,
    /// A file exists and its modification time could be read
    Present {
        /// Local modification time
        modified: DateTime<Local>,
    },
    /// Something exists at the path but its attributes could not be read
    Unreadable {
        /// Description of the read failure
        reason: String,
    },
}

impl LocalState {
    /// Returns true unless the path is known to be missing
    pub fn exists(&self) -> bool {
        !matches!(self, LocalState::Missing)
    }

    /// Local modification time, if it was readable
    pub fn modified(&self) -> Option<DateTime<Local>> {
        match self {
            LocalState::Present { modified } => Some(*modified),
            _ => None,
        }
    }
}

/// The on-disk location a remote file maps to, with its current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    path: PathBuf,
    state: LocalState,
}

impl LocalTarget {
    pub fn new(path: PathBuf, state: LocalState) -> Self {
        Self { path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &LocalState {
        &self.state
    }

    pub fn exists(&self) -> bool {
        self.state.exists()
    }
}
