//! Sync action decided for one file in one run

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Operation decided for a remote file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Local copy is current; nothing to do
    Skip,
    /// No local copy exists; fetch it
    Create,
    /// Local copy is stale or unreadable; fetch it again
    Update,
}

impl SyncAction {
    /// Returns true if the action requires a transfer
    pub fn needs_transfer(self) -> bool {
        !matches!(self, SyncAction::Skip)
    }
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncAction::Skip => "skip",
            SyncAction::Create => "create",
            SyncAction::Update => "update",
        };
        f.write_str(label)
    }
}
