//! Remote file descriptor
//!
//! A [`RemoteFileDescriptor`] is the metadata record for one item in the
//! remote document library, as produced by the listing collaborator. It is
//! immutable and identified by its server-relative path.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::ServerRelativePath;

/// Metadata for one item in the remote document library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileDescriptor {
    /// Server-relative path (percent-encoded as reported by the server)
    server_relative_path: ServerRelativePath,
    /// Leaf name of the item (may also be percent-encoded)
    leaf_name: String,
    /// Remote modification time, in the source timezone (UTC)
    modified_at: DateTime<Utc>,
    /// Whether the item is a file (false for folders and other item types)
    is_file: bool,
    /// Size in bytes, when the listing reports it
    size: Option<u64>,
}

impl RemoteFileDescriptor {
    /// Creates a descriptor for a file
    pub fn file(
        server_relative_path: ServerRelativePath,
        leaf_name: impl Into<String>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            server_relative_path,
            leaf_name: leaf_name.into(),
            modified_at,
            is_file: true,
            size: None,
        }
    }

    /// Creates a descriptor for a folder
    pub fn folder(
        server_relative_path: ServerRelativePath,
        leaf_name: impl Into<String>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            server_relative_path,
            leaf_name: leaf_name.into(),
            modified_at,
            is_file: false,
            size: None,
        }
    }

    /// Attaches the reported size in bytes
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn server_relative_path(&self) -> &ServerRelativePath {
        &self.server_relative_path
    }

    pub fn leaf_name(&self) -> &str {
        &self.leaf_name
    }

    /// Remote modification time in UTC
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Remote modification time converted to the local timezone
    pub fn modified_local(&self) -> DateTime<Local> {
        self.modified_at.with_timezone(&Local)
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }
}
