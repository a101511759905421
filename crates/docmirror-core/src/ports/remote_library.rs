//! Remote library ports (driven/secondary ports)
//!
//! This module defines the interfaces for reading from a remote document
//! library: resolving the library, listing its items page by page, and
//! fetching file content into a local directory. The primary implementation
//! targets SharePoint document libraries via the Microsoft Graph API.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification; the sync engine classifies
//!   them into its own taxonomy.
//! - Listing is restartable by page: a [`PageCursor`] returned from one call
//!   can be handed to the next call, or replayed after a transient failure.
//! - Sessions and credentials never cross these ports. An implementation is
//!   handed an already-authenticated client.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::RemoteFileDescriptor;
use crate::domain::newtypes::{LibraryId, ServerRelativePath};

// ============================================================================
// LibraryInfo
// ============================================================================

/// A resolved remote document library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    /// Provider-specific identifier of the library
    pub id: LibraryId,
    /// Display name of the library
    pub name: String,
    /// Absolute web URL of the library root
    pub web_url: String,
    /// Server-relative path of the library root (percent-encoded)
    pub server_relative_root: ServerRelativePath,
}

// ============================================================================
// Listing pages
// ============================================================================

/// Opaque continuation token for the next listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(cursor: impl Into<String>) -> Self {
        Self(cursor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a remote listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Items on this page, files and folders alike
    pub items: Vec<RemoteFileDescriptor>,
    /// Cursor for the next page (None if this is the last page)
    pub next: Option<PageCursor>,
}

/// Progress event emitted once per listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingProgress {
    /// 1-based page number just received
    pub page: u32,
    /// Items received on this page
    pub page_items: usize,
    /// Items received so far across all pages
    pub total_items: usize,
}

// ============================================================================
// IRemoteLibrary trait
// ============================================================================

/// Port trait for resolving and enumerating a remote document library
#[async_trait::async_trait]
pub trait IRemoteLibrary: Send + Sync {
    /// Resolves a library by its display name
    ///
    /// # Errors
    /// Returns an error if the library cannot be found or the request fails.
    /// Callers treat this as fatal for the run.
    async fn resolve_library(&self, name: &str) -> anyhow::Result<LibraryInfo>;

    /// Fetches one page of the library listing
    ///
    /// Pass `cursor = None` for the first page and the `next` cursor of the
    /// previous page afterwards. The listing is finite; the last page has
    /// `next == None`.
    ///
    /// # Arguments
    /// * `library` - The resolved library
    /// * `page_size` - Requested number of items per page (a hint)
    /// * `cursor` - Continuation cursor from the previous page
    async fn list_page(
        &self,
        library: &LibraryInfo,
        page_size: u32,
        cursor: Option<&PageCursor>,
    ) -> anyhow::Result<ListingPage>;
}

// ============================================================================
// IContentFetcher trait
// ============================================================================

/// Port trait for fetching a remote file's bytes to the local filesystem
#[async_trait::async_trait]
pub trait IContentFetcher: Send + Sync {
    /// Writes the content of a remote file to `target_dir/file_name`
    ///
    /// Any existing file at that location is overwritten. Implementations
    /// should write through a temporary sibling and rename on completion so
    /// a failed transfer never leaves a partially-written target behind.
    ///
    /// # Arguments
    /// * `library` - The resolved library the file belongs to
    /// * `server_relative_path` - Path of the remote file
    /// * `target_dir` - Existing local directory to write into
    /// * `file_name` - Local file name to write
    async fn fetch(
        &self,
        library: &LibraryInfo,
        server_relative_path: &ServerRelativePath,
        target_dir: &Path,
        file_name: &str,
    ) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_cursor_roundtrip() {
        let cursor = PageCursor::new("https://example.test/next?page=2");
        assert_eq!(cursor.as_str(), "https://example.test/next?page=2");
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, "\"https://example.test/next?page=2\"");
    }

    #[test]
    fn test_default_page_is_last() {
        let page = ListingPage::default();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());
    }
}
