//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for identifiers that travel between the remote
//! library and the local mirror. Each newtype validates at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// ServerRelativePath
// ============================================================================

/// A server-relative path of a remote item (must start with `/`)
///
/// This is the URL path of an item on the document-library host, e.g.
/// `/sites/Team/Shared%20Documents/Reports/q1.xlsx`. It is kept exactly as
/// the remote side reports it, which means it is usually percent-encoded.
/// Decoding happens in the path translator, never here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerRelativePath(String);

impl ServerRelativePath {
    /// Create a new ServerRelativePath
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRemotePath` if the path does not start
    /// with `/` or contains empty segments
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Server-relative path must start with '/': {path}"
            )));
        }

        if path.len() > 1 && path.contains("//") {
            return Err(DomainError::InvalidRemotePath(format!(
                "Server-relative path contains empty segments: {path}"
            )));
        }

        // Trailing slashes are not meaningful for file paths.
        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/').to_string()
        } else {
            path
        };

        Ok(Self(trimmed))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the non-empty segments of the path
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl Display for ServerRelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerRelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ServerRelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ServerRelativePath> for String {
    fn from(path: ServerRelativePath) -> Self {
        path.0
    }
}

// ============================================================================
// LibraryId
// ============================================================================

/// Identifier of a resolved remote document library (a Graph drive ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryId(String);

impl LibraryId {
    /// Create a new LibraryId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidLibraryId` if the ID is empty or contains
    /// characters that cannot appear in a URL path segment unescaped
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidLibraryId(
                "Library ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '!' || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidLibraryId(format!(
                "Library ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LibraryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for LibraryId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LibraryId> for String {
    fn from(id: LibraryId) -> Self {
        id.0
    }
}
