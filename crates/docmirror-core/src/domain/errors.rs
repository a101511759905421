//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! such as validation failures of remote paths and identifiers, and the
//! retry classification adapters attach to remote failures.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid server-relative path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid library identifier
    #[error("Invalid library ID: {0}")]
    InvalidLibraryId(String),
}

/// A remote operation failure as classified by the adapter that saw it
///
/// Adapters put this in the `anyhow` chain they return through the ports so
/// the engine can decide on retries without parsing messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteFailure {
    /// Whether a later attempt may succeed (throttling, 5xx, network)
    pub transient: bool,
    pub message: String,
}

impl RemoteFailure {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            transient: true,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            transient: false,
            message: message.into(),
        }
    }
}
