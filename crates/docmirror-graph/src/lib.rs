//! docmirror Graph - Microsoft Graph adapter for SharePoint document libraries
//!
//! Provides async client for:
//! - OAuth2 authentication (Authorization Code with PKCE, Device Code)
//! - Resolving a document library on a SharePoint site
//! - Paginated listing of every item in the library
//! - Streaming file content to disk
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 flows, token caching and the session
//! - [`client`] - Microsoft Graph API HTTP client
//! - [`library`] - Site and document library resolution
//! - [`listing`] - Paginated library listing
//! - [`content`] - File content download
//! - [`provider`] - Port implementations used by the mirror engine

pub mod auth;
pub mod client;
pub mod content;
pub mod library;
pub mod listing;
pub mod provider;

use std::time::Duration;

use docmirror_core::domain::RemoteFailure;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A configured site URL or path could not be interpreted
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Writing downloaded content to disk failed
    #[error("Local write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Maps an unsuccessful HTTP status (and the response body) to an error
    pub fn from_status(status: StatusCode, body: &str, retry_after: Duration) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });
        match status {
            StatusCode::UNAUTHORIZED => GraphError::Unauthorized(message),
            StatusCode::FORBIDDEN => GraphError::Forbidden(message),
            StatusCode::NOT_FOUND => GraphError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => GraphError::TooManyRequests { retry_after },
            s if s.is_server_error() => GraphError::ServerError(format!("{} {message}", s.as_u16())),
            s => GraphError::UnexpectedStatus {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Whether a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GraphError::TooManyRequests { .. }
                | GraphError::ServerError(_)
                | GraphError::NetworkError(_)
        )
    }
}

impl From<GraphError> for RemoteFailure {
    fn from(err: GraphError) -> Self {
        RemoteFailure {
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }
}

/// Extracts `error.message` from a Graph error body
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let message = error.get("message")?.as_str()?;
    match error.get("code").and_then(|c| c.as_str()) {
        Some(code) => Some(format!("{code}: {message}")),
        None => Some(message.to_string()),
    }
}
