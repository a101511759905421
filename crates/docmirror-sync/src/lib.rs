//! docmirror Sync - One-way mirror engine
//!
//! Provides:
//! - Translation of server-relative remote paths to local paths
//! - The per-file sync decision (skip / create / update)
//! - Transfer execution with retry and timestamp reconciliation
//! - Error aggregation and the end-of-run report
//!
//! ## Modules
//!
//! - [`paths`] - Server-relative path to local path translation
//! - [`decision`] - Timestamp-based sync decision
//! - [`transfer`] - Directory preparation, content fetch and verification
//! - [`reconcile`] - Local modification time reconciliation
//! - [`report`] - Severity classification, summaries and error reports
//! - [`engine`] - Run orchestration over the remote listing
//! - [`filesystem`] - Local filesystem adapter

pub mod decision;
pub mod engine;
pub mod filesystem;
pub mod paths;
pub mod reconcile;
pub mod report;
pub mod transfer;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a mirror run
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The configured library could not be resolved on the remote site
    #[error("Library not found: {name}: {reason}")]
    LibraryNotFound { name: String, reason: String },
}

/// Errors raised while reconciling a local file's timestamp
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The modification time could not be applied to the file
    #[error("Failed to set modification time on {path}: {message}")]
    SetFailed { path: PathBuf, message: String },
}
