//! Domain entities and business logic
//!
//! This module contains the core domain types for docmirror:
//! - Newtypes for validated remote identifiers
//! - Remote file descriptors and local targets
//! - The sync action decided per file
//! - The error taxonomy and the run tally
//! - Domain-specific error types

pub mod action;
pub mod descriptor;
pub mod errors;
pub mod local;
pub mod newtypes;
pub mod tally;

// Re-export commonly used types
pub use action::SyncAction;
pub use descriptor::RemoteFileDescriptor;
pub use errors::{DomainError, RemoteFailure};
pub use local::{LocalState, LocalTarget};
pub use newtypes::{LibraryId, ServerRelativePath};
pub use tally::{ErrorKind, ErrorRecord, RunTally};
