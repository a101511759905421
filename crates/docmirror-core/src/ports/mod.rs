//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteLibrary`] - Library resolution and paginated listing
//! - [`IContentFetcher`] - Fetching remote file content to disk
//! - [`ILocalFileSystem`] - Local state reads, directory creation, timestamps

pub mod local_filesystem;
pub mod remote_library;

pub use local_filesystem::ILocalFileSystem;
pub use remote_library::{
    IContentFetcher, IRemoteLibrary, LibraryInfo, ListingPage, ListingProgress, PageCursor,
};
