//! docmirror Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `RemoteFileDescriptor`, `LocalTarget`, `SyncAction`, `RunTally`
//! - **Port definitions** - Traits for adapters: `IRemoteLibrary`, `IContentFetcher`, `ILocalFileSystem`
//! - **Configuration** - The YAML configuration surface and its validation
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement: the Graph
//! adapter for the remote side and the sync crate for the local filesystem.

pub mod config;
pub mod domain;
pub mod ports;
