//! Sync decision
//!
//! Decides, for one remote file and the current state of its local target,
//! whether the file must be fetched. The decision compares modification
//! timestamps only; content is never inspected.

use docmirror_core::domain::{LocalState, LocalTarget, RemoteFileDescriptor, SyncAction};
use tracing::info;

/// Decides the action for a remote file given its freshly read local target
///
/// - No local file: [`SyncAction::Create`]
/// - Local attributes unreadable: [`SyncAction::Update`]
/// - Remote not newer than local (ties included): [`SyncAction::Skip`]
/// - Remote newer than local: [`SyncAction::Update`]
pub fn decide(descriptor: &RemoteFileDescriptor, target: &LocalTarget) -> SyncAction {
    match target.state() {
        LocalState::Missing => SyncAction::Create,
        LocalState::Unreadable { reason } => {
            info!(
                path = %target.path().display(),
                reason = %reason,
                "Local metadata unreadable, fetching again"
            );
            SyncAction::Update
        }
        LocalState::Present { modified } => {
            if descriptor.modified_local() <= *modified {
                SyncAction::Skip
            } else {
                SyncAction::Update
            }
        }
    }
}
