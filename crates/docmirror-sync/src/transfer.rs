//! Transfer execution
//!
//! Brings one remote file to its local location: prepares the parent
//! directory, fetches the content through the [`IContentFetcher`] port with
//! bounded retry, and verifies a file actually landed on disk. Failures are
//! classified into an [`ErrorKind`]; nothing here aborts the run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docmirror_core::{
    domain::{ErrorKind, RemoteFailure, RemoteFileDescriptor},
    ports::{IContentFetcher, ILocalFileSystem, LibraryInfo},
};
use tracing::{debug, info, warn};

use crate::paths::TranslatedPath;

// ============================================================================
// Retry policy
// ============================================================================

/// Bounded exponential backoff applied to content fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Checks whether an error is transient and worth retrying
///
/// A [`RemoteFailure`] anywhere in the chain decides on its own. Otherwise
/// only the root cause is inspected: transient errors include network
/// failures, rate limiting (429) and server errors (5xx). Context layers are
/// ignored because they carry file paths.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    if let Some(failure) = err.chain().find_map(|e| e.downcast_ref::<RemoteFailure>()) {
        return failure.transient;
    }

    let err_str = err.root_cause().to_string().to_lowercase();

    // Network errors
    if err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("timed out")
        || err_str.contains("dns")
        || err_str.contains("reset by peer")
        || err_str.contains("broken pipe")
    {
        return true;
    }

    // Rate limiting
    if err_str.contains("429")
        || err_str.contains("too many requests")
        || err_str.contains("rate limit")
        || err_str.contains("throttled")
    {
        return true;
    }

    // Server errors (5xx)
    err_str.contains("500")
        || err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("504")
        || err_str.contains("server error")
}

/// Runs an async operation, retrying transient failures with backoff
///
/// Non-transient errors are returned immediately. When retries run out the
/// last error is returned.
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, operation_name: &str, f: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries && is_transient_error(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// TransferOutcome
// ============================================================================

/// Result of bringing one file to its local location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The file now exists at the given path
    Success(PathBuf),
    /// The transfer was abandoned
    Failed { kind: ErrorKind, message: String },
}

impl TransferOutcome {
    fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }
}

// ============================================================================
// TransferExecutor
// ============================================================================

/// Executes the transfer of single files into the local mirror
pub struct TransferExecutor {
    fetcher: Arc<dyn IContentFetcher>,
    fs: Arc<dyn ILocalFileSystem>,
    library: LibraryInfo,
    retry: RetryPolicy,
}

impl TransferExecutor {
    pub fn new(
        fetcher: Arc<dyn IContentFetcher>,
        fs: Arc<dyn ILocalFileSystem>,
        library: LibraryInfo,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            fs,
            library,
            retry,
        }
    }

    /// Transfers one file
    ///
    /// Each step failing maps to its own kind: the directory step to
    /// [`ErrorKind::DirectoryCreation`], the fetch to [`ErrorKind::Download`]
    /// and a fetch that produced no file to
    /// [`ErrorKind::MissingAfterDownload`].
    pub async fn execute(
        &self,
        descriptor: &RemoteFileDescriptor,
        target: &TranslatedPath,
    ) -> TransferOutcome {
        if let Err(e) = self.fs.create_dir_all(&target.directory).await {
            warn!(
                directory = %target.directory.display(),
                file = %target.file_name,
                error = %e,
                "Could not create directory, skipping file"
            );
            return TransferOutcome::failed(ErrorKind::DirectoryCreation, format!("{e:#}"));
        }

        let remote_path = descriptor.server_relative_path();
        let fetched = with_retry(self.retry, "download", || {
            self.fetcher.fetch(
                &self.library,
                remote_path,
                &target.directory,
                &target.file_name,
            )
        })
        .await;

        if let Err(e) = fetched {
            warn!(
                remote_path = %remote_path,
                file = %target.file_name,
                error = %e,
                "Download failed"
            );
            return TransferOutcome::failed(ErrorKind::Download, format!("{e:#}"));
        }

        if !self.fs.is_file(&target.path).await {
            warn!(
                remote_path = %remote_path,
                path = %target.path.display(),
                "Download reported success but no file exists"
            );
            return TransferOutcome::failed(
                ErrorKind::MissingAfterDownload,
                format!("No file at {} after download", target.path.display()),
            );
        }

        debug!(path = %target.path.display(), "Transfer complete");
        TransferOutcome::Success(target.path.clone())
    }
}
