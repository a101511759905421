//! Mirror engine
//!
//! Orchestrates one pass over a remote document library:
//!
//! 1. Resolve the library (failure aborts the run)
//! 2. Drain the paginated listing into one file set
//! 3. For each file: translate its path, read the local state, decide,
//!    transfer and reconcile the timestamp
//! 4. Summarize the tally and write the error report
//!
//! Files are processed by a bounded worker pool. With the default bound of
//! one worker the run is strictly sequential. Per-file failures are recorded
//! in the run's [`RunTally`] and never stop the loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use dashmap::DashMap;
use docmirror_core::{
    config::Config,
    domain::{ErrorKind, ErrorRecord, LocalTarget, RemoteFileDescriptor, RunTally},
    ports::{
        IContentFetcher, ILocalFileSystem, IRemoteLibrary, LibraryInfo, ListingProgress,
        PageCursor,
    },
};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    decision::decide,
    paths::PathTranslator,
    reconcile::reconcile,
    report::{summarize, write_error_report, RunReport, SUMMARY_TARGET},
    transfer::{with_retry, RetryPolicy, TransferExecutor, TransferOutcome},
    MirrorError,
};

// ============================================================================
// MirrorOptions
// ============================================================================

/// Tunables for one mirror run
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Items requested per listing page
    pub page_size: u32,
    /// Upper bound on files transferred at the same time
    pub max_concurrent_transfers: usize,
    /// Backoff for content fetches and listing pages
    pub retry: RetryPolicy,
    /// Log skipped files at info instead of debug
    pub log_skipped: bool,
    /// Where to write the error report when the run has errors
    pub error_report_path: Option<PathBuf>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            page_size: docmirror_core::config::DEFAULT_PAGE_SIZE,
            max_concurrent_transfers: 1,
            retry: RetryPolicy::default(),
            log_skipped: false,
            error_report_path: None,
        }
    }
}

impl MirrorOptions {
    /// Builds options from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.remote.page_size,
            max_concurrent_transfers: config.sync.max_concurrent_transfers.max(1) as usize,
            retry: RetryPolicy::new(
                config.sync.download_retries,
                std::time::Duration::from_millis(config.sync.retry_base_delay_ms),
            ),
            log_skipped: config.logging.log_skipped,
            error_report_path: Some(crate::report::error_report_path(&config.logging.log_path)),
        }
    }
}

// ============================================================================
// Per-run shared state
// ============================================================================

/// State shared by the workers of one run
struct RunContext {
    translator: PathTranslator,
    executor: TransferExecutor,
    fs: Arc<dyn ILocalFileSystem>,
    tally: Mutex<RunTally>,
    path_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    log_skipped: bool,
}

impl RunContext {
    /// Lock serializing work on one local path
    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.path_locks
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Decides and executes one remote file, recording its outcome
    async fn process_file(&self, descriptor: RemoteFileDescriptor) {
        let translated = self.translator.translate(&descriptor);
        let lock = self.lock_for(&translated.path);
        let _guard = lock.lock().await;

        let state = self.fs.get_state(&translated.path).await;
        let target = LocalTarget::new(translated.path.clone(), state);
        let action = decide(&descriptor, &target);

        if !action.needs_transfer() {
            if self.log_skipped {
                info!(path = %translated.path.display(), "Up to date, skipped");
            } else {
                debug!(path = %translated.path.display(), "Up to date, skipped");
            }
            self.tally.lock().await.record_skipped();
            return;
        }

        info!(
            %action,
            remote_path = %descriptor.server_relative_path(),
            path = %translated.path.display(),
            size = descriptor.size(),
            "Fetching file"
        );

        match self.executor.execute(&descriptor, &translated).await {
            TransferOutcome::Success(path) => {
                let reconciled = reconcile(self.fs.as_ref(), &path, descriptor.modified_at()).await;
                let mut tally = self.tally.lock().await;
                tally.record_downloaded();
                if let Err(e) = reconciled {
                    tally.record(
                        ErrorRecord::new(
                            ErrorKind::TimestampSet,
                            translated.file_name.clone(),
                            path,
                            e.to_string(),
                        )
                        .with_remote_path(descriptor.server_relative_path().as_str()),
                    );
                }
            }
            TransferOutcome::Failed { kind, message } => {
                self.tally.lock().await.record(
                    ErrorRecord::new(kind, translated.file_name.clone(), translated.path, message)
                        .with_remote_path(descriptor.server_relative_path().as_str()),
                );
            }
        }
    }
}

// ============================================================================
// MirrorEngine
// ============================================================================

/// One-way mirror engine
///
/// ## Dependencies
///
/// - `remote`: library resolution and paginated listing
/// - `fetcher`: content transfer
/// - `fs`: local state reads, directory creation and timestamps
pub struct MirrorEngine {
    remote: Arc<dyn IRemoteLibrary>,
    fetcher: Arc<dyn IContentFetcher>,
    fs: Arc<dyn ILocalFileSystem>,
    options: MirrorOptions,
}

impl MirrorEngine {
    pub fn new(
        remote: Arc<dyn IRemoteLibrary>,
        fetcher: Arc<dyn IContentFetcher>,
        fs: Arc<dyn ILocalFileSystem>,
        options: MirrorOptions,
    ) -> Self {
        Self {
            remote,
            fetcher,
            fs,
            options,
        }
    }

    /// Mirrors the library named `library_name` into `target`
    ///
    /// `progress` is called once per listing page. Cancelling `cancel` stops
    /// scheduling new files; files already in flight finish.
    ///
    /// # Errors
    /// Returns [`MirrorError::LibraryNotFound`] if the library cannot be
    /// resolved. Every other failure is recorded in the report's tally.
    #[tracing::instrument(skip(self, target, cancel, progress), fields(target = %target.display()))]
    pub async fn run<P>(
        &self,
        library_name: &str,
        target: &Path,
        cancel: CancellationToken,
        mut progress: P,
    ) -> Result<RunReport, MirrorError>
    where
        P: FnMut(ListingProgress) + Send,
    {
        let started_at = Local::now();

        let library = self
            .remote
            .resolve_library(library_name)
            .await
            .map_err(|e| {
                error!(library = library_name, error = %e, "Could not resolve library");
                MirrorError::LibraryNotFound {
                    name: library_name.to_string(),
                    reason: format!("{e:#}"),
                }
            })?;

        info!(
            library = %library.name,
            id = %library.id,
            root = %library.server_relative_root,
            "Library resolved, listing items"
        );

        let mut tally = RunTally::new();
        let mut cancelled = false;

        let files = match self.list_all(&library, &cancel, &mut progress).await {
            Ok(Some(files)) => files,
            Ok(None) => {
                cancelled = true;
                Vec::new()
            }
            Err((partial, e)) => {
                error!(error = %e, "Listing failed, aborting run");
                tally.record_fatal(format!("Listing failed: {e:#}"));
                partial
            }
        };
        let total_remote_files = files.len();

        if !tally.has_fatal() && !cancelled {
            info!(files = total_remote_files, "Listing complete");
            let ctx = Arc::new(RunContext {
                translator: PathTranslator::new(&library.server_relative_root, target),
                executor: TransferExecutor::new(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.fs),
                    library.clone(),
                    self.options.retry,
                ),
                fs: Arc::clone(&self.fs),
                tally: Mutex::new(tally),
                path_locks: DashMap::new(),
                log_skipped: self.options.log_skipped,
            });

            cancelled = self.process_all(&ctx, files, &cancel).await;

            tally = std::mem::take(&mut *ctx.tally.lock().await);
        }

        let mut report = RunReport {
            library: library.name.clone(),
            target: target.to_path_buf(),
            started_at,
            finished_at: Local::now(),
            total_remote_files,
            cancelled,
            tally,
            error_report: None,
        };

        if let Some(path) = &self.options.error_report_path {
            match write_error_report(&report.tally, path) {
                Ok(true) => report.error_report = Some(path.clone()),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Could not write error report"),
            }
        }

        info!(
            downloaded = report.tally.downloaded(),
            skipped = report.tally.skipped(),
            errors = report.tally.total_errors(),
            "Run finished"
        );
        info!(target: SUMMARY_TARGET, "Run summary\n{}", summarize(&report));

        Ok(report)
    }

    /// Drains every listing page and keeps the files
    ///
    /// Returns `Ok(None)` if cancelled while listing. On failure, returns
    /// the files listed so far together with the error.
    async fn list_all<P>(
        &self,
        library: &LibraryInfo,
        cancel: &CancellationToken,
        progress: &mut P,
    ) -> Result<Option<Vec<RemoteFileDescriptor>>, (Vec<RemoteFileDescriptor>, anyhow::Error)>
    where
        P: FnMut(ListingProgress) + Send,
    {
        let mut files = Vec::new();
        let mut cursor: Option<PageCursor> = None;
        let mut page_number = 0u32;
        let mut total_items = 0usize;

        loop {
            if cancel.is_cancelled() {
                info!(pages = page_number, "Cancelled while listing");
                return Ok(None);
            }

            let page = with_retry(self.options.retry, "list_page", || {
                self.remote
                    .list_page(library, self.options.page_size, cursor.as_ref())
            })
            .await;

            let page = match page {
                Ok(page) => page,
                Err(e) => return Err((files, e)),
            };

            page_number += 1;
            total_items += page.items.len();
            progress(ListingProgress {
                page: page_number,
                page_items: page.items.len(),
                total_items,
            });
            debug!(page = page_number, items = page.items.len(), "Listing page received");

            files.extend(page.items.into_iter().filter(RemoteFileDescriptor::is_file));

            match page.next {
                Some(next) => cursor = Some(next),
                None => return Ok(Some(files)),
            }
        }
    }

    /// Runs every file through the worker pool
    ///
    /// Returns true if cancellation stopped scheduling before every file was
    /// started.
    async fn process_all(
        &self,
        ctx: &Arc<RunContext>,
        files: Vec<RemoteFileDescriptor>,
        cancel: &CancellationToken,
    ) -> bool {
        let permits = Arc::new(Semaphore::new(self.options.max_concurrent_transfers.max(1)));
        let mut workers = JoinSet::new();
        let mut cancelled = false;
        let mut aborted = false;

        for descriptor in files {
            while let Some(joined) = workers.try_join_next() {
                aborted |= self.check_worker(ctx, joined).await;
            }
            if aborted {
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let ctx = Arc::clone(ctx);
            workers.spawn(async move {
                ctx.process_file(descriptor).await;
                drop(permit);
            });
        }

        if cancelled {
            info!(in_flight = workers.len(), "Cancelled, waiting for in-flight transfers");
        }

        while let Some(joined) = workers.join_next().await {
            self.check_worker(ctx, joined).await;
        }

        cancelled
    }

    /// Records a panicked worker as the run's fatal failure
    ///
    /// Returns true if scheduling must stop.
    async fn check_worker(
        &self,
        ctx: &RunContext,
        joined: Result<(), tokio::task::JoinError>,
    ) -> bool {
        match joined {
            Ok(()) => false,
            Err(e) => {
                error!(error = %e, "Worker failed unexpectedly, stopping run");
                ctx.tally
                    .lock()
                    .await
                    .record_fatal(format!("Worker failed: {e}"));
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.remote.page_size = 50;
        config.sync.max_concurrent_transfers = 4;
        config.sync.download_retries = 2;
        config.sync.retry_base_delay_ms = 10;
        config.logging.log_path = PathBuf::from("/tmp/logs/run.log");
        config.logging.log_skipped = true;

        let options = MirrorOptions::from_config(&config);
        assert_eq!(options.page_size, 50);
        assert_eq!(options.max_concurrent_transfers, 4);
        assert_eq!(
            options.retry,
            RetryPolicy::new(2, std::time::Duration::from_millis(10))
        );
        assert!(options.log_skipped);
        assert_eq!(
            options.error_report_path,
            Some(PathBuf::from("/tmp/logs/run_errors.log"))
        );
    }

    #[test]
    fn test_default_options_are_sequential() {
        let options = MirrorOptions::default();
        assert_eq!(options.max_concurrent_transfers, 1);
        assert!(options.error_report_path.is_none());
    }
}
