//! Sync command - Mirror a SharePoint document library to a local folder
//!
//! Provides the `docmirror sync` CLI command which:
//! 1. Applies command-line overrides to the loaded configuration
//! 2. Signs in (cached session, browser or device code)
//! 3. Wires the Graph provider and local filesystem into the MirrorEngine
//! 4. Runs one pass and prints the summary; Ctrl-C stops scheduling files

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use docmirror_core::config::{Config, ConfigBuilder};
use docmirror_graph::client::GraphClient;
use docmirror_graph::library::SiteAddress;
use docmirror_graph::provider::GraphLibraryProvider;
use docmirror_sync::engine::{MirrorEngine, MirrorOptions};
use docmirror_sync::filesystem::LocalFileSystemAdapter;
use docmirror_sync::report;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Default, Args)]
pub struct SyncCommand {
    /// SharePoint site URL (e.g. https://contoso.sharepoint.com/sites/Team)
    #[arg(long)]
    pub site_url: Option<String>,

    /// Document library display name
    #[arg(long)]
    pub library: Option<String>,

    /// Local folder to mirror into
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Application (client) ID of the app registration
    #[arg(long)]
    pub client_id: Option<String>,

    /// Tenant ID or domain
    #[arg(long)]
    pub tenant: Option<String>,

    /// Run log file; the error report is written next to it
    #[arg(long)]
    pub log_path: Option<PathBuf>,

    /// Sign in with a device code instead of the browser
    #[arg(long)]
    pub non_interactive: bool,

    /// Log every skipped (already current) file
    #[arg(long)]
    pub verbose_skips: bool,

    /// Files transferred at the same time
    #[arg(long)]
    pub concurrency: Option<u32>,
}

impl SyncCommand {
    /// Applies the command-line overrides on top of the file configuration
    pub fn apply(&self, config: Config) -> Config {
        let mut builder = ConfigBuilder::from_config(config);
        if let Some(url) = &self.site_url {
            builder = builder.site_url(url.clone());
        }
        if let Some(library) = &self.library {
            builder = builder.library_name(library.clone());
        }
        if let Some(target) = &self.target {
            builder = builder.target_path(target.clone());
        }
        if let Some(client_id) = &self.client_id {
            builder = builder.client_id(client_id.clone());
        }
        if let Some(tenant) = &self.tenant {
            builder = builder.tenant(tenant.clone());
        }
        if let Some(path) = &self.log_path {
            builder = builder.log_path(path.clone());
        }
        if self.non_interactive {
            builder = builder.interactive(false);
        }
        if self.verbose_skips {
            builder = builder.log_skipped(true);
        }
        if let Some(n) = self.concurrency {
            builder = builder.max_concurrent_transfers(n);
        }
        builder.build()
    }

    /// Runs one mirror pass
    ///
    /// Returns an error (and the process exits 1) only when the run cannot
    /// start: invalid configuration, failed sign-in, or a library that
    /// cannot be resolved. Per-file errors are reported in the summary.
    pub async fn execute(&self, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
        let formatter = get_formatter(format, quiet);

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::bail!("Invalid configuration: {}", messages.join("; "));
        }

        let site = SiteAddress::parse(&config.remote.site_url).context("Invalid site URL")?;

        // Step 1: Sign in
        let session = Arc::new(super::connect(&config, format).await?);
        let client = Arc::new(GraphClient::new(session.access_token().await?));
        let provider = Arc::new(GraphLibraryProvider::new(client, site).with_session(session));

        // Step 2: Build the engine
        let options = MirrorOptions::from_config(&config);
        let engine = MirrorEngine::new(
            provider.clone(),
            provider,
            Arc::new(LocalFileSystemAdapter::new()),
            options,
        );

        // Step 3: Ctrl-C stops scheduling new files
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing files in flight");
                on_signal.cancel();
            }
        });

        info!(
            site = %config.remote.site_url,
            library = %config.remote.library_name,
            target = %config.sync.target_path.display(),
            "Starting mirror run"
        );
        formatter.progress(&format!(
            "Mirroring '{}' into {}",
            config.remote.library_name,
            config.sync.target_path.display()
        ));

        let progress_out = get_formatter(format, quiet);
        let result = engine
            .run(
                &config.remote.library_name,
                &config.sync.target_path,
                cancel,
                move |p| {
                    progress_out.progress(&format!(
                        "Listed page {} ({} item{}, {} total)",
                        p.page,
                        p.page_items,
                        plural(p.page_items),
                        p.total_items
                    ))
                },
            )
            .await;

        let report = result.context("Mirror run could not start")?;

        // Step 4: Display results
        match format {
            OutputFormat::Json => formatter.print_json(&report.to_json()),
            OutputFormat::Human => formatter.block(&report::summarize(&report)),
        }

        Ok(())
    }
}
