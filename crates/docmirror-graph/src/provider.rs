//! GraphLibraryProvider - remote library ports for Microsoft Graph
//!
//! Wraps a shared [`GraphClient`] and delegates to the library, listing and
//! content modules to fulfil [`IRemoteLibrary`] and [`IContentFetcher`].
//!
//! ## Design Notes
//!
//! - The client is shared behind an `Arc`; the access token inside it is
//!   swapped in place when the session refreshes it, so concurrent
//!   transfers need no lock around the client.
//! - Graph errors cross the port as [`RemoteFailure`], which carries the
//!   retry classification from [`crate::GraphError::is_transient`].
//! - With a [`GraphSession`] attached, every operation first asks the
//!   session for a valid token. Without one the client's token is used as is
//!   (tests against a mock server).

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use docmirror_core::domain::{RemoteFailure, ServerRelativePath};
use docmirror_core::ports::{IContentFetcher, IRemoteLibrary, LibraryInfo, ListingPage, PageCursor};
use tracing::debug;

use crate::auth::GraphSession;
use crate::client::GraphClient;
use crate::library::{self, SiteAddress};
use crate::{content, listing};

/// [`IRemoteLibrary`] and [`IContentFetcher`] backed by Microsoft Graph
pub struct GraphLibraryProvider {
    client: Arc<GraphClient>,
    site: SiteAddress,
    session: Option<Arc<GraphSession>>,
}

impl GraphLibraryProvider {
    /// Creates a provider for the given site
    pub fn new(client: Arc<GraphClient>, site: SiteAddress) -> Self {
        Self {
            client,
            site,
            session: None,
        }
    }

    /// Keeps the client's access token current through the session
    #[must_use]
    pub fn with_session(mut self, session: Arc<GraphSession>) -> Self {
        self.session = Some(session);
        self
    }

    async fn ensure_token(&self) -> Result<()> {
        if let Some(session) = &self.session {
            let token = session
                .access_token()
                .await
                .context("Failed to obtain an access token")?;
            self.client.set_access_token(token);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IRemoteLibrary for GraphLibraryProvider {
    async fn resolve_library(&self, name: &str) -> Result<LibraryInfo> {
        self.ensure_token().await?;
        debug!(library = name, "GraphLibraryProvider::resolve_library");
        library::resolve_library(&self.client, &self.site, name)
            .await
            .map_err(RemoteFailure::from)
            .with_context(|| format!("Failed to resolve library '{name}'"))
    }

    async fn list_page(
        &self,
        library: &LibraryInfo,
        page_size: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<ListingPage> {
        self.ensure_token().await?;
        debug!(
            library = %library.name,
            page_size,
            has_cursor = cursor.is_some(),
            "GraphLibraryProvider::list_page"
        );
        listing::list_page(&self.client, library, page_size, cursor)
            .await
            .map_err(RemoteFailure::from)
            .context("Failed to list library items")
    }
}

#[async_trait::async_trait]
impl IContentFetcher for GraphLibraryProvider {
    async fn fetch(
        &self,
        library: &LibraryInfo,
        server_relative_path: &ServerRelativePath,
        target_dir: &Path,
        file_name: &str,
    ) -> Result<()> {
        self.ensure_token().await?;
        content::download_to(&self.client, library, server_relative_path, target_dir, file_name)
            .await
            .map_err(RemoteFailure::from)
            .with_context(|| format!("Failed to download {server_relative_path}"))?;
        Ok(())
    }
}
