//! Site and document library resolution
//!
//! A library is addressed by the site URL (for example
//! `https://contoso.sharepoint.com/sites/Team`) and the library's display
//! name (`Documents`). Resolution takes two Graph calls:
//!
//! 1. `GET /sites/{hostname}:{site-path}` for the site id
//! 2. `GET /sites/{site-id}/drives` to find the drive backing the library
//!
//! The drive's web URL gives the server-relative root of the library, which
//! is the prefix every item path in the listing starts with.

use docmirror_core::domain::{LibraryId, ServerRelativePath};
use docmirror_core::ports::LibraryInfo;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::client::GraphClient;
use crate::GraphError;

// ============================================================================
// Graph API response types
// ============================================================================

/// Response from `GET /sites/{hostname}:{path}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphSite {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    web_url: Option<String>,
}

/// Response from `GET /sites/{id}/drives`
#[derive(Debug, Deserialize)]
struct GraphDriveCollection {
    #[serde(default)]
    value: Vec<GraphDrive>,
}

/// A drive (document library) on a site
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDrive {
    id: String,
    #[serde(default)]
    name: String,
    web_url: String,
    #[serde(default)]
    drive_type: Option<String>,
}

// ============================================================================
// SiteAddress
// ============================================================================

/// A SharePoint site split into the parts Graph addresses it by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    hostname: String,
    /// Percent-encoded site path, empty for the root site
    path: String,
}

impl SiteAddress {
    /// Parses an absolute site URL
    pub fn parse(site_url: &str) -> Result<Self, GraphError> {
        let url = Url::parse(site_url.trim())
            .map_err(|e| GraphError::InvalidAddress(format!("{site_url}: {e}")))?;
        let hostname = url
            .host_str()
            .ok_or_else(|| GraphError::InvalidAddress(format!("{site_url}: missing host")))?
            .to_string();
        let path = url.path().trim_end_matches('/').to_string();
        Ok(Self { hostname, path })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Graph API path of the site resource
    pub fn graph_path(&self) -> String {
        if self.path.is_empty() {
            format!("/sites/{}", self.hostname)
        } else {
            format!("/sites/{}:{}", self.hostname, self.path)
        }
    }
}

// ============================================================================
// Path helpers
// ============================================================================

/// Percent-decodes a single segment, keeping it raw if it is not UTF-8
pub(crate) fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Builds a percent-encoded server-relative path from decoded segments
pub(crate) fn encode_path<'a>(
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<ServerRelativePath, GraphError> {
    let mut encoded = String::new();
    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        encoded.push('/');
        encoded.push_str(&urlencoding::encode(segment));
    }
    if encoded.is_empty() {
        encoded.push('/');
    }
    ServerRelativePath::new(encoded).map_err(|e| GraphError::InvalidAddress(e.to_string()))
}

/// Server-relative root of a library, in canonical encoding, from its web URL
pub(crate) fn root_from_web_url(web_url: &str) -> Result<ServerRelativePath, GraphError> {
    let url = Url::parse(web_url)
        .map_err(|e| GraphError::InvalidResponse(format!("Invalid library URL {web_url}: {e}")))?;
    let decoded: Vec<String> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect();
    encode_path(decoded.iter().map(String::as_str))
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a document library on the site by display name
///
/// The name is matched case-insensitively against the drive's display name
/// and, failing that, against the last segment of its URL (so both
/// `Documents` and `Shared Documents` find the default library).
#[tracing::instrument(skip(client), fields(site = %site.graph_path()))]
pub async fn resolve_library(
    client: &GraphClient,
    site: &SiteAddress,
    library_name: &str,
) -> Result<LibraryInfo, GraphError> {
    let graph_site: GraphSite = client.get_json(&site.graph_path()).await?;
    debug!(
        site_id = %graph_site.id,
        name = ?graph_site.display_name,
        url = ?graph_site.web_url,
        "Site resolved"
    );

    let drives: GraphDriveCollection = client
        .get_json(&format!("/sites/{}/drives", graph_site.id))
        .await?;

    let wanted = library_name.trim().to_lowercase();
    let drive = drives
        .value
        .iter()
        .find(|d| d.name.to_lowercase() == wanted)
        .or_else(|| {
            drives.value.iter().find(|d| {
                Url::parse(&d.web_url)
                    .ok()
                    .and_then(|u| u.path_segments().and_then(|s| s.last().map(decode_segment)))
                    .is_some_and(|last| last.to_lowercase() == wanted)
            })
        })
        .ok_or_else(|| {
            let available: Vec<&str> = drives.value.iter().map(|d| d.name.as_str()).collect();
            GraphError::NotFound(format!(
                "No document library named '{library_name}' (available: {})",
                available.join(", ")
            ))
        })?;

    let info = LibraryInfo {
        id: LibraryId::new(drive.id.clone())
            .map_err(|e| GraphError::InvalidResponse(e.to_string()))?,
        name: drive.name.clone(),
        web_url: drive.web_url.clone(),
        server_relative_root: root_from_web_url(&drive.web_url)?,
    };

    info!(
        library = %info.name,
        drive_type = ?drive.drive_type,
        root = %info.server_relative_root,
        "Document library resolved"
    );
    Ok(info)
}
