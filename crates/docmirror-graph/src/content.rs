//! File content download
//!
//! Content is addressed by path relative to the library root:
//!
//! `GET /drives/{drive-id}/root:/{relative-path}:/content`
//!
//! Graph answers with a redirect to a pre-authenticated download URL, which
//! reqwest follows. The body is streamed into a hidden partial file next to
//! the target and renamed into place once complete, so an interrupted
//! transfer never leaves a truncated file under the real name.

use std::path::{Path, PathBuf};

use docmirror_core::domain::ServerRelativePath;
use docmirror_core::ports::LibraryInfo;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::client::GraphClient;
use crate::library::decode_segment;
use crate::GraphError;

/// Suffix of the temporary file a download is written to
const PARTIAL_SUFFIX: &str = ".docmirror-partial";

/// Path of an item relative to the library root, re-encoded for a Graph
/// path-addressed request
///
/// Segments are compared decoded so that `Shared%20Documents` and
/// `Shared Documents` name the same root.
pub(crate) fn relative_item_path(
    root: &ServerRelativePath,
    path: &ServerRelativePath,
) -> Result<String, GraphError> {
    let root: Vec<String> = root.segments().map(decode_segment).collect();
    let item: Vec<String> = path.segments().map(decode_segment).collect();

    if item.len() <= root.len() || item[..root.len()] != root[..] {
        return Err(GraphError::InvalidAddress(format!(
            "{path} is not inside the library root"
        )));
    }

    Ok(item[root.len()..]
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Graph API path of an item's content
pub(crate) fn content_path(
    library: &LibraryInfo,
    path: &ServerRelativePath,
) -> Result<String, GraphError> {
    let relative = relative_item_path(&library.server_relative_root, path)?;
    Ok(format!("/drives/{}/root:/{relative}:/content", library.id))
}

fn partial_path(target_dir: &Path, file_name: &str) -> PathBuf {
    target_dir.join(format!(".{file_name}{PARTIAL_SUFFIX}"))
}

/// Downloads a file into `target_dir/file_name`, replacing any existing file
///
/// Returns the number of bytes written.
#[tracing::instrument(skip(client, library, target_dir), fields(path = %path))]
pub async fn download_to(
    client: &GraphClient,
    library: &LibraryInfo,
    path: &ServerRelativePath,
    target_dir: &Path,
    file_name: &str,
) -> Result<u64, GraphError> {
    let url = content_path(library, path)?;
    let response = client.get(&url).await?;

    let partial = partial_path(target_dir, file_name);
    let written = match write_stream(response, &partial).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial download");
                }
            }
            return Err(e);
        }
    };

    let target = target_dir.join(file_name);
    if let Err(e) = tokio::fs::rename(&partial, &target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(GraphError::Io(e));
    }

    debug!(bytes = written, target = %target.display(), "Download complete");
    Ok(written)
}

async fn write_stream(response: reqwest::Response, partial: &Path) -> Result<u64, GraphError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}
