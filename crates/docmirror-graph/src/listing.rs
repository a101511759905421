//! Paginated library listing
//!
//! Lists every item of a document library through the library's list:
//!
//! `GET /drives/{drive-id}/list/items?$expand=fields(...)&$top={page_size}`
//!
//! Each list item carries its server-relative path (`FileRef`), leaf name
//! (`FileLeafRef`) and object type (`FSObjType`: 0 file, 1 folder). Pages are
//! chained through `@odata.nextLink`, which is handed back to the caller as
//! the [`PageCursor`] for the next call.
//!
//! `FileRef` is reported decoded; it is re-encoded here so descriptors
//! always carry canonical percent-encoded paths.

use chrono::{DateTime, Utc};
use docmirror_core::domain::RemoteFileDescriptor;
use docmirror_core::ports::{LibraryInfo, ListingPage, PageCursor};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::GraphClient;
use crate::library::encode_path;
use crate::GraphError;

/// List item fields requested for every item
const ITEM_FIELDS: &str = "FileRef,FileLeafRef,FSObjType,File_x0020_Size,Modified";

// ============================================================================
// Microsoft Graph API response types (JSON deserialization)
// ============================================================================

/// One page of `GET /drives/{id}/list/items`
#[derive(Debug, Deserialize)]
struct GraphListItemsPage {
    #[serde(default)]
    value: Vec<GraphListItem>,

    /// URL for the next page of results (present when more pages exist)
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// A list item with its expanded fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphListItem {
    #[serde(default)]
    id: Option<String>,
    last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    fields: Option<GraphItemFields>,
}

/// The SharePoint columns of a list item
///
/// Field values are loosely typed by the service (numbers sometimes arrive
/// as strings), so the numeric ones are read through [`Value`].
#[derive(Debug, Deserialize)]
struct GraphItemFields {
    #[serde(rename = "FileRef")]
    file_ref: Option<String>,
    #[serde(rename = "FileLeafRef")]
    file_leaf_ref: Option<String>,
    #[serde(rename = "FSObjType")]
    fs_obj_type: Option<Value>,
    #[serde(rename = "File_x0020_Size")]
    size: Option<Value>,
    #[serde(rename = "Modified")]
    modified: Option<DateTime<Utc>>,
}

/// Reads a number that may be encoded as a JSON number or a string
fn loose_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Converts a list item to a descriptor; None for items that cannot be used
fn parse_item(item: GraphListItem) -> Option<RemoteFileDescriptor> {
    let id = item.id.as_deref().unwrap_or("?");
    let Some(fields) = item.fields else {
        warn!(id, "List item without fields, skipping");
        return None;
    };
    let Some(file_ref) = fields.file_ref.as_deref() else {
        warn!(id, "List item without FileRef, skipping");
        return None;
    };

    let path = match encode_path(file_ref.split('/')) {
        Ok(path) => path,
        Err(e) => {
            warn!(id, file_ref, error = %e, "Unusable FileRef, skipping");
            return None;
        }
    };
    let leaf = fields
        .file_leaf_ref
        .as_deref()
        .or_else(|| file_ref.rsplit('/').next())
        .unwrap_or_default();
    let leaf = urlencoding::encode(leaf).into_owned();

    let Some(modified) = item.last_modified_date_time.or(fields.modified) else {
        warn!(id, file_ref, "List item without modification time, skipping");
        return None;
    };

    let descriptor = match fields.fs_obj_type.as_ref().and_then(loose_u64) {
        Some(0) => RemoteFileDescriptor::file(path, leaf, modified),
        Some(_) => RemoteFileDescriptor::folder(path, leaf, modified),
        None => {
            warn!(id, file_ref, "List item without object type, treating as non-file");
            RemoteFileDescriptor::folder(path, leaf, modified)
        }
    };

    Some(match fields.size.as_ref().and_then(loose_u64) {
        Some(size) => descriptor.with_size(size),
        None => descriptor,
    })
}

fn parse_page(page: GraphListItemsPage) -> ListingPage {
    ListingPage {
        items: page.value.into_iter().filter_map(parse_item).collect(),
        next: page.next_link.map(PageCursor::new),
    }
}

/// Path of the first listing page
fn first_page_path(library: &LibraryInfo, page_size: u32) -> String {
    format!(
        "/drives/{}/list/items?$expand=fields($select={ITEM_FIELDS})&$top={page_size}",
        library.id
    )
}

// ============================================================================
// Listing
// ============================================================================

/// Fetches one page of the library listing
///
/// Pass `cursor = None` for the first page and the returned `next` cursor
/// afterwards. Replaying a cursor re-fetches the same page.
pub async fn list_page(
    client: &GraphClient,
    library: &LibraryInfo,
    page_size: u32,
    cursor: Option<&PageCursor>,
) -> Result<ListingPage, GraphError> {
    let url = match cursor {
        Some(cursor) => cursor.as_str().to_string(),
        None => first_page_path(library, page_size),
    };

    let raw: GraphListItemsPage = client.get_json(&url).await?;
    let received = raw.value.len();
    let page = parse_page(raw);

    debug!(
        received,
        usable = page.items.len(),
        has_next = page.next.is_some(),
        "Received listing page"
    );
    Ok(page)
}

// ============================================================================
// Tests
// ============================================================================
