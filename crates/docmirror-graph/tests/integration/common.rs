//! Shared test helpers for Graph API integration tests
//!
//! Provides wiremock-based mock server setup for the Graph endpoints the
//! mirror uses. Each helper mounts the necessary mock endpoints and returns
//! a configured GraphClient pointing at the mock server.

use docmirror_core::domain::{LibraryId, ServerRelativePath};
use docmirror_core::ports::LibraryInfo;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docmirror_graph::client::GraphClient;

pub const DRIVE_ID: &str = "b!drive-test-001";
pub const SITE_ID: &str = "contoso.sharepoint.com,site-guid,web-guid";

/// Sets up a mock server with the site and drive collection endpoints and
/// returns a (MockServer, GraphClient) tuple.
///
/// Pre-configured endpoints:
/// - GET /sites/contoso.sharepoint.com:/sites/Team → site
/// - GET /sites/{site-id}/drives → "Documents" and "Archive" libraries
pub async fn setup_graph_mock() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/Team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": SITE_ID,
            "displayName": "Team",
            "webUrl": "https://contoso.sharepoint.com/sites/Team"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sites/{SITE_ID}/drives")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {
                    "id": DRIVE_ID,
                    "name": "Documents",
                    "webUrl": "https://contoso.sharepoint.com/sites/Team/Shared%20Documents",
                    "driveType": "documentLibrary"
                },
                {
                    "id": "b!drive-archive",
                    "name": "Archive",
                    "webUrl": "https://contoso.sharepoint.com/sites/Team/Archive",
                    "driveType": "documentLibrary"
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = GraphClient::with_base_url("test-access-token", server.uri())
        .with_max_throttle_retries(2);

    (server, client)
}

/// The "Documents" library as resolved from [`setup_graph_mock`]
pub fn documents_library() -> LibraryInfo {
    LibraryInfo {
        id: LibraryId::new(DRIVE_ID).unwrap(),
        name: "Documents".to_string(),
        web_url: "https://contoso.sharepoint.com/sites/Team/Shared%20Documents".to_string(),
        server_relative_root: ServerRelativePath::new("/sites/Team/Shared%20Documents").unwrap(),
    }
}

/// A list item as returned by `/drives/{id}/list/items` with expanded fields
pub fn list_item(id: &str, file_ref: &str, is_folder: bool, modified: &str) -> serde_json::Value {
    let leaf = file_ref.rsplit('/').next().unwrap_or_default();
    serde_json::json!({
        "id": id,
        "lastModifiedDateTime": modified,
        "fields": {
            "FileRef": file_ref,
            "FileLeafRef": leaf,
            "FSObjType": if is_folder { "1" } else { "0" },
            "File_x0020_Size": if is_folder { serde_json::Value::Null } else { "11".into() }
        }
    })
}

/// Mounts a listing endpoint that returns a single page with given items.
pub async fn mount_listing_single_page(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/drives/{DRIVE_ID}/list/items")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": items
        })))
        .mount(server)
        .await;
}

/// Mounts a file content endpoint for a path relative to the library root
/// (already percent-encoded).
pub async fn mount_content(server: &MockServer, relative: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/drives/{DRIVE_ID}/root:/{relative}:/content")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}
