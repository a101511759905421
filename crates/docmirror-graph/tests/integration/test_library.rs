//! Integration tests for site and document library resolution

use docmirror_graph::library::{resolve_library, SiteAddress};
use docmirror_graph::GraphError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn team_site() -> SiteAddress {
    SiteAddress::parse("https://contoso.sharepoint.com/sites/Team").unwrap()
}

#[tokio::test]
async fn test_resolve_library_by_display_name() {
    let (_server, client) = common::setup_graph_mock().await;

    let library = resolve_library(&client, &team_site(), "Documents")
        .await
        .expect("resolution failed");

    assert_eq!(library.id.as_str(), common::DRIVE_ID);
    assert_eq!(library.name, "Documents");
    assert_eq!(
        library.server_relative_root.as_str(),
        "/sites/Team/Shared%20Documents"
    );
}

#[tokio::test]
async fn test_resolve_library_by_url_segment_case_insensitive() {
    let (_server, client) = common::setup_graph_mock().await;

    let library = resolve_library(&client, &team_site(), "shared documents")
        .await
        .expect("resolution failed");

    assert_eq!(library.id.as_str(), common::DRIVE_ID);
}

#[tokio::test]
async fn test_resolve_unknown_library_is_not_found() {
    let (_server, client) = common::setup_graph_mock().await;

    let err = resolve_library(&client, &team_site(), "Finance")
        .await
        .unwrap_err();

    match err {
        GraphError::NotFound(message) => {
            assert!(message.contains("Finance"));
            assert!(message.contains("Archive"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resolve_unknown_site_is_not_found() {
    let (_server, client) = common::setup_graph_mock().await;
    let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/Missing").unwrap();

    let err = resolve_library(&client, &site, "Documents").await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));
}

#[tokio::test]
async fn test_resolve_library_forbidden() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/Team"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": "accessDenied", "message": "Access denied" }
        })))
        .mount(&server)
        .await;
    let client = docmirror_graph::client::GraphClient::with_base_url("t", server.uri());

    let err = resolve_library(&client, &team_site(), "Documents")
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Forbidden(ref m) if m.contains("accessDenied")));
}
