//! Integration tests for paginated library listing

use docmirror_graph::listing::list_page;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, DRIVE_ID};

#[tokio::test]
async fn test_listing_single_page_files_and_folders() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_listing_single_page(
        &server,
        serde_json::json!([
            common::list_item("1", "/sites/Team/Shared Documents/Plans", true, "2024-01-01T00:00:00Z"),
            common::list_item("2", "/sites/Team/Shared Documents/Plans/a;b.docx", false, "2024-01-02T00:00:00Z"),
        ]),
    )
    .await;

    let page = list_page(&client, &common::documents_library(), 500, None)
        .await
        .expect("listing failed");

    assert!(page.next.is_none());
    assert_eq!(page.items.len(), 2);
    assert!(!page.items[0].is_file());

    let file = &page.items[1];
    assert!(file.is_file());
    assert_eq!(
        file.server_relative_path().as_str(),
        "/sites/Team/Shared%20Documents/Plans/a%3Bb.docx"
    );
    assert_eq!(file.leaf_name(), "a%3Bb.docx");
    assert_eq!(file.size(), Some(11));
}

#[tokio::test]
async fn test_listing_requests_page_size() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/drives/{DRIVE_ID}/list/items")))
        .and(query_param("$top", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let page = list_page(&client, &common::documents_library(), 2, None)
        .await
        .expect("listing failed");
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_listing_follows_next_link() {
    let (server, client) = common::setup_graph_mock().await;
    let items_path = format!("/drives/{DRIVE_ID}/list/items");

    Mock::given(method("GET"))
        .and(path(items_path.clone()))
        .and(query_param_is_missing("$skiptoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [common::list_item("1", "/sites/Team/Shared Documents/one.txt", false, "2024-01-01T00:00:00Z")],
            "@odata.nextLink": format!("{}{items_path}?$skiptoken=page2", server.uri())
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(items_path.clone()))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [common::list_item("2", "/sites/Team/Shared Documents/two.txt", false, "2024-01-01T00:00:00Z")]
        })))
        .mount(&server)
        .await;

    let library = common::documents_library();
    let first = list_page(&client, &library, 1, None).await.unwrap();
    assert_eq!(first.items.len(), 1);
    let cursor = first.next.expect("first page should have a next link");

    let second = list_page(&client, &library, 1, Some(&cursor)).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].leaf_name(), "two.txt");
    assert!(second.next.is_none());

    // Replaying a cursor fetches the same page again
    let replay = list_page(&client, &library, 1, Some(&cursor)).await.unwrap();
    assert_eq!(replay.items[0].leaf_name(), "two.txt");
}

#[tokio::test]
async fn test_listing_skips_malformed_items() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_listing_single_page(
        &server,
        serde_json::json!([
            { "id": "broken", "lastModifiedDateTime": "2024-01-01T00:00:00Z", "fields": {} },
            common::list_item("ok", "/sites/Team/Shared Documents/ok.txt", false, "2024-01-01T00:00:00Z"),
        ]),
    )
    .await;

    let page = list_page(&client, &common::documents_library(), 500, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].leaf_name(), "ok.txt");
}

#[tokio::test]
async fn test_listing_retries_throttled_request() {
    let (server, client) = common::setup_graph_mock().await;
    let items_path = format!("/drives/{DRIVE_ID}/list/items");

    Mock::given(method("GET"))
        .and(path(items_path.clone()))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    common::mount_listing_single_page(
        &server,
        serde_json::json!([common::list_item("1", "/sites/Team/Shared Documents/x.txt", false, "2024-01-01T00:00:00Z")]),
    )
    .await;

    let page = list_page(&client, &common::documents_library(), 500, None)
        .await
        .expect("throttled request should be retried");
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn test_listing_server_error_is_transient() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/drives/{DRIVE_ID}/list/items")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = list_page(&client, &common::documents_library(), 500, None)
        .await
        .unwrap_err();
    assert!(err.is_transient());
}
