//! End-to-end mirror runs through GraphLibraryProvider against the mock
//! Graph API

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use docmirror_core::domain::ErrorKind;
use docmirror_graph::library::SiteAddress;
use docmirror_graph::provider::GraphLibraryProvider;
use docmirror_sync::engine::{MirrorEngine, MirrorOptions};
use docmirror_sync::filesystem::LocalFileSystemAdapter;
use docmirror_sync::transfer::RetryPolicy;
use docmirror_sync::MirrorError;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

async fn engine() -> (wiremock::MockServer, MirrorEngine) {
    engine_with_retry(RetryPolicy::none()).await
}

async fn engine_with_retry(retry: RetryPolicy) -> (wiremock::MockServer, MirrorEngine) {
    let (server, client) = common::setup_graph_mock().await;
    let site = SiteAddress::parse("https://contoso.sharepoint.com/sites/Team").unwrap();
    let provider = Arc::new(GraphLibraryProvider::new(Arc::new(client), site));

    let options = MirrorOptions {
        retry,
        ..MirrorOptions::default()
    };
    let engine = MirrorEngine::new(
        provider.clone(),
        provider,
        Arc::new(LocalFileSystemAdapter::new()),
        options,
    );
    (server, engine)
}

#[tokio::test]
async fn test_mirror_run_through_graph() {
    let (server, engine) = engine().await;
    common::mount_listing_single_page(
        &server,
        serde_json::json!([
            common::list_item("1", "/sites/Team/Shared Documents/Plans", true, "2024-01-01T00:00:00Z"),
            common::list_item("2", "/sites/Team/Shared Documents/Plans/a;b.docx", false, "2024-01-02T03:04:05Z"),
            common::list_item("3", "/sites/Team/Shared Documents/top.txt", false, "2024-01-03T00:00:00Z"),
        ]),
    )
    .await;
    common::mount_content(&server, "Plans/a%3Bb.docx", b"plan").await;
    common::mount_content(&server, "top.txt", b"top").await;
    let target = TempDir::new().unwrap();

    let report = engine
        .run("Documents", target.path(), CancellationToken::new(), |_| {})
        .await
        .expect("run failed");

    assert_eq!(report.total_remote_files, 2);
    assert_eq!(report.tally.downloaded(), 2);
    assert_eq!(report.tally.total_errors(), 0);

    let nested = target.path().join("Plans").join("a;b.docx");
    assert_eq!(std::fs::read(&nested).unwrap(), b"plan");
    let mtime = filetime::FileTime::from_last_modification_time(&std::fs::metadata(&nested).unwrap());
    assert_eq!(
        mtime.unix_seconds(),
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap().timestamp()
    );

    // Nothing changed remotely, so the second pass skips everything
    let again = engine
        .run("Documents", target.path(), CancellationToken::new(), |_| {})
        .await
        .expect("second run failed");
    assert_eq!(again.tally.skipped(), 2);
    assert_eq!(again.tally.downloaded(), 0);
}

#[tokio::test]
async fn test_mirror_run_records_failed_download() {
    let (server, engine) = engine().await;
    common::mount_listing_single_page(
        &server,
        serde_json::json!([
            common::list_item("1", "/sites/Team/Shared Documents/ok.txt", false, "2024-01-01T00:00:00Z"),
            common::list_item("2", "/sites/Team/Shared Documents/missing.txt", false, "2024-01-01T00:00:00Z"),
        ]),
    )
    .await;
    common::mount_content(&server, "ok.txt", b"ok").await;
    let target = TempDir::new().unwrap();

    let report = engine
        .run("Documents", target.path(), CancellationToken::new(), |_| {})
        .await
        .expect("run failed");

    assert_eq!(report.tally.downloaded(), 1);
    assert_eq!(report.tally.errors_of(ErrorKind::Download), 1);
    assert!(!target.path().join("missing.txt").exists());
}

#[tokio::test]
async fn test_not_found_is_fetched_once_whatever_the_path() {
    let (server, engine) = engine_with_retry(RetryPolicy::new(3, Duration::from_millis(1))).await;
    common::mount_listing_single_page(
        &server,
        serde_json::json!([
            common::list_item("1", "/sites/Team/Shared Documents/Network Diagrams/rack_500.vsdx", false, "2024-01-01T00:00:00Z"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/drives/{}/root:/Network%20Diagrams/rack_500.vsdx:/content",
            common::DRIVE_ID
        )))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": "itemNotFound", "message": "The resource could not be found." }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let target = TempDir::new().unwrap();

    let report = engine
        .run("Documents", target.path(), CancellationToken::new(), |_| {})
        .await
        .expect("run failed");

    assert_eq!(report.tally.errors_of(ErrorKind::Download), 1);
    let failed = &report.tally.records_of(ErrorKind::Download)[0];
    assert!(failed.message().contains("itemNotFound"));
}

#[tokio::test]
async fn test_mirror_run_unknown_library() {
    let (_server, engine) = engine().await;
    let target = TempDir::new().unwrap();

    let err = engine
        .run("Finance", target.path(), CancellationToken::new(), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::LibraryNotFound { .. }));
}
