//! Integration tests for file content download

use docmirror_core::domain::ServerRelativePath;
use docmirror_graph::content::download_to;
use docmirror_graph::GraphError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, DRIVE_ID};

#[tokio::test]
async fn test_download_writes_file() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_content(&server, "Q1%20Plans/a%3Bb.docx", b"hello world").await;
    let dir = TempDir::new().unwrap();

    let path =
        ServerRelativePath::new("/sites/Team/Shared%20Documents/Q1%20Plans/a%3Bb.docx").unwrap();
    let written = download_to(&client, &common::documents_library(), &path, dir.path(), "a;b.docx")
        .await
        .expect("download failed");

    assert_eq!(written, 11);
    assert_eq!(
        std::fs::read(dir.path().join("a;b.docx")).unwrap(),
        b"hello world"
    );
    assert!(!dir.path().join(".a;b.docx.docmirror-partial").exists());
}

#[tokio::test]
async fn test_download_overwrites_existing_file() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_content(&server, "report.txt", b"new").await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("report.txt"), b"old content").unwrap();

    let path = ServerRelativePath::new("/sites/Team/Shared%20Documents/report.txt").unwrap();
    download_to(&client, &common::documents_library(), &path, dir.path(), "report.txt")
        .await
        .unwrap();

    assert_eq!(std::fs::read(dir.path().join("report.txt")).unwrap(), b"new");
}

#[tokio::test]
async fn test_download_follows_redirect() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("/drives/{DRIVE_ID}/root:/moved.txt:/content")))
        .respond_with(
            ResponseTemplate::new(302)
                .append_header("Location", format!("{}/download/abc", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"redirected".to_vec()))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let path = ServerRelativePath::new("/sites/Team/Shared%20Documents/moved.txt").unwrap();
    download_to(&client, &common::documents_library(), &path, dir.path(), "moved.txt")
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(dir.path().join("moved.txt")).unwrap(),
        b"redirected"
    );
}

#[tokio::test]
async fn test_download_missing_item_leaves_nothing_behind() {
    let (_server, client) = common::setup_graph_mock().await;
    let dir = TempDir::new().unwrap();

    let path = ServerRelativePath::new("/sites/Team/Shared%20Documents/gone.txt").unwrap();
    let err = download_to(&client, &common::documents_library(), &path, dir.path(), "gone.txt")
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::NotFound(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_outside_library_root_is_rejected() {
    let (_server, client) = common::setup_graph_mock().await;
    let dir = TempDir::new().unwrap();

    let path = ServerRelativePath::new("/sites/Other/Docs/x.txt").unwrap();
    let err = download_to(&client, &common::documents_library(), &path, dir.path(), "x.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidAddress(_)));
}
