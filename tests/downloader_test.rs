//! Batch downloader tests against a mock file host.

use std::time::Duration;

use assert_matches::assert_matches;
use debridflow::config::DownloadConfig;
use debridflow::download::{BatchDownloader, DownloadError, DownloadRequest};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(concurrency: usize) -> BatchDownloader {
    let config = DownloadConfig {
        concurrency,
        ..DownloadConfig::default()
    };
    BatchDownloader::new(&config).with_progress_interval(Duration::from_millis(10))
}

async fn serve(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn downloads_every_file_into_directory() {
    let server = MockServer::start().await;
    serve(&server, "/d/one", b"first file").await;
    serve(&server, "/d/two", &vec![7u8; 64 * 1024]).await;
    serve(&server, "/d/three", b"third").await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Release");
    let requests = vec![
        DownloadRequest::new(format!("{}/d/one", server.uri()), "One.mkv"),
        DownloadRequest::new(format!("{}/d/two", server.uri()), "Two.mkv"),
        DownloadRequest::new(format!("{}/d/three", server.uri()), "Three.srt"),
    ];

    let written = downloader(2).download_all(requests, &target).await.unwrap();

    assert_eq!(
        written,
        vec![
            target.join("One.mkv"),
            target.join("Two.mkv"),
            target.join("Three.srt")
        ]
    );
    assert_eq!(std::fs::read(&written[0]).unwrap(), b"first file");
    assert_eq!(std::fs::read(&written[1]).unwrap().len(), 64 * 1024);
    assert_eq!(std::fs::read(&written[2]).unwrap(), b"third");
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let written = downloader(4)
        .download_all(Vec::new(), dir.path())
        .await
        .unwrap();
    assert!(written.is_empty());
}

#[tokio::test]
async fn http_error_fails_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = downloader(1)
        .download_all(
            vec![DownloadRequest::new(
                format!("{}/d/missing", server.uri()),
                "Missing.mkv",
            )],
            dir.path(),
        )
        .await
        .unwrap_err();

    assert_matches!(err, DownloadError::Status { status: 404, .. });
}

#[tokio::test]
async fn first_failure_does_not_wait_for_slow_transfers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let requests = vec![
        DownloadRequest::new(format!("{}/d/slow", server.uri()), "Slow.mkv"),
        DownloadRequest::new(format!("{}/d/broken", server.uri()), "Broken.mkv"),
    ];

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        downloader(2).download_all(requests, dir.path()),
    )
    .await
    .expect("download_all waited for the slow transfer");

    assert_matches!(result, Err(DownloadError::Status { status: 500, .. }));
}

#[tokio::test]
async fn rejects_path_traversal_in_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let err = downloader(1)
        .download_all(
            vec![DownloadRequest::new("http://127.0.0.1:1/x", "../escape.mkv")],
            dir.path(),
        )
        .await
        .unwrap_err();

    assert_matches!(err, DownloadError::InvalidName(_));
}
