//! Streaming download with progress against a mock artifact server

use vibecraft_updater::ErrorKind;
use vibecraft_updater::download::{CHUNK_SIZE, ChannelSink, Downloader, TransferProgress};

#[tokio::test]
async fn progress_is_monotonic_and_bounded() {
    let body: Vec<u8> = (0..(CHUNK_SIZE * 3 + 123))
        .map(|i| (i % 251) as u8)
        .collect();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1.3.0/app-linux")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(dir.path()).unwrap();

    let mut events: Vec<TransferProgress> = Vec::new();
    let url = format!("{}/v1.3.0/app-linux", server.url());
    let path = downloader
        .download(&url, &mut |p: TransferProgress| events.push(p))
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("app-linux"));
    assert_eq!(std::fs::read(&path).unwrap(), body);

    assert!(!events.is_empty());
    assert!(
        events
            .windows(2)
            .all(|w| w[0].downloaded <= w[1].downloaded)
    );
    assert!(
        events
            .iter()
            .all(|p| p.percent() <= 100 && p.total == Some(body.len() as u64))
    );
    let last = events.last().unwrap();
    assert_eq!(last.downloaded, body.len() as u64);
    assert_eq!(last.percent(), 100);
}

#[tokio::test]
async fn channel_sink_receives_progress() {
    let body = vec![7u8; CHUNK_SIZE + 1];
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/artifact.zip")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(dir.path()).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let mut sink = ChannelSink::new(tx);
    let url = format!("{}/artifact.zip", server.url());
    downloader.download(&url, &mut sink).await.unwrap();
    drop(sink);

    let mut last = None;
    while let Some(p) = rx.recv().await {
        last = Some(p);
    }
    assert_eq!(last.map(|p| p.downloaded), Some(body.len() as u64));
}

#[tokio::test]
async fn dropped_receiver_does_not_fail_download() {
    let body = vec![1u8; CHUNK_SIZE * 2];
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/artifact.zip")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(dir.path()).unwrap();

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    drop(rx);
    let url = format!("{}/artifact.zip", server.url());
    let path = downloader
        .download(&url, &mut ChannelSink::new(tx))
        .await
        .unwrap();

    assert_eq!(
        std::fs::metadata(path).unwrap().len(),
        body.len() as u64
    );
}

#[tokio::test]
async fn empty_body_reports_no_progress() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/empty.zip")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(dir.path()).unwrap();

    let mut calls = 0;
    let url = format!("{}/empty.zip", server.url());
    let path = downloader
        .download(&url, &mut |_: TransferProgress| calls += 1)
        .await
        .unwrap();

    assert_eq!(calls, 0);
    assert_eq!(std::fs::metadata(path).unwrap().len(), 0);
}

#[tokio::test]
async fn non_200_is_http_error_and_writes_nothing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/gone.zip")
        .with_status(404)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(dir.path()).unwrap();

    let url = format!("{}/gone.zip", server.url());
    let err = downloader
        .download(&url, &mut |_: TransferProgress| {})
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http);
    assert!(!dir.path().join("gone.zip").exists());
}
