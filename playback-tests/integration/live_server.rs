//! Streaming over a real TCP listener
//!
//! Exercises the chunked body path end to end with an HTTP client,
//! including a video larger than one read chunk.

use std::net::SocketAddr;

use playback_core::streaming::test_fixtures::{VideoLibraryFixture, patterned_bytes};
use playback_web::{AppState, serve};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct LiveServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl LiveServer {
    async fn start(fixture: &VideoLibraryFixture, chunk_size: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::new(fixture.streamer().with_chunk_size(chunk_size));
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(serve(listener, state, async {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_full_download_spans_many_chunks() {
    let fixture = VideoLibraryFixture::new();
    let data = patterned_bytes(256 * 1024 + 17);
    fixture.write_video("trailer", &data);
    let server = LiveServer::start(&fixture, 4096).await;

    let response = reqwest::get(server.url("/api/stream/trailer")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.content_length(), Some(data.len() as u64));
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], &data[..]);

    server.stop().await;
}

#[tokio::test]
async fn test_range_request_over_the_wire() {
    let fixture = VideoLibraryFixture::new();
    let data = patterned_bytes(100_000);
    fixture.write_video("trailer", &data);
    let server = LiveServer::start(&fixture, 1024).await;

    let response = reqwest::Client::new()
        .get(server.url("/api/stream/trailer"))
        .header(reqwest::header::RANGE, "bytes=5000-70000")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok()),
        Some("bytes 5000-70000/100000")
    );
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok()),
        Some("bytes")
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], &data[5000..=70000]);

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients_get_independent_slices() {
    let fixture = VideoLibraryFixture::new();
    let data = patterned_bytes(50_000);
    fixture.write_video("trailer", &data);
    let server = LiveServer::start(&fixture, 512).await;
    let client = reqwest::Client::new();

    let requests = (0..8u64).map(|i| {
        let client = client.clone();
        let url = server.url("/api/stream/trailer");
        async move {
            let start = i * 6000;
            let end = start + 999;
            let body = client
                .get(url)
                .header(reqwest::header::RANGE, format!("bytes={start}-{end}"))
                .send()
                .await
                .unwrap()
                .bytes()
                .await
                .unwrap();
            (start as usize, end as usize, body)
        }
    });

    for (start, end, body) in futures::future::join_all(requests).await {
        assert_eq!(&body[..], &data[start..=end]);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_unsatisfiable_range_over_the_wire() {
    let fixture = VideoLibraryFixture::new();
    fixture.write_video("trailer", &patterned_bytes(10));
    let server = LiveServer::start(&fixture, 1024).await;

    let response = reqwest::Client::new()
        .get(server.url("/api/stream/trailer"))
        .header(reqwest::header::RANGE, "bytes=0-10")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::RANGE_NOT_SATISFIABLE);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "INVALID_RANGE");

    server.stop().await;
}
