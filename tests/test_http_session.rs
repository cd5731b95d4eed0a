//! Tests for HttpSession against a mock object-store API

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use stream_gateway::backend::http::HttpSession;
use stream_gateway::backend::{BackendSession, SessionPool};
use stream_gateway::{FileCatalog, FileLocation, FileRecord, GatewayConfig, GatewayError, SessionConfig, StreamGateway};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session(server: &MockServer, token: Option<&str>) -> HttpSession {
    HttpSession::new(
        &SessionConfig {
            name: "bot1".to_string(),
            base_url: server.uri(),
            token: token.map(str::to_string),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

fn record(remote_id: &str, size: u64) -> FileRecord {
    FileRecord {
        id: "65f0".to_string(),
        unique_id: "AgADBQADx".to_string(),
        file_size: size,
        mime_type: Some("application/pdf".to_string()),
        file_name: Some("report.pdf".to_string()),
        remote_id: remote_id.to_string(),
    }
}

#[tokio::test]
async fn test_locate_success() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/files/msg-1"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let location = session(&server, Some("secret"))
        .locate(&record("msg-1", 10))
        .await
        .unwrap();
    assert_eq!(location.as_str(), "msg-1");
}

#[tokio::test]
async fn test_locate_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/files/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/files/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/files/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let s = session(&server, None);

    let err = s.locate(&record("gone", 10)).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)), "got {:?}", err);

    let err = s.locate(&record("limited", 10)).await.unwrap_err();
    assert!(err.should_retry(), "429 should be retryable, got {:?}", err);

    let err = s.locate(&record("broken", 10)).await.unwrap_err();
    assert!(err.should_retry(), "503 should be retryable, got {:?}", err);
}

#[tokio::test]
async fn test_locate_unreachable_backend_is_unavailable() {
    // Grab a free port and release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let s = HttpSession::new(
        &SessionConfig {
            name: "bot1".to_string(),
            base_url: format!("http://{}", addr),
            token: None,
        },
        Duration::from_secs(2),
    )
    .unwrap();

    let err = s.locate(&record("msg-1", 10)).await.unwrap_err();
    assert!(err.should_retry(), "connection failure should be retryable, got {:?}", err);
}

#[tokio::test]
async fn test_fetch_chunk_sends_aligned_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/msg-1"))
        .and(header("Range", "bytes=4096-8191"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![7u8; 4096]))
        .expect(1)
        .mount(&server)
        .await;

    let chunk = session(&server, None)
        .fetch_chunk(&FileLocation::new("msg-1"), 4096, 4096)
        .await
        .unwrap();
    assert_eq!(chunk, Bytes::from(vec![7u8; 4096]));
}

#[tokio::test]
async fn test_fetch_chunk_slices_full_response() {
    let server = MockServer::start().await;
    let full: Vec<u8> = (0..100u8).collect();
    Mock::given(method("GET"))
        .and(path("/files/msg-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(full.clone()))
        .mount(&server)
        .await;

    let s = session(&server, None);
    let location = FileLocation::new("msg-1");

    let chunk = s.fetch_chunk(&location, 64, 32).await.unwrap();
    assert_eq!(&chunk[..], &full[64..96]);

    let tail = s.fetch_chunk(&location, 96, 32).await.unwrap();
    assert_eq!(&tail[..], &full[96..]);

    let past_end = s.fetch_chunk(&location, 128, 32).await.unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_fetch_chunk_past_end_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/msg-1"))
        .respond_with(ResponseTemplate::new(416))
        .mount(&server)
        .await;

    let chunk = session(&server, None)
        .fetch_chunk(&FileLocation::new("msg-1"), 1 << 20, 4096)
        .await
        .unwrap();
    assert!(chunk.is_empty());
}

#[tokio::test]
async fn test_fetch_chunk_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/msg-1"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = session(&server, None)
        .fetch_chunk(&FileLocation::new("msg-1"), 0, 4096)
        .await
        .unwrap_err();
    assert!(err.should_retry());
}

#[tokio::test]
async fn test_gateway_over_http_session() {
    use http_body_util::BodyExt;

    let server = MockServer::start().await;
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();

    Mock::given(method("HEAD"))
        .and(path("/files/msg-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    for offset in [0usize, 4096, 8192] {
        let end = (offset + 4096).min(data.len());
        Mock::given(method("GET"))
            .and(path("/files/msg-1"))
            .and(header("Range", format!("bytes={}-{}", offset, offset + 4095).as_str()))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(data[offset..end].to_vec()))
            .mount(&server)
            .await;
    }

    let config = GatewayConfig {
        chunk_size: 4096,
        ..GatewayConfig::default()
    };
    let pool = SessionPool::new(vec![Arc::new(session(&server, None)) as Arc<dyn BackendSession>]).unwrap();
    let catalog = Arc::new(FileCatalog::from_records(vec![record("msg-1", data.len() as u64)]));
    let gateway = StreamGateway::new(Arc::new(config), pool, catalog.clone(), catalog).unwrap();

    let response = gateway.serve("AgADBQ65f0", Some("bytes=4000-9000"), false).await;
    assert_eq!(response.status(), http::StatusCode::PARTIAL_CONTENT);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &data[4000..=9000]);
    assert_eq!(gateway.tracker().total(), 0);
}
