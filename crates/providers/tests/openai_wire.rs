//! Integration tests for the OpenAI-compatible backend over real HTTP.
//!
//! Each test starts a one-shot HTTP server on localhost that records the
//! request and replies with a canned body, so the full request building,
//! SSE parsing and error mapping path runs without any external service.

use futures_util::StreamExt;
use pl_domain::config::LlmConfig;
use pl_domain::error::Error;
use pl_providers::traits::{EmbeddingBackend, GenerationBackend};
use pl_providers::OpenAiCompatBackend;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// One-shot server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Serve one response; the handle resolves to the raw request text.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let request = read_request(&mut sock).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
        request
    });
    (format!("http://{addr}/v1"), handle)
}

async fn read_request(sock: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        let n = sock.read(&mut tmp).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    if key.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= pos + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn backend_for(base_url: String) -> OpenAiCompatBackend {
    let cfg = LlmConfig {
        base_url,
        api_key_env: "PARLEY_WIRE_TEST_NO_KEY".into(),
        timeout_ms: 5_000,
        ..LlmConfig::default()
    };
    OpenAiCompatBackend::from_config(&cfg).unwrap()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn chat_stream_yields_deltas_until_done() {
    let body = [
        r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
        "data: [DONE]",
        r#"data: {"choices":[{"delta":{"content":"ignored"}}]}"#,
    ]
    .join("\n\n");
    let (url, server) = serve_once("200 OK", "text/event-stream", body).await;
    let backend = backend_for(url);

    let history = vec![("q1".to_string(), "r1".to_string())];
    let stream = backend.chat_stream("q2", &history).await.unwrap();
    let items: Vec<String> = stream.map(|i| i.unwrap()).collect().await;
    assert_eq!(items, vec!["Hel", "lo"]);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.contains(r#""stream":true"#));
    assert!(request.contains(r#""content":"r1""#));
    assert!(!request.to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn chat_stream_error_event_is_backend_failure() {
    let body = [
        r#"data: {"choices":[{"delta":{"content":"par"}}]}"#,
        r#"data: {"error":{"message":"model overloaded"}}"#,
    ]
    .join("\n\n");
    let (url, _server) = serve_once("200 OK", "text/event-stream", body).await;
    let backend = backend_for(url);

    let items: Vec<_> = backend.chat_stream("q", &[]).await.unwrap().collect().await;
    assert_eq!(items[0].as_ref().unwrap(), "par");
    assert!(matches!(items[1], Err(Error::BackendUnavailable { .. })));
}

#[tokio::test]
async fn chat_returns_message_and_extended_history() {
    let body = r#"{"choices":[{"message":{"role":"assistant","content":"Paris."}}]}"#.to_string();
    let (url, server) = serve_once("200 OK", "application/json", body).await;
    let backend = backend_for(url);

    let reply = backend.chat("capital of France?", &[]).await.unwrap();
    assert_eq!(reply.response, "Paris.");
    assert_eq!(
        reply.history,
        vec![("capital of France?".to_string(), "Paris.".to_string())]
    );

    let request = server.await.unwrap();
    assert!(request.contains(r#""stream":false"#));
}

#[tokio::test]
async fn http_error_status_is_backend_unavailable() {
    let (url, _server) =
        serve_once("503 Service Unavailable", "text/plain", "overloaded".into()).await;
    let backend = backend_for(url);

    let err = backend.chat("q", &[]).await.unwrap_err();
    match err {
        Error::BackendUnavailable { message, .. } => {
            assert!(message.contains("503"));
            assert!(message.contains("overloaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = backend_for(format!("http://{addr}/v1"));
    let err = backend.chat_stream("q", &[]).await.err().unwrap();
    assert!(matches!(err, Error::Http(_)));
    assert!(err.is_backend());
}

#[tokio::test]
async fn bearer_auth_sent_when_key_present() {
    std::env::set_var("PARLEY_WIRE_TEST_KEY", "sk-test-123");
    let body = r#"{"choices":[{"message":{"content":"ok"}}]}"#.to_string();
    let (url, server) = serve_once("200 OK", "application/json", body).await;
    let cfg = LlmConfig {
        base_url: url,
        api_key_env: "PARLEY_WIRE_TEST_KEY".into(),
        ..LlmConfig::default()
    };
    let backend = OpenAiCompatBackend::from_config(&cfg).unwrap();
    backend.chat("q", &[]).await.unwrap();

    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(request.contains("authorization: bearer sk-test-123"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Embeddings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn embed_posts_model_and_parses_vector() {
    let body = r#"{"data":[{"embedding":[0.25,-0.5,1.0]}]}"#.to_string();
    let (url, server) = serve_once("200 OK", "application/json", body).await;
    let backend = backend_for(url);

    assert_eq!(backend.embed("hello").await.unwrap(), vec![0.25, -0.5, 1.0]);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/embeddings"));
    assert!(request.contains(r#""model":"nomic-embed-text""#));
    assert!(request.contains(r#""input":"hello""#));
}
