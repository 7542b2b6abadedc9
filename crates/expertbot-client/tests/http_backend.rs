use expertbot_client::{ClientError, ExpertBackend, HttpBackend, QueryRequest, ResponseShape};
use expertbot_config::BackendConfig;
use mockito::{Matcher, Server};
use serde_json::json;

#[tokio::test]
async fn test_query_posts_body_and_parses_response() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/query")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"query": "leave rules", "selected_file": null})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": "Rule 12 covers leave."}"#)
        .create_async()
        .await;

    let backend = HttpBackend::with_base_url(server.url()).unwrap();
    let response = backend.query(&QueryRequest::new("leave rules")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        response.shape(),
        ResponseShape::Direct {
            response: "Rule 12 covers leave.".to_string()
        }
    );
}

#[tokio::test]
async fn test_selected_file_is_sent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/query")
        .match_body(Matcher::PartialJson(json!({"selected_file": "file-2"})))
        .with_status(200)
        .with_body(r#"{"enhanced_response": "From file 2"}"#)
        .create_async()
        .await;

    let backend = HttpBackend::with_base_url(server.url()).unwrap();
    let request = QueryRequest::new("leave rules").with_selected_file("file-2");
    let response = backend.query(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.selection_text().as_deref(), Some("From file 2"));
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/query")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let backend = HttpBackend::with_base_url(server.url()).unwrap();
    let err = backend.query(&QueryRequest::new("q")).await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/query")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let backend = HttpBackend::with_base_url(server.url()).unwrap();
    let err = backend.query(&QueryRequest::new("q")).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_probe_returns_echo() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/test")
        .with_status(200)
        .with_body(r#"{"received": {"query": "q", "selected_file": null}}"#)
        .create_async()
        .await;

    let backend = HttpBackend::with_base_url(server.url()).unwrap();
    let echo = backend.probe(&QueryRequest::new("q")).await.unwrap();
    assert_eq!(echo["received"]["query"], "q");
}

#[tokio::test]
async fn test_health_check() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body(r#"{"message": "ok"}"#)
        .create_async()
        .await;

    let backend = HttpBackend::with_base_url(server.url()).unwrap();
    assert!(backend.health_check().await);
}

#[tokio::test]
async fn test_unreachable_backend() {
    let backend = HttpBackend::with_base_url("http://127.0.0.1:1").unwrap();
    assert!(!backend.health_check().await);

    let err = backend.query(&QueryRequest::new("q")).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_) | ClientError::Timeout));
}

#[tokio::test]
async fn test_trailing_slash_is_trimmed() {
    let config = BackendConfig {
        base_url: "http://localhost:8002/".to_string(),
        ..BackendConfig::default()
    };
    let backend = HttpBackend::new(&config).unwrap();
    assert_eq!(backend.base_url(), "http://localhost:8002");
}
