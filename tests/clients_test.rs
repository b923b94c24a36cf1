mod common;

use std::time::Duration;

use batch_url_processor::clients::{BackendClient, DevToolsClient};
use batch_url_processor::error::ItemError;
use common::StubServer;

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_backend_health_and_duplicate_check() {
    let server = StubServer::spawn(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/health") => (200, r#"{"status":"ok"}"#.to_string()),
        ("POST", "/api/check-duplicate") if req.body.contains("https://x.com/a") => {
            (200, r#"{"isDuplicate": true}"#.to_string())
        }
        ("POST", "/api/check-duplicate") => (200, r#"{"isDuplicate": false}"#.to_string()),
        _ => (404, "{}".to_string()),
    })
    .await;

    let client = BackendClient::new(format!("{}/", server.base_url), TIMEOUT).unwrap();
    assert_eq!(client.base_url(), server.base_url);

    client.health().await.unwrap();
    assert!(client.is_duplicate("https://x.com/a").await.unwrap());
    assert!(!client.is_duplicate("https://x.com/b").await.unwrap());

    let requests = server.requests();
    let check = requests
        .iter()
        .find(|r| r.path == "/api/check-duplicate")
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&check.body).unwrap();
    assert_eq!(body["url"], "https://x.com/a");
}

#[tokio::test]
async fn test_backend_missing_flag_means_not_duplicate() {
    let server = StubServer::spawn(|_| (200, "{}".to_string())).await;
    let client = BackendClient::new(&server.base_url, TIMEOUT).unwrap();
    assert!(!client.is_duplicate("https://x.com/a").await.unwrap());
}

#[tokio::test]
async fn test_backend_error_status_is_reported() {
    let server = StubServer::spawn(|_| (500, r#"{"error":"boom"}"#.to_string())).await;
    let client = BackendClient::new(&server.base_url, TIMEOUT).unwrap();

    assert!(client.health().await.is_err());
    assert!(matches!(
        client.is_duplicate("https://x.com/a").await,
        Err(ItemError::Backend { .. })
    ));
}

#[tokio::test]
async fn test_devtools_tab_lifecycle() {
    let server = StubServer::spawn(|req| {
        if req.path == "/json" {
            (
                200,
                r#"[{"id":"T1","url":"about:blank","type":"page"}]"#.to_string(),
            )
        } else if req.path.starts_with("/json/new?") {
            (
                200,
                r#"{"id":"T2","url":"https://x.com/a","type":"page"}"#.to_string(),
            )
        } else if req.path.starts_with("/json/close/") {
            (200, "Target is closing".to_string())
        } else {
            (404, "{}".to_string())
        }
    })
    .await;

    let client = DevToolsClient::new(&server.base_url, TIMEOUT).unwrap();

    let tabs = client.list_tabs().await.unwrap();
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].kind, "page");

    let tab = client.open_tab("https://x.com/a").await.unwrap();
    assert_eq!(tab.id, "T2");
    client.close_tab(&tab.id).await.unwrap();

    let requests = server.requests();
    assert!(requests
        .iter()
        .any(|r| r.method == "POST" && r.path == "/json/new?https%3A%2F%2Fx.com%2Fa"));
    assert!(requests
        .iter()
        .any(|r| r.method == "POST" && r.path == "/json/close/T2"));
}

#[tokio::test]
async fn test_devtools_unreachable_is_control_error() {
    let client = DevToolsClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    assert!(matches!(
        client.list_tabs().await,
        Err(ItemError::Control { .. })
    ));
}

#[tokio::test]
async fn test_devtools_open_tab_keeps_query_and_fragment() {
    let server = StubServer::spawn(|_| (200, r#"{"id":"T9","type":"page"}"#.to_string())).await;
    let client = DevToolsClient::new(&server.base_url, TIMEOUT).unwrap();

    let target = "https://x.com/agent/1?page=2&sort=desc#reviews";
    client.open_tab(target).await.unwrap();

    let requests = server.requests();
    let query = requests[0].path.strip_prefix("/json/new?").unwrap();
    assert!(!query.contains('#'));
    assert_eq!(urlencoding::decode(query).unwrap(), target);
}
