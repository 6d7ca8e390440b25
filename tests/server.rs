mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::{offline_service, pdf_upload, text_upload};
use serde_json::{json, Value};
use tempfile::TempDir;

async fn start_server(tmp: &TempDir) -> SocketAddr {
    let service = Arc::new(offline_service(tmp.path()).await);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        docqa::server::serve(listener, service).await.unwrap();
    });
    wait_for_server(addr).await;
    addr
}

async fn wait_for_server(addr: SocketAddr) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not start on {}", addr);
}

async fn post(addr: SocketAddr, path: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}{}", addr, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_index_readiness() {
    let tmp = TempDir::new().unwrap();
    let addr = start_server(&tmp).await;

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["index_ready"], false);
}

#[tokio::test]
async fn query_before_upload_is_conflict() {
    let tmp = TempDir::new().unwrap();
    let addr = start_server(&tmp).await;

    let (status, body) = post(addr, "/api/query", json!({ "text": "hello?" })).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "no_index");
    assert_eq!(
        body["error"]["message"],
        "index has not been constructed yet."
    );
}

#[tokio::test]
async fn upload_then_query_round_trip() {
    let tmp = TempDir::new().unwrap();
    let addr = start_server(&tmp).await;

    let files = vec![
        text_upload("a.txt", "hello"),
        pdf_upload("launch.pdf", &["The launch window opens at dawn"]),
    ];
    let (status, body) = post(addr, "/api/upload", json!({ "files": files })).await;
    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 2);
    assert_eq!(body["derived_texts"], 1);
    assert!(body["build_id"].is_string());

    let (status, body) = post(
        addr,
        "/api/query",
        json!({ "text": "when does the launch window open?" }),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["answer"].as_str().unwrap().contains("dawn"));
}

#[tokio::test]
async fn malformed_upload_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let addr = start_server(&tmp).await;

    let (status, body) = post(
        addr,
        "/api/upload",
        json!({ "files": [{ "name": "a.txt", "content": "aGVsbG8=" }] }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "decode_failure");

    let (status, _) = post(addr, "/api/query", json!({ "text": "hello?" })).await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let tmp = TempDir::new().unwrap();
    let addr = start_server(&tmp).await;

    let (status, body) = post(addr, "/api/upload", json!({ "files": "a.txt" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "decode_failure");

    let (status, body) = post(addr, "/api/query", json!({ "question": "hello?" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "decode_failure");
    assert!(body["error"]["message"].is_string());

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/query", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "decode_failure");
}
