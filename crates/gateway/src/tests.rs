//! Router tests against the in-memory store and a scripted completion

use crate::{create_router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use lumina_common::completion::ScriptedCompletion;
use lumina_common::config::AppConfig;
use lumina_common::context::NO_MATCH_ANSWER;
use lumina_common::store::InMemoryStore;
use lumina_ingestion::pdf::fixtures::pdf_with_pages;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "lumina-test-boundary";

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    provider: Arc<ScriptedCompletion>,
}

fn app_with(provider: ScriptedCompletion) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(provider);
    let state = AppState::new(AppConfig::default(), store.clone(), provider.clone(), None).unwrap();
    TestApp {
        router: create_router(state),
        store,
        provider,
    }
}

fn app() -> TestApp {
    app_with(ScriptedCompletion::replying("Employees get 25 days of annual leave."))
}

/// One multipart part: field name, optional filename, content
type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn handbook_pdf() -> Vec<u8> {
    pdf_with_pages(&[
        Some("Annual leave is 25 days per calendar year."),
        None,
        Some("Remote work requires written manager approval."),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let app = app();
    let request = multipart_request("/upload", &[("comment", None, &b"hello"[..])]);

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, serde_json::json!({"message": "No file part"}));
}

#[tokio::test]
async fn test_upload_that_is_not_multipart() {
    let app = app();
    let request = Request::post("/upload").body(Body::empty()).unwrap();

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file part");
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let app = app();
    let request = multipart_request("/upload", &[("file", Some(""), &b""[..])]);

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, serde_json::json!({"message": "No selected file"}));
}

#[tokio::test]
async fn test_upload_stores_chunks() {
    let app = app();
    let pdf = handbook_pdf();
    let request = multipart_request("/upload", &[("file", Some("handbook.pdf"), pdf.as_slice())]);

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({"message": "PDF processed and data stored successfully."})
    );

    let records = app.store.records("HR_doc").await;
    assert!(!records.is_empty());
    assert!(records.iter().any(|r| r.body.contains("Annual leave is 25 days")));
}

#[tokio::test]
async fn test_upload_of_unreadable_document() {
    let app = app();
    let request = multipart_request("/upload", &[("file", Some("notes.pdf"), &b"plain text"[..])]);

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Document unreadable"));
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_upload_when_store_rejects_writes() {
    let app = app();
    app.store.set_fail_writes(true);
    let pdf = handbook_pdf();
    let request = multipart_request("/upload", &[("file", Some("handbook.pdf"), pdf.as_slice())]);

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Store write failed"));
}

#[tokio::test]
async fn test_chat_against_empty_collection() {
    let app = app();
    let request = json_request("/chat", serde_json::json!({"query": "How many vacation days?"}));

    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"response": NO_MATCH_ANSWER}));
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn test_chat_without_query_field() {
    let app = app();
    let (status, body) = send_json(&app.router, json_request("/chat", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], NO_MATCH_ANSWER);
}

#[tokio::test]
async fn test_chat_answers_from_uploaded_document() {
    let app = app();
    let pdf = handbook_pdf();
    let (status, _) = send(
        &app.router,
        multipart_request("/upload", &[("file", Some("handbook.pdf"), pdf.as_slice())]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let request = json_request("/chat", serde_json::json!({"query": "annual leave"}));
    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Employees get 25 days of annual leave.");

    let calls = app.provider.calls();
    assert_eq!(calls.len(), 1);
    let prompt = &calls[0][1].content;
    assert!(prompt.starts_with("Context: "));
    assert!(prompt.contains("Annual leave is 25 days per calendar year."));
    assert!(prompt.ends_with("\n\nQuestion: annual leave"));
}

#[tokio::test]
async fn test_chat_when_completion_fails() {
    let app = app_with(ScriptedCompletion::failing("upstream quota exceeded"));
    let pdf = handbook_pdf();
    send(
        &app.router,
        multipart_request("/upload", &[("file", Some("handbook.pdf"), pdf.as_slice())]),
    )
    .await;

    let request = json_request("/chat", serde_json::json!({"query": "annual leave"}));
    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("upstream quota exceeded"));
}

#[tokio::test]
async fn test_chat_answers_long_query() {
    let app = app();
    let pdf = handbook_pdf();
    send(
        &app.router,
        multipart_request("/upload", &[("file", Some("handbook.pdf"), pdf.as_slice())]),
    )
    .await;

    let query = "vacation ".repeat(600);
    let (status, body) =
        send_json(&app.router, json_request("/chat", serde_json::json!({"query": query}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].is_string());
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_chat_with_unparseable_body() {
    let app = app();

    let untyped = Request::post("/chat").body(Body::from("query=hi")).unwrap();
    let (status, body) = send_json(&app.router, untyped).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(body.get("message").is_none());

    let malformed = Request::post("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"query\": "))
        .unwrap();
    let (status, body) = send_json(&app.router, malformed).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_chat_times_out_with_error_body() {
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 5;
    let provider = ScriptedCompletion::replying("too late").with_delay(Duration::from_secs(60));
    let state = AppState::new(config, Arc::new(InMemoryStore::new()), Arc::new(provider), None).unwrap();
    state
        .ingestion
        .ingest_text("handbook", "Annual leave is 25 days per calendar year.")
        .await
        .unwrap();
    let router = create_router(state);

    let request = json_request("/chat", serde_json::json!({"query": "annual leave"}));
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body, serde_json::json!({"error": "Request timed out"}));
}

#[tokio::test]
async fn test_end_chat_without_collection() {
    let app = app();
    let (status, body) = send_json(&app.router, Request::post("/end_chat").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        serde_json::json!({"message": "Collection 'HR_doc' does not exist."})
    );
}

#[tokio::test]
async fn test_end_chat_then_upload_again() {
    let app = app();
    let pdf = handbook_pdf();
    send(
        &app.router,
        multipart_request("/upload", &[("file", Some("handbook.pdf"), pdf.as_slice())]),
    )
    .await;

    let end_chat = || Request::post("/end_chat").body(Body::empty()).unwrap();
    let (status, body) = send_json(&app.router, end_chat()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Collection 'HR_doc' deleted successfully.");
    assert!(app.store.records("HR_doc").await.is_empty());

    let (status, _) = send_json(&app.router, end_chat()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        multipart_request("/upload", &[("file", Some("handbook.pdf"), pdf.as_slice())]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.store.records("HR_doc").await.is_empty());
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();
    let (status, body) = send_json(&app.router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send_json(&app.router, Request::get("/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["vector_store"]["status"], "up");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = app();
    let (status, _) = send(&app.router, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_form_chat_round_trips_history() {
    let app = app();
    let (status, body) = send(&app.router, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("Lumina: Your HR Policy Assistant"));

    let (status, body) = send(
        &app.router,
        form_request("/ui/chat", "query=Is+%3Covertime%3E+paid%3F&history="),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Is &lt;overtime&gt; paid?"));
    assert!(html.contains(NO_MATCH_ANSWER.replace('\'', "&#39;").as_str()));
    assert!(html.contains("&quot;question&quot;"));
}

#[tokio::test]
async fn test_form_upload_and_end_chat() {
    let app = app();
    let pdf = handbook_pdf();
    let request = multipart_request(
        "/ui/upload",
        &[("history", None, &b"[]"[..]), ("file", Some("handbook.pdf"), pdf.as_slice())],
    );
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body)
        .unwrap()
        .contains("PDF processed and data stored successfully."));

    let (status, body) = send(&app.router, form_request("/ui/end_chat", "history=")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body)
        .unwrap()
        .contains("Collection &#39;HR_doc&#39; deleted successfully."));

    let (status, body) = send(&app.router, form_request("/ui/end_chat", "history=")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8(body)
        .unwrap()
        .contains("Collection &#39;HR_doc&#39; does not exist."));
}
