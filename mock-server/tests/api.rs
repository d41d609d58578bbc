use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, DOWNLOAD_BODY, XML_BODY};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_method_query_and_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/echo?a=1&b=two")
                .header("x-trace", "abc")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["method"], "PATCH");
    assert_eq!(body["path"], "/echo");
    assert_eq!(body["query"], "a=1&b=two");
    assert_eq!(body["headers"]["x-trace"], "abc");
    assert_eq!(body["body"], "payload");
}

#[tokio::test]
async fn echo_without_query() {
    let resp = app().oneshot(get("/echo")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["method"], "GET");
    assert_eq!(body["query"], "");
    assert_eq!(body["body"], "");
}

// --- fixtures ---

#[tokio::test]
async fn json_fixture() {
    let resp = app().oneshot(get("/json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["nested"]["list"][1], "b");
}

#[tokio::test]
async fn xml_fixture_sets_content_type() {
    let resp = app().oneshot(get("/xml")).await.unwrap();
    let content_type = resp.headers()[http::header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/xml"));
    assert_eq!(body_bytes(resp).await, XML_BODY.as_bytes());
}

#[tokio::test]
async fn download_sets_disposition() {
    let resp = app().oneshot(get("/download")).await.unwrap();
    let disposition = resp.headers()[http::header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"report.txt\"");
    assert_eq!(body_bytes(resp).await, DOWNLOAD_BODY.as_bytes());
}

// --- form ---

#[tokio::test]
async fn form_echoes_urlencoded_fields() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/form")
                .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body("name=n&tags%5B0%5D=x".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["name"], "n");
    assert_eq!(body["tags[0]"], "x");
}

#[tokio::test]
async fn form_rejects_wrong_content_type() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/form")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body("{}".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

// --- upload ---

#[tokio::test]
async fn upload_splits_fields_and_files() {
    let body = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"title\"\r\n\r\n\
        hello\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n\
        abc\r\n\
        --XyZ--\r\n";
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=XyZ")
                .body(body.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["fields"]["title"], "hello");
    assert_eq!(body["files"]["doc"]["filename"], "a.txt");
    assert_eq!(body["files"]["doc"]["size"], 3);
    assert_eq!(body["files"]["doc"]["contents"], "abc");
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/404")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn status_accepts_any_method() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/status/503")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn bytes_returns_requested_length() {
    let resp = app().oneshot(get("/bytes/5")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, &b"xxxxx"[..]);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app().oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
