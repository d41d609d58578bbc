use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Multipart, Path},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, get, post},
    Form, Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

pub const XML_BODY: &str = "<xml><ToUserName><![CDATA[toUser]]></ToUserName><Count>2</Count></xml>";
pub const DOWNLOAD_BODY: &str = "quarterly numbers\n";

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/json", get(json_fixture))
        .route("/xml", get(xml_fixture))
        .route("/text", get(text_fixture))
        .route("/form", post(form))
        .route("/upload", post(upload))
        .route("/download", get(download))
        .route("/status/{code}", any(status))
        .route("/bytes/{size}", get(bytes))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Reflects the request back as JSON.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query().unwrap_or_default(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn json_fixture() -> Json<Value> {
    Json(json!({
        "name": "httpkit",
        "nested": {"value": 1, "list": ["a", "b"]},
    }))
}

async fn xml_fixture() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], XML_BODY)
}

async fn text_fixture() -> &'static str {
    "plain text, not json"
}

async fn form(Form(fields): Form<BTreeMap<String, String>>) -> Json<BTreeMap<String, String>> {
    Json(fields)
}

async fn upload(mut multipart: Multipart) -> Result<Json<Value>, StatusCode> {
    let mut fields = Map::new();
    let mut files = Map::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        let text = String::from_utf8_lossy(&data).into_owned();
        match filename {
            Some(filename) => {
                files.insert(
                    name,
                    json!({"filename": filename, "size": data.len(), "contents": text}),
                );
            }
            None => {
                fields.insert(name, Value::String(text));
            }
        }
    }
    Ok(Json(json!({"fields": fields, "files": files})))
}

async fn download() -> ([(header::HeaderName, &'static str); 2], &'static str) {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"report.txt\""),
        ],
        DOWNLOAD_BODY,
    )
}

/// `size` bytes of `x`.
async fn bytes(Path(size): Path<usize>) -> Vec<u8> {
    vec![b'x'; size]
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(json!({"status": code}))))
}
