use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Query,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

pub const USERNAME: &str = "aloha";
pub const PASSWORD: &str = "123123123";

/// What the server saw, returned by `/echo`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub user_agent: Option<String>,
    pub cookie: Option<String>,
    pub body: String,
}

#[derive(Deserialize)]
pub struct LargeParams {
    #[serde(default)]
    pub bytes: usize,
}

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default)]
    pub ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/xml", any(xml))
        .route("/broken", get(broken))
        .route("/plain", get(plain))
        .route("/cookies/set", get(set_cookies))
        .route("/protected", get(protected))
        .route("/slow", get(slow))
        .route("/large", get(large))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    debug!(%method, %uri, "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: header_str(&headers, header::CONTENT_TYPE),
        accept: header_str(&headers, header::ACCEPT),
        user_agent: header_str(&headers, header::USER_AGENT),
        cookie: header_str(&headers, header::COOKIE),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Wraps the request body in a `<received>` document so XML round-trips
/// can be checked from the client side.
async fn xml(method: Method, body: Bytes) -> impl IntoResponse {
    debug!(%method, "xml");
    let received = String::from_utf8_lossy(&body);
    let inner = received
        .trim()
        .strip_prefix(r#"<?xml version="1.0" encoding="UTF-8"?>"#)
        .unwrap_or(received.trim())
        .to_string();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><received method="{method}">{inner}</received>"#
    );
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        document,
    )
}

async fn broken() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{\"unterminated\": ")
}

async fn plain() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "hello")
}

/// Every query pair becomes a `Set-Cookie` header.
async fn set_cookies(Query(pairs): Query<Vec<(String, String)>>) -> Response {
    debug!(count = pairs.len(), "setting cookies");
    let cookies: Vec<_> = pairs
        .into_iter()
        .map(|(name, value)| (header::SET_COOKIE, format!("{name}={value}; Path=/")))
        .collect();
    (AppendHeaders(cookies), Json(serde_json::json!({}))).into_response()
}

async fn protected(headers: HeaderMap) -> Response {
    let expected = format!("Basic {}", STANDARD.encode(format!("{USERNAME}:{PASSWORD}")));
    match header_str(&headers, header::AUTHORIZATION) {
        Some(value) if value == expected => {
            Json(serde_json::json!({ "user": USERNAME })).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response(),
    }
}

async fn slow(Query(params): Query<SlowParams>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(serde_json::json!({ "slept_ms": params.ms }))
}

/// A JSON string of `bytes` characters, quotes not counted.
async fn large(Query(params): Query<LargeParams>) -> impl IntoResponse {
    debug!(bytes = params.bytes, "large");
    let body = format!("\"{}\"", "x".repeat(params.bytes));
    ([(header::CONTENT_TYPE, "application/json")], body)
}
