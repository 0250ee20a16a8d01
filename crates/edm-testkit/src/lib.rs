//! In-process HTTP helpers for router scenario tests.
//!
//! Requests are driven through `tower::ServiceExt::oneshot`, so no socket
//! is bound. Helpers panic on transport failures: they only run in tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt; // oneshot

/// Sends one request and returns the status and the collected body.
pub async fn call(router: Router, req: Request<Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

pub fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

/// [`call`] followed by [`parse_json`].
pub async fn call_json(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = call(router, req).await;
    (status, parse_json(body))
}

fn builder(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let b = Request::builder().method(method).uri(uri);
    match token {
        Some(t) => b.header(header::AUTHORIZATION, format!("Bearer {t}")),
        None => b,
    }
}

/// Bodyless request, optionally carrying a bearer token.
pub fn empty(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token)
        .body(Body::empty())
        .expect("request builds")
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    empty("GET", uri, token)
}

/// JSON-bodied request, optionally carrying a bearer token.
pub fn json(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}
