// HTTP response utilities for HTML fragments and JSON documents
use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};
use serde::Serialize;

pub fn html_response(html: String) -> Result<Response<Body>, StatusCode> {
    build("text/html; charset=utf-8", html.into_bytes())
}

pub fn json_response<T: Serialize>(value: &T) -> Result<Response<Body>, StatusCode> {
    let bytes = serde_json::to_vec(value).map_err(|e| {
        tracing::error!("JSON serialization error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    build("application/json", bytes)
}

fn build(content_type: &'static str, bytes: Vec<u8>) -> Result<Response<Body>, StatusCode> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
        // Rendered output follows the data files, which may change between requests
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| {
            tracing::error!("Response build error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
