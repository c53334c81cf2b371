// HTTP request handlers
use crate::infrastructure::html_page::{render_page, render_section};
use crate::infrastructure::http_response::{html_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Response, StatusCode},
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Page shell with navigation; sections load on demand
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Response<Body>, StatusCode> {
    html_response(render_page(&state.report_service.page()))
}

/// Rendered section as an HTML fragment
pub async fn section_fragment(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, StatusCode> {
    let section = state
        .report_service
        .render_section(&id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let html = render_section(&section).map_err(|e| {
        tracing::error!("Failed to render section {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    html_response(html)
}

/// Page header and navigation as JSON
pub async fn report_json(State(state): State<Arc<AppState>>) -> Result<Response<Body>, StatusCode> {
    json_response(&state.report_service.page())
}

/// Every section rendered eagerly, as JSON
pub async fn full_report_json(State(state): State<Arc<AppState>>) -> Result<Response<Body>, StatusCode> {
    json_response(&state.report_service.render_report().await)
}

/// Rendered section as JSON
pub async fn section_json(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, StatusCode> {
    let section = state
        .report_service
        .render_section(&id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    json_response(&section)
}
