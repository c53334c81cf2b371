// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::report_service::ReportService;
use crate::application::section_composer::SectionComposer;
use crate::infrastructure::config::{load_report_config, load_server_config};
use crate::infrastructure::csv_repository::CsvDatasetRepository;
use crate::infrastructure::geojson_repository::GeoJsonRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    full_report_json, health_check, index, report_json, section_fragment, section_json,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration; an invalid report stops startup
    let server_config = load_server_config()?;
    let report = Arc::new(load_report_config()?);
    tracing::info!(
        "Loaded report \"{}\" with {} sections and {} panels",
        report.title,
        report.sections.len(),
        report.panel_count()
    );

    // Create repositories (infrastructure layer)
    let datasets = Arc::new(CsvDatasetRepository::new(
        server_config.data.root.clone(),
        server_config.data.extension.clone(),
    ));
    let geometry = Arc::new(GeoJsonRepository::new(Duration::from_secs(
        server_config.geo.timeout_secs,
    ))?);

    // Create services (application layer)
    let composer = SectionComposer::new(datasets, geometry);
    let report_service = ReportService::new(report, composer);

    // Create application state
    let state = Arc::new(AppState { report_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/", get(index))
        .route("/healthz", get(health_check))
        .route("/sections/:id", get(section_fragment))
        .route("/api/report", get(report_json))
        .route("/api/report/full", get(full_report_json))
        .route("/api/sections/:id", get(section_json))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = server_config.server.bind.parse()?;
    tracing::info!(
        "Starting insights dashboard on {} (data root {})",
        addr,
        server_config.data.root.display()
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
