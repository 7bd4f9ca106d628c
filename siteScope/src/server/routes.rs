//! axum routes for the browser UI.
//!
//! Every route turns its query string into an [`Action`] and runs it on the
//! blocking pool, since filtering and PDF assembly are CPU-bound.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::app_config::AppConfig;
use crate::data::dataset_loader::GeoDatasets;
use crate::error::ReportError;
use crate::server::handlers::{Action, ActionKind, ActionOutput, CoordinateInput, RequestHandler};
use crate::server::pages::{error_page, index_page, report_page};

/// Shared state backing HTTP handlers.
pub struct AppState {
    pub handler: RequestHandler,
    pub default_center: (f64, f64),
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(datasets: Arc<GeoDatasets>, config: &AppConfig) -> Self {
        Self {
            handler: RequestHandler::new(datasets, config),
            default_center: (config.default_latitude, config.default_longitude),
            startup_time: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub buildings: usize,
    pub roads: usize,
    pub pois: usize,
    pub uptime_seconds: u64,
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = match &self {
            ReportError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self {
            ReportError::InvalidInput { .. } => "Invalid latitude or longitude!".to_string(),
            other => other.to_string(),
        };
        (status, Html(error_page(&message).into_string())).into_response()
    }
}

impl IntoResponse for ActionOutput {
    fn into_response(self) -> Response {
        match self {
            ActionOutput::Map(document) => Html(document.html).into_response(),
            ActionOutput::Panel(panel) => Html(report_page(&panel).into_string()).into_response(),
            ActionOutput::Download(file) => (
                [
                    (header::CONTENT_TYPE, file.content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file.file_name),
                    ),
                ],
                file.bytes,
            )
                .into_response(),
        }
    }
}

async fn run_action(
    state: Arc<AppState>,
    kind: ActionKind,
    input: CoordinateInput,
) -> Result<ActionOutput, ReportError> {
    let action = Action::parse(kind, &input)?;
    tokio::task::spawn_blocking(move || state.handler.handle(action))
        .await
        .map_err(|e| ReportError::Render(format!("request worker failed: {}", e)))?
}

async fn index_route(State(state): State<Arc<AppState>>) -> Html<String> {
    let (lat, lon) = state.default_center;
    Html(index_page(lat, lon).into_string())
}

async fn map_route(
    State(state): State<Arc<AppState>>,
    Query(input): Query<CoordinateInput>,
) -> Result<ActionOutput, ReportError> {
    run_action(state, ActionKind::RenderMap, input).await
}

async fn report_route(
    State(state): State<Arc<AppState>>,
    Query(input): Query<CoordinateInput>,
) -> Result<ActionOutput, ReportError> {
    run_action(state, ActionKind::GenerateReport, input).await
}

async fn pdf_route(
    State(state): State<Arc<AppState>>,
    Query(input): Query<CoordinateInput>,
) -> Result<ActionOutput, ReportError> {
    run_action(state, ActionKind::DownloadReport, input).await
}

async fn pois_csv_route(
    State(state): State<Arc<AppState>>,
    Query(input): Query<CoordinateInput>,
) -> Result<ActionOutput, ReportError> {
    run_action(state, ActionKind::ExportPois, input).await
}

async fn health_route(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let datasets = state.handler.datasets();
    Json(HealthResponse {
        status: "ok",
        buildings: datasets.buildings.len(),
        roads: datasets.roads.len(),
        pois: datasets.pois.len(),
        uptime_seconds: state.startup_time.elapsed().as_secs(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_route))
        .route("/map", get(map_route))
        .route("/report", get(report_route))
        .route("/report.pdf", get(pdf_route))
        .route("/pois.csv", get(pois_csv_route))
        .route("/health", get(health_route))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutdown signal received");
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: &AppConfig, datasets: Arc<GeoDatasets>) -> Result<()> {
    let state = Arc::new(AppState::new(datasets, config));
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Serving site reports");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
