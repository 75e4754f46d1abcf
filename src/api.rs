use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::{OpenApi, ToSchema};

use crate::db::{
    ChartPoint, ChartSeries, DailySummary, DashboardCharts, DashboardSnapshot, RawObservation,
};
use crate::services::dashboard_service::{
    self, ArchitectureEdge, ArchitectureNode, ArchitectureView, FlowStep,
};
use crate::services::DashboardService;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_dashboard,
        get_raw_weather,
        get_daily_summary,
        get_charts,
        get_architecture
    ),
    components(schemas(
        HealthResponse,
        RawObservation,
        DailySummary,
        DashboardSnapshot,
        ChartPoint,
        ChartSeries,
        DashboardCharts,
        ArchitectureNode,
        ArchitectureEdge,
        FlowStep,
        ArchitectureView
    )),
    tags((name = "dashboard", description = "Read-only weather pipeline monitoring"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(get_dashboard))
        .route("/raw-weather", get(get_raw_weather))
        .route("/daily-summary", get(get_daily_summary))
        .route("/charts", get(get_charts))
        .route("/architecture", get(get_architecture))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "dashboard",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// Latest rows of both tables plus the error banner from the last failed poll.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "dashboard",
    responses((status = 200, description = "Current dashboard snapshot", body = DashboardSnapshot))
)]
#[instrument(skip(state))]
async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    let snapshot = state.dashboard_service.snapshot().await;
    if let Some(error) = &snapshot.error {
        warn!("Serving dashboard with database error banner: {}", error);
    }
    info!(
        "Serving dashboard with {} raw rows, {} summary rows",
        snapshot.raw_weather.len(),
        snapshot.daily_summary.len()
    );
    Json(snapshot)
}

#[utoipa::path(
    get,
    path = "/api/v1/raw-weather",
    tag = "dashboard",
    responses((status = 200, description = "raw_weather rows ordered by city and date", body = [RawObservation]))
)]
#[instrument(skip(state))]
async fn get_raw_weather(State(state): State<AppState>) -> Json<Vec<RawObservation>> {
    let rows = state.dashboard_service.raw_weather().await;
    debug!("Serving {} raw_weather rows", rows.len());
    Json(rows)
}

#[utoipa::path(
    get,
    path = "/api/v1/daily-summary",
    tag = "dashboard",
    responses((status = 200, description = "daily_summary rows ordered by city and date", body = [DailySummary]))
)]
#[instrument(skip(state))]
async fn get_daily_summary(State(state): State<AppState>) -> Json<Vec<DailySummary>> {
    let rows = state.dashboard_service.daily_summary().await;
    debug!("Serving {} daily_summary rows", rows.len());
    Json(rows)
}

#[utoipa::path(
    get,
    path = "/api/v1/charts",
    tag = "dashboard",
    responses((status = 200, description = "Per-city metric series", body = DashboardCharts))
)]
#[instrument(skip(state))]
async fn get_charts(State(state): State<AppState>) -> Json<DashboardCharts> {
    Json(state.dashboard_service.charts().await)
}

#[utoipa::path(
    get,
    path = "/api/v1/architecture",
    tag = "dashboard",
    responses((status = 200, description = "Static pipeline diagram", body = ArchitectureView))
)]
#[instrument]
async fn get_architecture() -> Json<ArchitectureView> {
    Json(dashboard_service::architecture())
}
