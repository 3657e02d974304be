//! HTTP API: health probes, Prometheus scrape, report and policy listing

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use placement_engine::{ComponentStatus, EngineError, ErrorClass, HealthRegistry, PlacementEngine};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PlacementEngine>,
    pub health_registry: HealthRegistry,
    pub report_period: Duration,
}

impl AppState {
    pub fn new(engine: Arc<PlacementEngine>, health_registry: HealthRegistry, report_period: Duration) -> Self {
        Self {
            engine,
            health_registry,
            report_period,
        }
    }
}

/// 200 while operational (degraded included), 503 when unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.report(state.report_period))
}

async fn list_policies(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.list_policies())
}

async fn get_policy(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.engine.get_policy(&name) {
        Ok(policy) => Json(policy).into_response(),
        Err(e) => error_response(&e),
    }
}

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(e: &EngineError) -> Response {
    (status_for(e.class()), Json(json!({ "error": e.to_string() }))).into_response()
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/report", get(report))
        .route("/policies", get(list_policies))
        .route("/policies/:name", get(get_policy))
        .with_state(state)
}

pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
