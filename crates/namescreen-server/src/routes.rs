//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use namescreen_core::DetectionResult;
use namescreen_detectors::{PipelineHealth, PipelineStats};
use namescreen_telemetry::RequestRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/detect-name", post(detect_name))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics))
        .route("/sanctions/reload", post(reload_sanctions))
        .route("/config/reload", post(reload_config))
        .fallback(fallback)
        .with_state(state)
}

/// Detection request body
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectRequest {
    pub comment: String,
}

async fn detect_name(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectionResult>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let detection = state.pipeline.detect_traced(&request.comment).await;
    debug!(
        tier = %detection.result.tier_used,
        cached = detection.cached,
        latency_us = detection.latency_us,
        "Request answered"
    );

    if let Some(log) = &state.request_log {
        log.record(&RequestRecord::new(
            request.comment,
            detection.result.clone(),
            detection.cached,
            detection.latency_us,
        ));
    }

    Ok(Json(detection.result))
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub components: PipelineHealth,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        components: state.pipeline.health(),
    })
}

async fn stats(State(state): State<AppState>) -> Json<PipelineStats> {
    Json(state.pipeline.stats())
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics_handle.render(),
    )
}

async fn reload_sanctions(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let path = state
        .config
        .sanctions_path
        .as_ref()
        .ok_or_else(|| AppError::InvalidRequest("No sanctions list configured".to_string()))?;

    // Parsing is blocking file IO
    let registry = state.pipeline.sanctions().clone();
    let path = path.clone();
    let records = tokio::task::spawn_blocking(move || registry.reload_from(&path))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .map_err(|e| {
            error!("Sanctions reload failed: {}", e);
            AppError::Unavailable(e.to_string())
        })?;

    Ok(Json(json!({ "records": records })))
}

async fn reload_config(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let config = ServerConfig::load(state.config_path.as_deref())
        .map_err(|e| AppError::InvalidRequest(format!("{:#}", e)))?;

    state
        .pipeline
        .reload_config(config.pipeline.clone())
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    info!("Pipeline configuration reloaded over HTTP");
    Ok(Json(json!({ "pipeline": config.pipeline })))
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    Unavailable(String),
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request_error", msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            AppError::InternalError(msg) => {
                warn!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
