//! Health check and status endpoints.

use axum::{extract::State, Json};

use crate::rest::dto::{HealthResponse, StatusResponse};
use crate::rest::error::ApiError;
use crate::rest::state::ApiState;
use crate::types::{FlowFilter, FlowStatus};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get service status with store counts
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Health",
    responses(
        (status = 200, description = "Service status with store counts", body = StatusResponse)
    )
)]
pub async fn status(State(state): State<ApiState>) -> Result<Json<StatusResponse>, ApiError> {
    let flows = state.repo.list_flows(&FlowFilter::default()).await?;
    let services = state.repo.list_services().await?;
    let preview_sessions = state.previews.len().await;

    Ok(Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        flow_count: flows.len(),
        active_flow_count: flows
            .iter()
            .filter(|f| f.matches_status(FlowStatus::Active))
            .count(),
        scheduled_count: flows
            .iter()
            .filter(|f| f.matches_status(FlowStatus::Scheduled))
            .count(),
        service_count: services.len(),
        preview_sessions,
    }))
}
