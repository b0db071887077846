//! Scheduled publication endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::rest::dto::{FlowResponse, ScheduleRequest, ScheduledFlowResponse};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// Pending publications with countdowns
#[utoipa::path(
    get,
    path = "/api/v1/scheduled",
    tag = "Schedule",
    responses(
        (status = 200, description = "Scheduled flows, soonest first", body = Vec<ScheduledFlowResponse>)
    )
)]
pub async fn list(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ScheduledFlowResponse>>, ApiError> {
    let scheduled = state.schedule.list_scheduled(Utc::now()).await?;
    Ok(Json(scheduled.iter().map(ScheduledFlowResponse::from).collect()))
}

/// Schedule a flow for publication
#[utoipa::path(
    put,
    path = "/api/v1/flows/{id}/schedule",
    tag = "Schedule",
    params(("id" = Uuid, Path, description = "Flow id")),
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Publication scheduled", body = FlowResponse),
        (status = 400, description = "Time is not in the future", body = ErrorResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse),
        (status = 409, description = "Already published", body = ErrorResponse)
    )
)]
pub async fn set(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<FlowResponse>, ApiError> {
    let operator = state.operator(&headers);
    let flow = state
        .schedule
        .schedule(id, request.scheduled_publish_at, &operator)
        .await?;
    Ok(Json(FlowResponse::from(&flow)))
}

/// Cancel a pending publication
#[utoipa::path(
    delete,
    path = "/api/v1/flows/{id}/schedule",
    tag = "Schedule",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Schedule cancelled", body = FlowResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse),
        (status = 409, description = "Flow is not scheduled", body = ErrorResponse)
    )
)]
pub async fn cancel(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<FlowResponse>, ApiError> {
    let operator = state.operator(&headers);
    let flow = state.schedule.cancel(id, &operator).await?;
    Ok(Json(FlowResponse::from(&flow)))
}

/// Publish a scheduled flow immediately
#[utoipa::path(
    post,
    path = "/api/v1/flows/{id}/publish-now",
    tag = "Schedule",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Flow published", body = FlowResponse),
        (status = 400, description = "Flow graph has errors", body = ErrorResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse),
        (status = 409, description = "Not scheduled or already published", body = ErrorResponse)
    )
)]
pub async fn publish_now(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<FlowResponse>, ApiError> {
    let operator = state.operator(&headers);
    let flow = state.schedule.publish_now(id, &operator).await?;
    Ok(Json(FlowResponse::from(&flow)))
}
