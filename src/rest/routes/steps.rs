//! Step management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::rest::dto::{CreateStepRequest, StepResponse, UpdateStepRequest};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// List the steps of a flow in presentation order
#[utoipa::path(
    get,
    path = "/api/v1/flows/{id}/steps",
    tag = "Steps",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "List of steps", body = Vec<StepResponse>),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn list(
    State(state): State<ApiState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<Vec<StepResponse>>, ApiError> {
    let steps = state.editor.list_steps(flow_id).await?;
    Ok(Json(steps.iter().map(StepResponse::from).collect()))
}

/// Add a step to a flow
#[utoipa::path(
    post,
    path = "/api/v1/flows/{id}/steps",
    tag = "Steps",
    params(("id" = Uuid, Path, description = "Flow id")),
    request_body = CreateStepRequest,
    responses(
        (status = 201, description = "Step created", body = StepResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn create(
    State(state): State<ApiState>,
    Path(flow_id): Path<Uuid>,
    Json(request): Json<CreateStepRequest>,
) -> Result<(StatusCode, Json<StepResponse>), ApiError> {
    let step = state.editor.create_step(flow_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(StepResponse::from(&step))))
}

/// Get a single step
#[utoipa::path(
    get,
    path = "/api/v1/steps/{id}",
    tag = "Steps",
    params(("id" = Uuid, Path, description = "Step id")),
    responses(
        (status = 200, description = "Step details", body = StepResponse),
        (status = 404, description = "Step not found", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StepResponse>, ApiError> {
    let step = state.editor.get_step(id).await?;
    Ok(Json(StepResponse::from(&step)))
}

/// Update a step
#[utoipa::path(
    put,
    path = "/api/v1/steps/{id}",
    tag = "Steps",
    params(("id" = Uuid, Path, description = "Step id")),
    request_body = UpdateStepRequest,
    responses(
        (status = 200, description = "Step updated", body = StepResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse)
    )
)]
pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStepRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    let step = state.editor.update_step(id, request.into()).await?;
    Ok(Json(StepResponse::from(&step)))
}

/// Delete a step and its options
#[utoipa::path(
    delete,
    path = "/api/v1/steps/{id}",
    tag = "Steps",
    params(("id" = Uuid, Path, description = "Step id")),
    responses(
        (status = 204, description = "Step deleted"),
        (status = 404, description = "Step not found", body = ErrorResponse)
    )
)]
pub async fn delete(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.editor.delete_step(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
