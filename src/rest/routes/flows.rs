//! Flow lifecycle endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::rest::dto::{
    CreateFlowRequest, FlowListQuery, FlowResponse, HistoryEntryResponse, RollbackRequest,
    UpdateFlowRequest,
};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;
use crate::types::{FlowFilter, FlowStatus};

/// List flows
#[utoipa::path(
    get,
    path = "/api/v1/flows",
    tag = "Flows",
    params(FlowListQuery),
    responses(
        (status = 200, description = "List of flows", body = Vec<FlowResponse>),
        (status = 400, description = "Unknown status filter", body = ErrorResponse)
    )
)]
pub async fn list(
    State(state): State<ApiState>,
    Query(query): Query<FlowListQuery>,
) -> Result<Json<Vec<FlowResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<FlowStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let filter = FlowFilter {
        service_id: query.service_id,
        status,
    };

    let flows = state.flows.list(&filter).await?;
    Ok(Json(flows.iter().map(FlowResponse::from).collect()))
}

/// Get a single flow
#[utoipa::path(
    get,
    path = "/api/v1/flows/{id}",
    tag = "Flows",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Flow details", body = FlowResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlowResponse>, ApiError> {
    let flow = state.flows.get(id).await?;
    Ok(Json(FlowResponse::from(&flow)))
}

/// Create a draft flow
#[utoipa::path(
    post,
    path = "/api/v1/flows",
    tag = "Flows",
    request_body = CreateFlowRequest,
    responses(
        (status = 201, description = "Flow created", body = FlowResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Service not found", body = ErrorResponse)
    )
)]
pub async fn create(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<CreateFlowRequest>,
) -> Result<(StatusCode, Json<FlowResponse>), ApiError> {
    let operator = state.operator(&headers);
    let flow = state.flows.create(request.into(), &operator).await?;
    Ok((StatusCode::CREATED, Json(FlowResponse::from(&flow))))
}

/// Update a flow's name, description, language or service
#[utoipa::path(
    put,
    path = "/api/v1/flows/{id}",
    tag = "Flows",
    params(("id" = Uuid, Path, description = "Flow id")),
    request_body = UpdateFlowRequest,
    responses(
        (status = 200, description = "Flow updated", body = FlowResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<UpdateFlowRequest>,
) -> Result<Json<FlowResponse>, ApiError> {
    let operator = state.operator(&headers);
    let flow = state.flows.update(id, request.into(), &operator).await?;
    Ok(Json(FlowResponse::from(&flow)))
}

/// Delete a flow with its steps and options
#[utoipa::path(
    delete,
    path = "/api/v1/flows/{id}",
    tag = "Flows",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 204, description = "Flow deleted"),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn delete(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.flows.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggle whether the gateway serves a flow
#[utoipa::path(
    put,
    path = "/api/v1/flows/{id}/activate",
    tag = "Flows",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Activation toggled", body = FlowResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn activate(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<FlowResponse>, ApiError> {
    let operator = state.operator(&headers);
    let flow = state.flows.toggle_active(id, &operator).await?;
    Ok(Json(FlowResponse::from(&flow)))
}

/// Publish a flow after validating its graph
#[utoipa::path(
    post,
    path = "/api/v1/flows/{id}/publish",
    tag = "Flows",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Flow published", body = FlowResponse),
        (status = 400, description = "Flow graph has errors", body = ErrorResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse),
        (status = 409, description = "Already published", body = ErrorResponse)
    )
)]
pub async fn publish(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<FlowResponse>, ApiError> {
    let operator = state.operator(&headers);
    let flow = state.flows.publish(id, &operator).await?;
    Ok(Json(FlowResponse::from(&flow)))
}

/// Copy a flow into a new inactive draft
#[utoipa::path(
    post,
    path = "/api/v1/flows/{id}/duplicate",
    tag = "Flows",
    params(("id" = Uuid, Path, description = "Source flow id")),
    responses(
        (status = 201, description = "Flow duplicated", body = FlowResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn duplicate(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<FlowResponse>), ApiError> {
    let operator = state.operator(&headers);
    let copy = state.flows.duplicate(id, &operator).await?;
    Ok((StatusCode::CREATED, Json(FlowResponse::from(&copy))))
}

/// Record a rollback to an earlier version (audit entry only)
#[utoipa::path(
    post,
    path = "/api/v1/flows/{id}/rollback",
    tag = "Flows",
    params(("id" = Uuid, Path, description = "Flow id")),
    request_body = RollbackRequest,
    responses(
        (status = 200, description = "Rollback recorded", body = HistoryEntryResponse),
        (status = 400, description = "Target version out of range", body = ErrorResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn rollback(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<RollbackRequest>,
) -> Result<Json<HistoryEntryResponse>, ApiError> {
    let operator = state.operator(&headers);
    let entry = state
        .history
        .rollback(id, request.target_version, &operator)
        .await?;
    Ok(Json(HistoryEntryResponse::from(&entry)))
}
