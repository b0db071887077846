//! Visual editor endpoints: validation, canvas layout, connections.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::flows::CanvasLayout;
use crate::rest::dto::{ConnectStepsRequest, OptionResponse, ValidationResponse};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// Validate a flow graph
#[utoipa::path(
    get,
    path = "/api/v1/flows/{id}/validate",
    tag = "Graph",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Validation report", body = ValidationResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn validate(
    State(state): State<ApiState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<ValidationResponse>, ApiError> {
    let graph = state.editor.load_graph(flow_id).await?;
    Ok(Json(ValidationResponse::new(flow_id, &graph.validate())))
}

/// Canvas nodes and edges for the builder
#[utoipa::path(
    get,
    path = "/api/v1/flows/{id}/graph",
    tag = "Graph",
    params(("id" = Uuid, Path, description = "Flow id")),
    responses(
        (status = 200, description = "Canvas layout", body = CanvasLayout),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn layout(
    State(state): State<ApiState>,
    Path(flow_id): Path<Uuid>,
) -> Result<Json<CanvasLayout>, ApiError> {
    let graph = state.editor.load_graph(flow_id).await?;
    Ok(Json(graph.layout()))
}

/// Persist an edge drawn on the canvas as an option
#[utoipa::path(
    post,
    path = "/api/v1/flows/{id}/graph/connect",
    tag = "Graph",
    params(("id" = Uuid, Path, description = "Flow id")),
    request_body = ConnectStepsRequest,
    responses(
        (status = 201, description = "Option created for the connection", body = OptionResponse),
        (status = 400, description = "Steps outside this flow", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse),
        (status = 409, description = "No free option number", body = ErrorResponse)
    )
)]
pub async fn connect(
    State(state): State<ApiState>,
    Path(flow_id): Path<Uuid>,
    Json(request): Json<ConnectStepsRequest>,
) -> Result<(StatusCode, Json<OptionResponse>), ApiError> {
    let source = state.editor.get_step(request.source_step_id).await?;
    if source.flow_id != flow_id {
        return Err(ApiError::ValidationError(format!(
            "step '{}' does not belong to flow '{}'",
            source.id, flow_id
        )));
    }

    let option = state
        .editor
        .connect_steps(request.source_step_id, request.target_step_id, request.label)
        .await?;
    Ok((StatusCode::CREATED, Json(OptionResponse::from(&option))))
}
