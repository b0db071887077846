//! Preview & Test endpoints.
//!
//! Each session holds its own simulator over a bulk-loaded copy of the flow.
//! Edits made after a session starts are not seen until it is restarted.
//! Sessions idle past `simulator.session_ttl_secs` answer 404.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::rest::dto::{PreviewInputRequest, PreviewResponse, StartPreviewRequest};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;
use crate::simulator::PreviewSimulator;

fn session_not_found(session_id: Uuid) -> ApiError {
    ApiError::NotFound(format!("preview session '{}' not found", session_id))
}

/// Start a preview session at the flow's initial step
#[utoipa::path(
    post,
    path = "/api/v1/preview",
    tag = "Preview",
    request_body = StartPreviewRequest,
    responses(
        (status = 201, description = "Session started", body = PreviewResponse),
        (status = 400, description = "Flow has no steps", body = ErrorResponse),
        (status = 404, description = "Flow not found", body = ErrorResponse)
    )
)]
pub async fn start(
    State(state): State<ApiState>,
    Json(request): Json<StartPreviewRequest>,
) -> Result<(StatusCode, Json<PreviewResponse>), ApiError> {
    let graph = state.editor.load_graph(request.flow_id).await?;
    let mut sim = PreviewSimulator::new(graph)
        .with_invalid_message(state.config.simulator.invalid_option_message.clone());
    sim.start()?;

    let flow_id = sim.flow_id();
    let session_id = state.previews.insert(sim.clone()).await;
    let response = PreviewResponse::new(session_id, &sim);

    tracing::debug!(%session_id, %flow_id, "Preview session started");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Current state of a preview session
#[utoipa::path(
    get,
    path = "/api/v1/preview/{session}",
    tag = "Preview",
    params(("session" = Uuid, Path, description = "Preview session id")),
    responses(
        (status = 200, description = "Session state", body = PreviewResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, ApiError> {
    state
        .previews
        .with_session(session_id, |sim| PreviewResponse::new(session_id, sim))
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(session_id))
}

/// Send a reply to the current prompt.
///
/// A rejected reply is not an HTTP error: the session stays on the same
/// prompt and the message is returned in `error`.
#[utoipa::path(
    post,
    path = "/api/v1/preview/{session}/input",
    tag = "Preview",
    params(("session" = Uuid, Path, description = "Preview session id")),
    request_body = PreviewInputRequest,
    responses(
        (status = 200, description = "Reply processed", body = PreviewResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn input(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<PreviewInputRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    state
        .previews
        .with_session(session_id, |sim| -> Result<_, ApiError> {
            match sim.submit(&request.input) {
                Ok(_) => Ok(Json(PreviewResponse::new(session_id, sim))),
                Err(e) if e.is_recoverable() => {
                    Ok(Json(PreviewResponse::new(session_id, sim).with_error(e.to_string())))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .ok_or_else(|| session_not_found(session_id))?
}

/// Reset a session to idle with an empty transcript
#[utoipa::path(
    post,
    path = "/api/v1/preview/{session}/reset",
    tag = "Preview",
    params(("session" = Uuid, Path, description = "Preview session id")),
    responses(
        (status = 200, description = "Session reset", body = PreviewResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn reset(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, ApiError> {
    state
        .previews
        .with_session(session_id, |sim| {
            sim.reset();
            PreviewResponse::new(session_id, sim)
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(session_id))
}

/// Discard a preview session
#[utoipa::path(
    delete,
    path = "/api/v1/preview/{session}",
    tag = "Preview",
    params(("session" = Uuid, Path, description = "Preview session id")),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn delete(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.previews.remove(session_id).await {
        return Err(session_not_found(session_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
