//! Option management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::rest::dto::{CreateOptionRequest, OptionResponse, UpdateOptionRequest};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// List the options of a step by number
#[utoipa::path(
    get,
    path = "/api/v1/steps/{id}/options",
    tag = "Options",
    params(("id" = Uuid, Path, description = "Step id")),
    responses(
        (status = 200, description = "List of options", body = Vec<OptionResponse>),
        (status = 404, description = "Step not found", body = ErrorResponse)
    )
)]
pub async fn list(
    State(state): State<ApiState>,
    Path(step_id): Path<Uuid>,
) -> Result<Json<Vec<OptionResponse>>, ApiError> {
    let options = state.editor.list_options(step_id).await?;
    Ok(Json(options.iter().map(OptionResponse::from).collect()))
}

/// Add an option to a step
#[utoipa::path(
    post,
    path = "/api/v1/steps/{id}/options",
    tag = "Options",
    params(("id" = Uuid, Path, description = "Step id")),
    request_body = CreateOptionRequest,
    responses(
        (status = 201, description = "Option created", body = OptionResponse),
        (status = 400, description = "Validation error or invalid graph", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse)
    )
)]
pub async fn create(
    State(state): State<ApiState>,
    Path(step_id): Path<Uuid>,
    Json(request): Json<CreateOptionRequest>,
) -> Result<(StatusCode, Json<OptionResponse>), ApiError> {
    let option = state.editor.create_option(step_id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(OptionResponse::from(&option))))
}

/// Update an option
#[utoipa::path(
    put,
    path = "/api/v1/options/{id}",
    tag = "Options",
    params(("id" = Uuid, Path, description = "Option id")),
    request_body = UpdateOptionRequest,
    responses(
        (status = 200, description = "Option updated", body = OptionResponse),
        (status = 400, description = "Validation error or invalid graph", body = ErrorResponse),
        (status = 404, description = "Option not found", body = ErrorResponse)
    )
)]
pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOptionRequest>,
) -> Result<Json<OptionResponse>, ApiError> {
    let option = state.editor.update_option(id, request.into()).await?;
    Ok(Json(OptionResponse::from(&option)))
}

/// Delete an option
#[utoipa::path(
    delete,
    path = "/api/v1/options/{id}",
    tag = "Options",
    params(("id" = Uuid, Path, description = "Option id")),
    responses(
        (status = 204, description = "Option deleted"),
        (status = 404, description = "Option not found", body = ErrorResponse)
    )
)]
pub async fn delete(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.editor.delete_option(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::{MenuFlow, MenuStep, ResponseType};

    async fn state_with_step() -> (ApiState, MenuStep) {
        let state = ApiState::in_memory(Config::default());
        let flow = state
            .repo
            .insert_flow(MenuFlow::draft("Main", Uuid::new_v4(), "en", "ops"))
            .await
            .unwrap();
        let step = state
            .repo
            .insert_step(MenuStep::new(flow.id, "main", "Welcome", ResponseType::Selection))
            .await
            .unwrap();
        (state, step)
    }

    fn request(number: i32, next: Option<Uuid>) -> Json<CreateOptionRequest> {
        Json(CreateOptionRequest {
            option_number: number,
            option_text: format!("Choice {}", number),
            option_value: None,
            next_step_id: next,
            is_active: None,
        })
    }

    #[tokio::test]
    async fn test_create_list_update_delete() {
        let (state, step) = state_with_step().await;

        let (status, Json(option)) = create(State(state.clone()), Path(step.id), request(1, None))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(option.is_active);

        let Json(updated) = update(
            State(state.clone()),
            Path(option.id),
            Json(UpdateOptionRequest {
                option_text: Some("Send Money".to_string()),
                ..UpdateOptionRequest::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.option_text, "Send Money");

        let Json(options) = list(State(state.clone()), Path(step.id)).await.unwrap();
        assert_eq!(options.len(), 1);

        delete(State(state.clone()), Path(option.id)).await.unwrap();
        let Json(options) = list(State(state), Path(step.id)).await.unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_target() {
        let (state, step) = state_with_step().await;
        let err = create(State(state), Path(step.id), request(1, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_number() {
        let (state, step) = state_with_step().await;
        let err = create(State(state), Path(step.id), request(0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }
}
