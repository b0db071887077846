//! Flow audit trail endpoint.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::rest::dto::{HistoryEntryResponse, HistoryQuery};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;
use crate::types::{HistoryAction, HistoryFilter};

const DEFAULT_LIMIT: usize = 100;

/// List history rows, newest first
#[utoipa::path(
    get,
    path = "/api/v1/history",
    tag = "History",
    params(HistoryQuery),
    responses(
        (status = 200, description = "History rows", body = Vec<HistoryEntryResponse>),
        (status = 400, description = "Unknown action filter", body = ErrorResponse)
    )
)]
pub async fn list(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let action = query
        .action
        .as_deref()
        .map(str::parse::<HistoryAction>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let filter = HistoryFilter {
        flow_id: query.flow_id,
        action,
        limit: Some(query.limit.unwrap_or(DEFAULT_LIMIT)),
    };

    let entries = state.history.list(&filter).await?;
    Ok(Json(entries.iter().map(HistoryEntryResponse::from).collect()))
}
