//! API error types and responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::flows::FlowError;
use crate::simulator::SimulatorError;
use crate::store::StoreError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found
    NotFound(String),
    /// Validation error
    ValidationError(String),
    /// Resource already exists or is in the wrong state
    Conflict(String),
    /// Internal server error
    InternalError(String),
    /// Bad request
    BadRequest(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Io(_) | StoreError::Serialization(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Store(e) => e.into(),
            FlowError::MissingField(_)
            | FlowError::OptionNumberOutOfRange(_)
            | FlowError::InvalidValue(_)
            | FlowError::InvalidGraph(_)
            | FlowError::InvalidRollbackTarget { .. } => ApiError::ValidationError(err.to_string()),
            FlowError::AlreadyPublished(_)
            | FlowError::NotScheduled(_)
            | FlowError::OptionSlotsExhausted(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<SimulatorError> for ApiError {
    fn from(err: SimulatorError) -> Self {
        match err {
            SimulatorError::NotRunning | SimulatorError::DanglingTarget(_) => {
                ApiError::Conflict(err.to_string())
            }
            SimulatorError::EmptyFlow => ApiError::ValidationError(err.to_string()),
            SimulatorError::InvalidSelection { .. }
            | SimulatorError::InvalidConfirmation
            | SimulatorError::EmptyInput => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
