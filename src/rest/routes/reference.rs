//! Reference data: USSD services and mobile network operators.

use axum::{extract::State, http::StatusCode, Json};

use crate::rest::dto::{CreateMnoRequest, CreateServiceRequest, MnoResponse, ServiceResponse};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;
use crate::types::{is_valid_ussd_code, Mno, UssdService};

fn non_blank(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::ValidationError(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// List USSD services
#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "Services",
    responses(
        (status = 200, description = "List of services", body = Vec<ServiceResponse>)
    )
)]
pub async fn list_services(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ServiceResponse>>, ApiError> {
    let services = state.repo.list_services().await?;
    Ok(Json(services.iter().map(ServiceResponse::from).collect()))
}

/// Register a USSD service
#[utoipa::path(
    post,
    path = "/api/v1/services",
    tag = "Services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "MNO not found", body = ErrorResponse),
        (status = 409, description = "Short code already registered", body = ErrorResponse)
    )
)]
pub async fn create_service(
    State(state): State<ApiState>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>), ApiError> {
    let name = non_blank("name", &request.name)?;
    let code = request.ussd_code.trim();
    if !is_valid_ussd_code(code) {
        return Err(ApiError::ValidationError(format!(
            "'{}' is not a USSD short code",
            request.ussd_code
        )));
    }
    if let Some(mno_id) = request.mno_id {
        state.repo.get_mno(mno_id).await?;
    }

    let mut service = UssdService::new(name, code);
    service.mno_id = request.mno_id;
    service.description = request.description.unwrap_or_default();
    let service = state.repo.insert_service(service).await?;

    tracing::info!(service_id = %service.id, code = %service.ussd_code, "Registered USSD service");
    Ok((StatusCode::CREATED, Json(ServiceResponse::from(&service))))
}

/// List mobile network operators
#[utoipa::path(
    get,
    path = "/api/v1/mnos",
    tag = "MNOs",
    responses(
        (status = 200, description = "List of operators", body = Vec<MnoResponse>)
    )
)]
pub async fn list_mnos(State(state): State<ApiState>) -> Result<Json<Vec<MnoResponse>>, ApiError> {
    let mnos = state.repo.list_mnos().await?;
    Ok(Json(mnos.iter().map(MnoResponse::from).collect()))
}

/// Register a mobile network operator
#[utoipa::path(
    post,
    path = "/api/v1/mnos",
    tag = "MNOs",
    request_body = CreateMnoRequest,
    responses(
        (status = 201, description = "Operator created", body = MnoResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn create_mno(
    State(state): State<ApiState>,
    Json(request): Json<CreateMnoRequest>,
) -> Result<(StatusCode, Json<MnoResponse>), ApiError> {
    let mut mno = Mno::new(
        non_blank("name", &request.name)?,
        non_blank("country", &request.country)?,
    );
    mno.mcc_mnc = request.mcc_mnc.filter(|m| !m.trim().is_empty());
    let mno = state.repo.insert_mno(mno).await?;
    Ok((StatusCode::CREATED, Json(MnoResponse::from(&mno))))
}
