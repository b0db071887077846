//! OpenAPI specification builder using utoipa.

use utoipa::OpenApi;

use crate::flows::graph::{CanvasEdge, CanvasLayout, CanvasNode};
use crate::rest::dto::{
    ConnectStepsRequest, CreateFlowRequest, CreateMnoRequest, CreateOptionRequest,
    CreateServiceRequest, CreateStepRequest, FlowResponse, HealthResponse, HistoryEntryResponse,
    IssueResponse, MnoResponse, OptionResponse, PreviewInputRequest, PreviewRecordResponse,
    PreviewResponse, RollbackRequest, ScheduleRequest, ScheduledFlowResponse, ServiceResponse,
    StartPreviewRequest, StatusResponse, StepResponse, UpdateFlowRequest, UpdateOptionRequest,
    UpdateStepRequest, ValidationResponse,
};
use crate::rest::error::ErrorResponse;

/// OpenAPI documentation for the menuflow REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "menuflow API",
        version = "0.3.0",
        description = "REST API for building, previewing and publishing USSD menu flows.",
        license(name = "MIT")
    ),
    paths(
        // Health endpoints
        crate::rest::routes::health::health,
        crate::rest::routes::health::status,
        // Flow endpoints
        crate::rest::routes::flows::list,
        crate::rest::routes::flows::get_one,
        crate::rest::routes::flows::create,
        crate::rest::routes::flows::update,
        crate::rest::routes::flows::delete,
        crate::rest::routes::flows::activate,
        crate::rest::routes::flows::publish,
        crate::rest::routes::flows::duplicate,
        crate::rest::routes::flows::rollback,
        // Step endpoints
        crate::rest::routes::steps::list,
        crate::rest::routes::steps::create,
        crate::rest::routes::steps::get_one,
        crate::rest::routes::steps::update,
        crate::rest::routes::steps::delete,
        // Option endpoints
        crate::rest::routes::options::list,
        crate::rest::routes::options::create,
        crate::rest::routes::options::update,
        crate::rest::routes::options::delete,
        // Graph endpoints
        crate::rest::routes::graph::validate,
        crate::rest::routes::graph::layout,
        crate::rest::routes::graph::connect,
        // Preview endpoints
        crate::rest::routes::preview::start,
        crate::rest::routes::preview::get_one,
        crate::rest::routes::preview::input,
        crate::rest::routes::preview::reset,
        crate::rest::routes::preview::delete,
        // Schedule endpoints
        crate::rest::routes::schedule::list,
        crate::rest::routes::schedule::set,
        crate::rest::routes::schedule::cancel,
        crate::rest::routes::schedule::publish_now,
        // History endpoints
        crate::rest::routes::history::list,
        // Reference data endpoints
        crate::rest::routes::reference::list_services,
        crate::rest::routes::reference::create_service,
        crate::rest::routes::reference::list_mnos,
        crate::rest::routes::reference::create_mno,
    ),
    components(
        schemas(
            // Response types
            HealthResponse,
            StatusResponse,
            FlowResponse,
            ScheduledFlowResponse,
            StepResponse,
            OptionResponse,
            ValidationResponse,
            IssueResponse,
            CanvasLayout,
            CanvasNode,
            CanvasEdge,
            PreviewResponse,
            PreviewRecordResponse,
            HistoryEntryResponse,
            ServiceResponse,
            MnoResponse,
            ErrorResponse,
            // Request types
            CreateFlowRequest,
            UpdateFlowRequest,
            RollbackRequest,
            ScheduleRequest,
            CreateStepRequest,
            UpdateStepRequest,
            CreateOptionRequest,
            UpdateOptionRequest,
            ConnectStepsRequest,
            StartPreviewRequest,
            PreviewInputRequest,
            CreateServiceRequest,
            CreateMnoRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check and status endpoints"),
        (name = "Flows", description = "Flow lifecycle: create, activate, publish, duplicate"),
        (name = "Steps", description = "Menu steps within a flow"),
        (name = "Options", description = "Numbered choices on selection steps"),
        (name = "Graph", description = "Validation and the canvas view"),
        (name = "Preview", description = "Interactive handset simulator"),
        (name = "Schedule", description = "Scheduled publication"),
        (name = "History", description = "Flow audit trail"),
        (name = "Services", description = "USSD short codes"),
        (name = "MNOs", description = "Mobile network operators"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }

    /// Generate the OpenAPI specification as a YAML string
    pub fn yaml() -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&Self::openapi())
    }
}
