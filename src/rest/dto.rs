//! Data Transfer Objects for the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// Note: ToSchema is derived on all DTOs for OpenAPI documentation generation

use crate::flows::{
    FlowUpdate, GraphIssue, NewFlow, NewOption, NewStep, OptionUpdate, ScheduledFlow, StepUpdate,
    ValidationReport,
};
use crate::simulator::{PreviewSimulator, SimulatorRecord, SimulatorState};
use crate::types::{FlowHistoryEntry, MenuFlow, MenuOption, MenuStep, Mno, ResponseType, UssdService};

/// Distinguish an absent field from an explicit `null`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Flow DTOs
// =============================================================================

/// Response for a single flow
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlowResponse {
    pub id: Uuid,
    pub name: String,
    pub service_id: Uuid,
    pub version: i32,
    pub is_active: bool,
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_publish_at: Option<DateTime<Utc>>,
    pub language: String,
    pub description: String,
    /// One of `published`, `scheduled`, `draft`
    pub status: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MenuFlow> for FlowResponse {
    fn from(flow: &MenuFlow) -> Self {
        let status = if flow.is_published {
            "published"
        } else if flow.is_scheduled() {
            "scheduled"
        } else {
            "draft"
        };
        Self {
            id: flow.id,
            name: flow.name.clone(),
            service_id: flow.service_id,
            version: flow.version,
            is_active: flow.is_active,
            is_published: flow.is_published,
            scheduled_publish_at: flow.scheduled_publish_at,
            language: flow.language.clone(),
            description: flow.description.clone(),
            status: status.to_string(),
            created_by: flow.created_by.clone(),
            created_at: flow.created_at,
            updated_at: flow.updated_at,
        }
    }
}

/// Query parameters for listing flows
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FlowListQuery {
    /// Only flows of this service
    pub service_id: Option<Uuid>,
    /// active, inactive, published, draft or scheduled
    pub status: Option<String>,
}

/// Request to create a flow
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateFlowRequest {
    pub name: String,
    pub service_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl From<CreateFlowRequest> for NewFlow {
    fn from(req: CreateFlowRequest) -> Self {
        Self {
            name: req.name,
            service_id: req.service_id,
            description: req.description,
            language: req.language,
        }
    }
}

/// Request to update a flow (all fields optional)
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateFlowRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub service_id: Option<Uuid>,
}

impl From<UpdateFlowRequest> for FlowUpdate {
    fn from(req: UpdateFlowRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            language: req.language,
            service_id: req.service_id,
        }
    }
}

/// Request to schedule a publication
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    pub scheduled_publish_at: DateTime<Utc>,
}

/// Request to record a rollback
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RollbackRequest {
    pub target_version: i32,
}

/// A pending publication with its countdown
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduledFlowResponse {
    pub flow: FlowResponse,
    pub scheduled_publish_at: DateTime<Utc>,
    pub seconds_remaining: i64,
    pub countdown: String,
}

impl From<&ScheduledFlow> for ScheduledFlowResponse {
    fn from(s: &ScheduledFlow) -> Self {
        Self {
            flow: FlowResponse::from(&s.flow),
            scheduled_publish_at: s.scheduled_publish_at,
            seconds_remaining: s.seconds_remaining,
            countdown: s.countdown.clone(),
        }
    }
}

// =============================================================================
// Step DTOs
// =============================================================================

/// Response for a single step
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StepResponse {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub step_number: i32,
    pub step_name: String,
    pub menu_text: String,
    pub response_type: String,
    pub timeout_seconds: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_step_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    pub is_initial_step: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MenuStep> for StepResponse {
    fn from(step: &MenuStep) -> Self {
        Self {
            id: step.id,
            flow_id: step.flow_id,
            step_number: step.step_number,
            step_name: step.step_name.clone(),
            menu_text: step.menu_text.clone(),
            response_type: step.response_type.to_string(),
            timeout_seconds: step.timeout_seconds,
            fallback_message: step.fallback_message.clone(),
            parent_step_id: step.parent_step_id,
            api_endpoint: step.api_endpoint.clone(),
            is_initial_step: step.is_initial_step,
            created_at: step.created_at,
            updated_at: step.updated_at,
        }
    }
}

/// Request to create a step
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateStepRequest {
    pub step_name: String,
    pub menu_text: String,
    /// selection, input, confirmation or end
    #[serde(default)]
    #[schema(value_type = String)]
    pub response_type: ResponseType,
    #[serde(default)]
    pub timeout_seconds: Option<i32>,
    #[serde(default)]
    pub fallback_message: Option<String>,
    #[serde(default)]
    pub parent_step_id: Option<Uuid>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub is_initial_step: bool,
}

impl From<CreateStepRequest> for NewStep {
    fn from(req: CreateStepRequest) -> Self {
        Self {
            step_name: req.step_name,
            menu_text: req.menu_text,
            response_type: req.response_type,
            timeout_seconds: req.timeout_seconds,
            fallback_message: req.fallback_message,
            parent_step_id: req.parent_step_id,
            api_endpoint: req.api_endpoint,
            is_initial_step: req.is_initial_step,
        }
    }
}

/// Request to update a step (all fields optional; `null` clears optional fields)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateStepRequest {
    pub step_name: Option<String>,
    pub menu_text: Option<String>,
    #[schema(value_type = Option<String>)]
    pub response_type: Option<ResponseType>,
    pub timeout_seconds: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub fallback_message: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_step_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub api_endpoint: Option<Option<String>>,
    pub is_initial_step: Option<bool>,
}

impl From<UpdateStepRequest> for StepUpdate {
    fn from(req: UpdateStepRequest) -> Self {
        Self {
            step_name: req.step_name,
            menu_text: req.menu_text,
            response_type: req.response_type,
            timeout_seconds: req.timeout_seconds,
            fallback_message: req.fallback_message,
            parent_step_id: req.parent_step_id,
            api_endpoint: req.api_endpoint,
            is_initial_step: req.is_initial_step,
        }
    }
}

// =============================================================================
// Option DTOs
// =============================================================================

/// Response for a single option
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OptionResponse {
    pub id: Uuid,
    pub step_id: Uuid,
    pub option_number: i32,
    pub option_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_value: Option<String>,
    /// Absent when the option ends the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MenuOption> for OptionResponse {
    fn from(option: &MenuOption) -> Self {
        Self {
            id: option.id,
            step_id: option.step_id,
            option_number: option.option_number,
            option_text: option.option_text.clone(),
            option_value: option.option_value.clone(),
            next_step_id: option.next_step_id,
            is_active: option.is_active,
            created_at: option.created_at,
            updated_at: option.updated_at,
        }
    }
}

/// Request to create an option
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOptionRequest {
    pub option_number: i32,
    pub option_text: String,
    #[serde(default)]
    pub option_value: Option<String>,
    #[serde(default)]
    pub next_step_id: Option<Uuid>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<CreateOptionRequest> for NewOption {
    fn from(req: CreateOptionRequest) -> Self {
        Self {
            option_number: req.option_number,
            option_text: req.option_text,
            option_value: req.option_value,
            next_step_id: req.next_step_id,
            is_active: req.is_active,
        }
    }
}

/// Request to update an option (all fields optional; `null` clears optional fields)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOptionRequest {
    pub option_number: Option<i32>,
    pub option_text: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub option_value: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub next_step_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

impl From<UpdateOptionRequest> for OptionUpdate {
    fn from(req: UpdateOptionRequest) -> Self {
        Self {
            option_number: req.option_number,
            option_text: req.option_text,
            option_value: req.option_value,
            next_step_id: req.next_step_id,
            is_active: req.is_active,
        }
    }
}

// =============================================================================
// Graph DTOs
// =============================================================================

/// Request to persist a canvas connection
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectStepsRequest {
    pub source_step_id: Uuid,
    pub target_step_id: Uuid,
    /// Option label; defaults to the target step name
    #[serde(default)]
    pub label: Option<String>,
}

/// A single validation finding
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueResponse {
    pub kind: String,
    pub severity: String,
    pub message: String,
}

impl From<&GraphIssue> for IssueResponse {
    fn from(issue: &GraphIssue) -> Self {
        let severity = if issue.is_error() { "error" } else { "warning" };
        Self {
            kind: issue.kind().to_string(),
            severity: severity.to_string(),
            message: issue.to_string(),
        }
    }
}

/// Result of validating a flow graph
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    pub flow_id: Uuid,
    pub valid: bool,
    pub errors: Vec<IssueResponse>,
    pub warnings: Vec<IssueResponse>,
}

impl ValidationResponse {
    pub fn new(flow_id: Uuid, report: &ValidationReport) -> Self {
        Self {
            flow_id,
            valid: report.is_valid(),
            errors: report.errors.iter().map(IssueResponse::from).collect(),
            warnings: report.warnings.iter().map(IssueResponse::from).collect(),
        }
    }
}

// =============================================================================
// Preview DTOs
// =============================================================================

/// Request to start a preview session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartPreviewRequest {
    pub flow_id: Uuid,
}

/// Keystrokes for the current prompt
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PreviewInputRequest {
    pub input: String,
}

/// One line of a preview transcript
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PreviewRecordResponse {
    pub step_id: Uuid,
    pub step_name: String,
    pub menu_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&SimulatorRecord> for PreviewRecordResponse {
    fn from(record: &SimulatorRecord) -> Self {
        Self {
            step_id: record.step_id,
            step_name: record.step_name.clone(),
            menu_text: record.menu_text.clone(),
            input: record.input.clone(),
            timestamp: record.timestamp,
        }
    }
}

/// Snapshot of a preview session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PreviewResponse {
    pub session_id: Uuid,
    pub flow_id: Uuid,
    /// idle, running or ended
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<Uuid>,
    /// Current prompt with its options, as the handset shows it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    pub history: Vec<PreviewRecordResponse>,
    /// Message for a rejected reply; the session stays where it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewResponse {
    pub fn new(session_id: Uuid, sim: &PreviewSimulator) -> Self {
        let (state, current_step_id) = match sim.state() {
            SimulatorState::Idle => ("idle", None),
            SimulatorState::Running { step_id } => ("running", Some(step_id)),
            SimulatorState::Ended => ("ended", None),
        };
        Self {
            session_id,
            flow_id: sim.flow_id(),
            state: state.to_string(),
            current_step_id,
            screen: sim.screen(),
            history: sim.history().iter().map(PreviewRecordResponse::from).collect(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

// =============================================================================
// History DTOs
// =============================================================================

/// Query parameters for the audit trail
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub flow_id: Option<Uuid>,
    /// Action tag, e.g. `published`
    pub action: Option<String>,
    /// Maximum rows (default 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub action: String,
    pub description: String,
    pub performed_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_version: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<&FlowHistoryEntry> for HistoryEntryResponse {
    fn from(entry: &FlowHistoryEntry) -> Self {
        Self {
            id: entry.id,
            flow_id: entry.flow_id,
            action: entry.action.to_string(),
            description: entry.description.clone(),
            performed_by: entry.performed_by.clone(),
            old_version: entry.old_version,
            new_version: entry.new_version,
            created_at: entry.created_at,
        }
    }
}

// =============================================================================
// Service / MNO DTOs
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceResponse {
    pub id: Uuid,
    pub name: String,
    pub ussd_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mno_id: Option<Uuid>,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UssdService> for ServiceResponse {
    fn from(s: &UssdService) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            ussd_code: s.ussd_code.clone(),
            mno_id: s.mno_id,
            description: s.description.clone(),
            is_active: s.is_active,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    pub name: String,
    /// Short code such as `*150*88#`
    pub ussd_code: String,
    #[serde(default)]
    pub mno_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MnoResponse {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcc_mnc: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Mno> for MnoResponse {
    fn from(m: &Mno) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            country: m.country.clone(),
            mcc_mnc: m.mcc_mnc.clone(),
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateMnoRequest {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub mcc_mnc: Option<String>,
}

// =============================================================================
// Health DTOs
// =============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Status response with store counts
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub flow_count: usize,
    pub active_flow_count: usize,
    pub scheduled_count: usize,
    pub service_count: usize,
    pub preview_sessions: usize,
}
