//! Flow lifecycle, step/option editing, graph model and scheduling.

mod editor;
mod error;
pub mod graph;
mod manager;
pub mod sample;
mod schedule;

pub use editor::{NewOption, NewStep, OptionUpdate, StepEditor, StepUpdate};
pub use error::FlowError;
pub use graph::{CanvasLayout, FlowGraph, GraphIssue, Severity, ValidationReport};
pub use manager::{FlowManager, FlowUpdate, NewFlow};
pub use schedule::{format_countdown, ScheduleManager, ScheduledFlow, SCHEDULER_OPERATOR};

use uuid::Uuid;

use crate::store::FlowRepository;

/// Bulk-load a flow's steps and options into a graph
pub async fn load_graph(repo: &dyn FlowRepository, flow_id: Uuid) -> Result<FlowGraph, FlowError> {
    let flow = repo.get_flow(flow_id).await?;
    let steps = repo.list_steps(flow.id).await?;
    let options = repo.list_flow_options(flow.id).await?;
    Ok(FlowGraph::new(flow.id, steps, options))
}

/// Trimmed value of a required text field
pub(crate) fn required(field: &'static str, value: &str) -> Result<String, FlowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FlowError::MissingField(field));
    }
    Ok(value.to_string())
}
