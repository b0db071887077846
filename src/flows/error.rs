use thiserror::Error;
use uuid::Uuid;

use super::graph::GraphIssue;
use crate::store::StoreError;
use crate::types::MAX_OPTION_NUMBER;

/// Errors raised by flow, step, option, schedule and history operations
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("option number must be between 1 and {max}, got {0}", max = MAX_OPTION_NUMBER)]
    OptionNumberOutOfRange(i32),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("flow graph is invalid: {}", describe_issues(.0))]
    InvalidGraph(Vec<GraphIssue>),

    #[error("flow '{0}' is already published")]
    AlreadyPublished(Uuid),

    #[error("flow '{0}' has no pending schedule")]
    NotScheduled(Uuid),

    #[error("cannot roll back from version {current} to version {target}")]
    InvalidRollbackTarget { current: i32, target: i32 },

    #[error("step '{0}' already uses every option number")]
    OptionSlotsExhausted(Uuid),
}

fn describe_issues(issues: &[GraphIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FlowError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FlowError::Store(StoreError::NotFound { .. }))
    }
}
