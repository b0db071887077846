//! Flow audit trail types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum HistoryAction {
    Created,
    Updated,
    Published,
    Activated,
    Deactivated,
    Scheduled,
    ScheduleCancelled,
    /// Audit-only marker; flow data is not restored
    RolledBack,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Updated => "updated",
            HistoryAction::Published => "published",
            HistoryAction::Activated => "activated",
            HistoryAction::Deactivated => "deactivated",
            HistoryAction::Scheduled => "scheduled",
            HistoryAction::ScheduleCancelled => "schedule_cancelled",
            HistoryAction::RolledBack => "rolled_back",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "published" => Ok(Self::Published),
            "activated" => Ok(Self::Activated),
            "deactivated" => Ok(Self::Deactivated),
            "scheduled" => Ok(Self::Scheduled),
            "schedule_cancelled" => Ok(Self::ScheduleCancelled),
            "rolled_back" | "rollback" => Ok(Self::RolledBack),
            other => Err(format!("unknown history action '{}'", other)),
        }
    }
}

/// One append-only audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct FlowHistoryEntry {
    pub id: Uuid,

    pub flow_id: Uuid,

    pub action: HistoryAction,

    pub description: String,

    pub performed_by: String,

    #[serde(default)]
    pub old_version: Option<i32>,

    #[serde(default)]
    pub new_version: Option<i32>,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl FlowHistoryEntry {
    pub fn new(
        flow_id: Uuid,
        action: HistoryAction,
        description: impl Into<String>,
        performed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow_id,
            action,
            description: description.into(),
            performed_by: performed_by.into(),
            old_version: None,
            new_version: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_versions(mut self, old_version: Option<i32>, new_version: Option<i32>) -> Self {
        self.old_version = old_version;
        self.new_version = new_version;
        self
    }
}

/// Filter applied when reading the audit trail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub flow_id: Option<Uuid>,
    pub action: Option<HistoryAction>,
    /// Maximum rows returned; `None` returns everything
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn for_flow(flow_id: Uuid) -> Self {
        Self {
            flow_id: Some(flow_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &FlowHistoryEntry) -> bool {
        self.flow_id.map_or(true, |id| entry.flow_id == id)
            && self.action.map_or(true, |a| entry.action == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trips_through_str() {
        for action in [
            HistoryAction::Created,
            HistoryAction::ScheduleCancelled,
            HistoryAction::RolledBack,
        ] {
            assert_eq!(action.as_str().parse::<HistoryAction>(), Ok(action));
        }
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&HistoryAction::ScheduleCancelled).unwrap();
        assert_eq!(json, "\"schedule_cancelled\"");
    }

    #[test]
    fn test_filter_matches_action() {
        let flow_id = Uuid::new_v4();
        let entry = FlowHistoryEntry::new(flow_id, HistoryAction::Published, "published", "ops");
        let filter = HistoryFilter {
            action: Some(HistoryAction::Published),
            ..HistoryFilter::for_flow(flow_id)
        };
        assert!(filter.matches(&entry));
        assert!(!HistoryFilter {
            action: Some(HistoryAction::Created),
            ..HistoryFilter::default()
        }
        .matches(&entry));
    }
}
