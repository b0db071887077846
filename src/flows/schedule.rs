//! Scheduled publication of flows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{FlowError, FlowManager};
use crate::history::HistoryLog;
use crate::store::FlowRepository;
use crate::types::{FlowFilter, FlowHistoryEntry, FlowStatus, HistoryAction, MenuFlow};

/// `performed_by` recorded for automatic publications
pub const SCHEDULER_OPERATOR: &str = "scheduler";

/// A pending publication with its countdown
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledFlow {
    pub flow: MenuFlow,
    pub scheduled_publish_at: DateTime<Utc>,
    /// Negative once overdue
    pub seconds_remaining: i64,
    pub countdown: String,
}

impl ScheduledFlow {
    fn new(flow: MenuFlow, at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let seconds_remaining = (at - now).num_seconds();
        Self {
            flow,
            scheduled_publish_at: at,
            seconds_remaining,
            countdown: format_countdown(seconds_remaining),
        }
    }

    pub fn is_due(&self) -> bool {
        self.seconds_remaining <= 0
    }
}

/// Human countdown such as `2d 3h`, `4h 12m` or `5m`
pub fn format_countdown(seconds_remaining: i64) -> String {
    if seconds_remaining <= 0 {
        return "overdue".to_string();
    }

    let days = seconds_remaining / 86_400;
    let hours = (seconds_remaining % 86_400) / 3_600;
    let minutes = (seconds_remaining % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        "<1m".to_string()
    }
}

#[derive(Clone)]
pub struct ScheduleManager {
    repo: Arc<dyn FlowRepository>,
    manager: FlowManager,
    history: HistoryLog,
}

impl ScheduleManager {
    pub fn new(repo: Arc<dyn FlowRepository>, manager: FlowManager) -> Self {
        Self {
            history: HistoryLog::new(repo.clone()),
            repo,
            manager,
        }
    }

    /// Set a future publication time on an unpublished flow
    pub async fn schedule(
        &self,
        flow_id: Uuid,
        at: DateTime<Utc>,
        performed_by: &str,
    ) -> Result<MenuFlow, FlowError> {
        let mut flow = self.repo.get_flow(flow_id).await?;
        if flow.is_published {
            return Err(FlowError::AlreadyPublished(flow.id));
        }
        let now = Utc::now();
        if at <= now {
            return Err(FlowError::InvalidValue(format!(
                "scheduled time {} is not in the future",
                at.to_rfc3339()
            )));
        }

        flow.scheduled_publish_at = Some(at);
        flow.updated_at = now;
        let flow = self.repo.update_flow(flow).await?;

        self.history
            .record(FlowHistoryEntry::new(
                flow.id,
                HistoryAction::Scheduled,
                format!("Scheduled '{}' for publication at {}", flow.name, at.to_rfc3339()),
                performed_by,
            ))
            .await?;

        tracing::info!(%flow_id, at = %at, "Flow publication scheduled");
        Ok(flow)
    }

    /// Pending publications, soonest first
    pub async fn list_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledFlow>, FlowError> {
        let filter = FlowFilter {
            status: Some(FlowStatus::Scheduled),
            ..FlowFilter::default()
        };
        let mut scheduled: Vec<ScheduledFlow> = self
            .repo
            .list_flows(&filter)
            .await?
            .into_iter()
            .filter_map(|flow| {
                let at = flow.scheduled_publish_at?;
                Some(ScheduledFlow::new(flow, at, now))
            })
            .collect();
        scheduled.sort_by_key(|s| s.scheduled_publish_at);
        Ok(scheduled)
    }

    /// Publish a scheduled flow ahead of time
    pub async fn publish_now(&self, flow_id: Uuid, performed_by: &str) -> Result<MenuFlow, FlowError> {
        let flow = self.repo.get_flow(flow_id).await?;
        if flow.is_published {
            return Err(FlowError::AlreadyPublished(flow.id));
        }
        if !flow.is_scheduled() {
            return Err(FlowError::NotScheduled(flow.id));
        }
        self.manager.publish(flow.id, performed_by).await
    }

    /// Drop a pending publication
    pub async fn cancel(&self, flow_id: Uuid, performed_by: &str) -> Result<MenuFlow, FlowError> {
        let mut flow = self.repo.get_flow(flow_id).await?;
        if !flow.is_scheduled() {
            return Err(FlowError::NotScheduled(flow.id));
        }

        flow.scheduled_publish_at = None;
        flow.updated_at = Utc::now();
        let flow = self.repo.update_flow(flow).await?;

        self.history
            .record(FlowHistoryEntry::new(
                flow.id,
                HistoryAction::ScheduleCancelled,
                format!("Cancelled scheduled publication of '{}'", flow.name),
                performed_by,
            ))
            .await?;

        tracing::info!(%flow_id, "Scheduled publication cancelled");
        Ok(flow)
    }

    /// Publish every overdue flow. Failures are logged and skipped.
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<Vec<MenuFlow>, FlowError> {
        let mut published = Vec::new();

        for scheduled in self.list_scheduled(now).await? {
            if !scheduled.is_due() {
                continue;
            }
            match self.manager.publish(scheduled.flow.id, SCHEDULER_OPERATOR).await {
                Ok(flow) => published.push(flow),
                Err(e) => tracing::warn!(
                    flow_id = %scheduled.flow.id,
                    error = %e,
                    "Scheduled publication failed"
                ),
            }
        }

        Ok(published)
    }
}
