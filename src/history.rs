//! Append-only audit trail of flow lifecycle actions.

use std::sync::Arc;

use uuid::Uuid;

use crate::flows::FlowError;
use crate::store::FlowRepository;
use crate::types::{FlowHistoryEntry, HistoryAction, HistoryFilter};

/// Reads and writes flow history rows
#[derive(Clone)]
pub struct HistoryLog {
    repo: Arc<dyn FlowRepository>,
}

impl HistoryLog {
    pub fn new(repo: Arc<dyn FlowRepository>) -> Self {
        Self { repo }
    }

    /// Rows matching the filter, newest first
    pub async fn list(&self, filter: &HistoryFilter) -> Result<Vec<FlowHistoryEntry>, FlowError> {
        Ok(self.repo.list_history(filter).await?)
    }

    /// Append a row
    pub async fn record(&self, entry: FlowHistoryEntry) -> Result<FlowHistoryEntry, FlowError> {
        tracing::debug!(
            flow_id = %entry.flow_id,
            action = %entry.action,
            performed_by = %entry.performed_by,
            "Recording flow history"
        );
        Ok(self.repo.append_history(entry).await?)
    }

    /// Record a rollback to an earlier version.
    ///
    /// Only the audit row is written; steps and options are left untouched.
    pub async fn rollback(
        &self,
        flow_id: Uuid,
        target_version: i32,
        performed_by: &str,
    ) -> Result<FlowHistoryEntry, FlowError> {
        let flow = self.repo.get_flow(flow_id).await?;
        if !(1..flow.version).contains(&target_version) {
            return Err(FlowError::InvalidRollbackTarget {
                current: flow.version,
                target: target_version,
            });
        }

        let entry = FlowHistoryEntry::new(
            flow.id,
            HistoryAction::RolledBack,
            format!("Rolled back '{}' to version {}", flow.name, target_version),
            performed_by,
        )
        .with_versions(Some(flow.version), Some(target_version));

        tracing::info!(%flow_id, from = flow.version, to = target_version, "Flow rollback recorded");
        self.record(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryFlowRepository;
    use crate::types::MenuFlow;

    async fn setup(version: i32) -> (HistoryLog, Arc<dyn FlowRepository>, MenuFlow) {
        let repo: Arc<dyn FlowRepository> = Arc::new(InMemoryFlowRepository::new());
        let mut flow = MenuFlow::draft("Main menu", Uuid::new_v4(), "en", "ops");
        flow.version = version;
        let flow = repo.insert_flow(flow).await.unwrap();
        (HistoryLog::new(repo.clone()), repo, flow)
    }

    #[tokio::test]
    async fn test_rollback_records_versions_only() {
        let (log, repo, flow) = setup(3).await;

        let entry = log.rollback(flow.id, 2, "ops").await.unwrap();
        assert_eq!(entry.action, HistoryAction::RolledBack);
        assert_eq!(entry.old_version, Some(3));
        assert_eq!(entry.new_version, Some(2));

        // The flow itself is unchanged
        let reloaded = repo.get_flow(flow.id).await.unwrap();
        assert_eq!(reloaded.version, 3);
    }

    #[tokio::test]
    async fn test_rollback_target_must_be_earlier() {
        let (log, _, flow) = setup(2).await;

        for target in [0, 2, 5] {
            let err = log.rollback(flow.id, target, "ops").await.unwrap_err();
            assert!(matches!(err, FlowError::InvalidRollbackTarget { current: 2, .. }));
        }
        assert!(log.list(&HistoryFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_unknown_flow() {
        let (log, _, _) = setup(1).await;
        let err = log.rollback(Uuid::new_v4(), 1, "ops").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_action() {
        let (log, _, flow) = setup(1).await;
        log.record(FlowHistoryEntry::new(flow.id, HistoryAction::Created, "c", "ops"))
            .await
            .unwrap();
        log.record(FlowHistoryEntry::new(flow.id, HistoryAction::Updated, "u", "ops"))
            .await
            .unwrap();

        let filter = HistoryFilter {
            action: Some(HistoryAction::Updated),
            ..HistoryFilter::for_flow(flow.id)
        };
        let rows = log.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "u");
    }
}
