//! Flow lifecycle: create, edit, activate, publish, duplicate, delete.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{load_graph, required, FlowError};
use crate::config::FlowsConfig;
use crate::history::HistoryLog;
use crate::store::FlowRepository;
use crate::types::{FlowFilter, FlowHistoryEntry, FlowStatus, HistoryAction, MenuFlow};

/// Fields for a new flow
#[derive(Debug, Clone, Default)]
pub struct NewFlow {
    pub name: String,
    pub service_id: Uuid,
    pub description: Option<String>,
    /// Falls back to `flows.default_language`
    pub language: Option<String>,
}

/// Partial update of a flow's descriptive fields
#[derive(Debug, Clone, Default)]
pub struct FlowUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub service_id: Option<Uuid>,
}

impl FlowUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.language.is_none()
            && self.service_id.is_none()
    }
}

/// Flow lifecycle operations, each writing its audit row
#[derive(Clone)]
pub struct FlowManager {
    repo: Arc<dyn FlowRepository>,
    history: HistoryLog,
    config: FlowsConfig,
}

impl FlowManager {
    pub fn new(repo: Arc<dyn FlowRepository>, config: FlowsConfig) -> Self {
        Self {
            history: HistoryLog::new(repo.clone()),
            repo,
            config,
        }
    }

    pub async fn list(&self, filter: &FlowFilter) -> Result<Vec<MenuFlow>, FlowError> {
        Ok(self.repo.list_flows(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<MenuFlow, FlowError> {
        Ok(self.repo.get_flow(id).await?)
    }

    /// Create a draft flow for an existing service
    pub async fn create(&self, new: NewFlow, performed_by: &str) -> Result<MenuFlow, FlowError> {
        let name = required("name", &new.name)?;
        self.repo.get_service(new.service_id).await?;

        let language = new
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.config.default_language.clone());

        let mut flow = MenuFlow::draft(name, new.service_id, language, performed_by);
        flow.description = new.description.unwrap_or_default();
        let flow = self.repo.insert_flow(flow).await?;

        self.history
            .record(
                FlowHistoryEntry::new(
                    flow.id,
                    HistoryAction::Created,
                    format!("Created flow '{}'", flow.name),
                    performed_by,
                )
                .with_versions(None, Some(flow.version)),
            )
            .await?;

        tracing::info!(flow_id = %flow.id, name = %flow.name, "Flow created");
        Ok(flow)
    }

    /// Patch descriptive fields. The version is not bumped.
    pub async fn update(
        &self,
        id: Uuid,
        update: FlowUpdate,
        performed_by: &str,
    ) -> Result<MenuFlow, FlowError> {
        let mut flow = self.repo.get_flow(id).await?;

        if let Some(name) = update.name {
            flow.name = required("name", &name)?;
        }
        if let Some(description) = update.description {
            flow.description = description;
        }
        if let Some(language) = update.language {
            flow.language = required("language", &language)?;
        }
        if let Some(service_id) = update.service_id {
            self.repo.get_service(service_id).await?;
            flow.service_id = service_id;
        }
        flow.updated_at = Utc::now();

        let flow = self.repo.update_flow(flow).await?;
        self.history
            .record(FlowHistoryEntry::new(
                flow.id,
                HistoryAction::Updated,
                format!("Updated flow '{}'", flow.name),
                performed_by,
            ))
            .await?;

        Ok(flow)
    }

    /// Flip `is_active`
    pub async fn toggle_active(&self, id: Uuid, performed_by: &str) -> Result<MenuFlow, FlowError> {
        let mut flow = self.repo.get_flow(id).await?;
        flow.is_active = !flow.is_active;
        flow.updated_at = Utc::now();
        let flow = self.repo.update_flow(flow).await?;

        let action = if flow.is_active {
            HistoryAction::Activated
        } else {
            HistoryAction::Deactivated
        };
        self.history
            .record(FlowHistoryEntry::new(
                flow.id,
                action,
                format!("Flow '{}' {}", flow.name, action),
                performed_by,
            ))
            .await?;

        if flow.is_active {
            self.resolve_concurrent_active(&flow, performed_by).await?;
        }

        tracing::info!(flow_id = %flow.id, active = flow.is_active, "Flow activation toggled");
        Ok(flow)
    }

    /// Deal with other live flows of the same service after an activation
    async fn resolve_concurrent_active(
        &self,
        flow: &MenuFlow,
        performed_by: &str,
    ) -> Result<(), FlowError> {
        let filter = FlowFilter {
            service_id: Some(flow.service_id),
            status: Some(FlowStatus::Active),
        };
        let others: Vec<MenuFlow> = self
            .repo
            .list_flows(&filter)
            .await?
            .into_iter()
            .filter(|other| other.id != flow.id)
            .collect();

        if others.is_empty() {
            return Ok(());
        }

        if !self.config.exclusive_activation {
            tracing::warn!(
                flow_id = %flow.id,
                service_id = %flow.service_id,
                other_active = others.len(),
                "Service now has more than one active flow"
            );
            return Ok(());
        }

        for mut other in others {
            other.is_active = false;
            other.updated_at = Utc::now();
            let other = self.repo.update_flow(other).await?;
            self.history
                .record(FlowHistoryEntry::new(
                    other.id,
                    HistoryAction::Deactivated,
                    format!("Flow '{}' deactivated: '{}' was activated", other.name, flow.name),
                    performed_by,
                ))
                .await?;
            tracing::info!(flow_id = %other.id, "Deactivated superseded flow");
        }
        Ok(())
    }

    /// Validate the graph and mark the flow published
    pub async fn publish(&self, id: Uuid, performed_by: &str) -> Result<MenuFlow, FlowError> {
        let mut flow = self.repo.get_flow(id).await?;
        if flow.is_published {
            return Err(FlowError::AlreadyPublished(flow.id));
        }

        let report = load_graph(self.repo.as_ref(), flow.id).await?.validate();
        if !report.is_valid() {
            return Err(FlowError::InvalidGraph(report.errors));
        }
        for warning in &report.warnings {
            tracing::warn!(flow_id = %flow.id, issue = warning.kind(), "{}", warning);
        }

        flow.is_published = true;
        flow.scheduled_publish_at = None;
        flow.updated_at = Utc::now();
        let flow = self.repo.update_flow(flow).await?;

        self.history
            .record(
                FlowHistoryEntry::new(
                    flow.id,
                    HistoryAction::Published,
                    format!("Published '{}' version {}", flow.name, flow.version),
                    performed_by,
                )
                .with_versions(None, Some(flow.version)),
            )
            .await?;

        tracing::info!(flow_id = %flow.id, version = flow.version, "Flow published");
        Ok(flow)
    }

    /// Copy the flow record into a new inactive draft one version up.
    ///
    /// Steps and options stay with the source flow.
    pub async fn duplicate(&self, id: Uuid, performed_by: &str) -> Result<MenuFlow, FlowError> {
        let source = self.repo.get_flow(id).await?;
        let siblings = FlowFilter {
            service_id: Some(source.service_id),
            ..Default::default()
        };
        // Copies take the next unused version within the service
        let latest = self
            .repo
            .list_flows(&siblings)
            .await?
            .iter()
            .map(|flow| flow.version)
            .fold(source.version, i32::max);

        let mut copy = MenuFlow::draft(
            format!("{} (Copy)", source.name),
            source.service_id,
            source.language.clone(),
            performed_by,
        );
        copy.description = source.description.clone();
        copy.version = latest + 1;
        let copy = self.repo.insert_flow(copy).await?;

        self.history
            .record(
                FlowHistoryEntry::new(
                    copy.id,
                    HistoryAction::Created,
                    format!(
                        "Duplicated from '{}' ({}) version {}",
                        source.name, source.id, source.version
                    ),
                    performed_by,
                )
                .with_versions(Some(source.version), Some(copy.version)),
            )
            .await?;

        tracing::info!(source = %source.id, copy = %copy.id, "Flow duplicated");
        Ok(copy)
    }

    /// Hard delete. History rows for the flow are kept.
    pub async fn delete(&self, id: Uuid) -> Result<(), FlowError> {
        self.repo.delete_flow(id).await?;
        tracing::info!(flow_id = %id, "Flow deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryFlowRepository;
    use crate::types::{HistoryFilter, MenuOption, MenuStep, ResponseType, UssdService};

    struct Fixture {
        repo: Arc<dyn FlowRepository>,
        manager: FlowManager,
        service: UssdService,
    }

    async fn fixture(config: FlowsConfig) -> Fixture {
        let repo: Arc<dyn FlowRepository> = Arc::new(InMemoryFlowRepository::new());
        let service = repo
            .insert_service(UssdService::new("DAPAY Wallet", "*150*88#"))
            .await
            .unwrap();
        Fixture {
            manager: FlowManager::new(repo.clone(), config),
            repo,
            service,
        }
    }

    async fn create(f: &Fixture, name: &str) -> MenuFlow {
        f.manager
            .create(
                NewFlow {
                    name: name.to_string(),
                    service_id: f.service.id,
                    ..Default::default()
                },
                "ops",
            )
            .await
            .unwrap()
    }

    async fn actions(f: &Fixture, flow_id: Uuid) -> Vec<HistoryAction> {
        f.repo
            .list_history(&HistoryFilter::for_flow(flow_id))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect()
    }

    #[tokio::test]
    async fn test_create_defaults_and_history() {
        let f = fixture(FlowsConfig::default()).await;
        let flow = create(&f, "  Main menu ").await;

        assert_eq!(flow.name, "Main menu");
        assert_eq!(flow.language, "en");
        assert_eq!(flow.version, 1);
        assert!(!flow.is_active && !flow.is_published);
        assert_eq!(flow.created_by, "ops");
        assert_eq!(actions(&f, flow.id).await, vec![HistoryAction::Created]);
    }

    #[tokio::test]
    async fn test_create_requires_name_and_service() {
        let f = fixture(FlowsConfig::default()).await;

        let err = f
            .manager
            .create(
                NewFlow {
                    name: "  ".into(),
                    service_id: f.service.id,
                    ..Default::default()
                },
                "ops",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::MissingField("name")));

        let err = f
            .manager
            .create(
                NewFlow {
                    name: "Orphan".into(),
                    service_id: Uuid::new_v4(),
                    ..Default::default()
                },
                "ops",
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_keeps_version() {
        let f = fixture(FlowsConfig::default()).await;
        let flow = create(&f, "Main menu").await;

        let updated = f
            .manager
            .update(
                flow.id,
                FlowUpdate {
                    language: Some("sw".into()),
                    description: Some("Swahili menu".into()),
                    ..Default::default()
                },
                "ops",
            )
            .await
            .unwrap();

        assert_eq!(updated.language, "sw");
        assert_eq!(updated.version, flow.version);
        assert_eq!(
            actions(&f, flow.id).await,
            vec![HistoryAction::Updated, HistoryAction::Created]
        );
    }

    #[tokio::test]
    async fn test_toggle_active_records_both_directions() {
        let f = fixture(FlowsConfig::default()).await;
        let flow = create(&f, "Main menu").await;

        assert!(f.manager.toggle_active(flow.id, "ops").await.unwrap().is_active);
        assert!(!f.manager.toggle_active(flow.id, "ops").await.unwrap().is_active);
        assert_eq!(
            actions(&f, flow.id).await,
            vec![
                HistoryAction::Deactivated,
                HistoryAction::Activated,
                HistoryAction::Created
            ]
        );
    }

    #[tokio::test]
    async fn test_multiple_active_flows_allowed_by_default() {
        let f = fixture(FlowsConfig::default()).await;
        let a = create(&f, "A").await;
        let b = create(&f, "B").await;

        f.manager.toggle_active(a.id, "ops").await.unwrap();
        f.manager.toggle_active(b.id, "ops").await.unwrap();

        assert!(f.manager.get(a.id).await.unwrap().is_active);
        assert!(f.manager.get(b.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_exclusive_activation_deactivates_others() {
        let config = FlowsConfig {
            exclusive_activation: true,
            ..FlowsConfig::default()
        };
        let f = fixture(config).await;
        let a = create(&f, "A").await;
        let b = create(&f, "B").await;

        f.manager.toggle_active(a.id, "ops").await.unwrap();
        f.manager.toggle_active(b.id, "ops").await.unwrap();

        assert!(!f.manager.get(a.id).await.unwrap().is_active);
        assert!(f.manager.get(b.id).await.unwrap().is_active);
        assert_eq!(actions(&f, a.id).await[0], HistoryAction::Deactivated);
    }

    #[tokio::test]
    async fn test_publish_requires_valid_graph() {
        let f = fixture(FlowsConfig::default()).await;
        let flow = create(&f, "Main menu").await;

        let err = f.manager.publish(flow.id, "ops").await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidGraph(_)));
        assert!(!f.manager.get(flow.id).await.unwrap().is_published);
    }

    #[tokio::test]
    async fn test_publish_once() {
        let f = fixture(FlowsConfig::default()).await;
        let flow = create(&f, "Main menu").await;
        let main = f
            .repo
            .insert_step(MenuStep::new(flow.id, "main", "Welcome", ResponseType::Selection).initial())
            .await
            .unwrap();
        f.repo
            .insert_option(MenuOption::new(main.id, 1, "Exit", None))
            .await
            .unwrap();

        let published = f.manager.publish(flow.id, "ops").await.unwrap();
        assert!(published.is_published);

        let err = f.manager.publish(flow.id, "ops").await.unwrap_err();
        assert!(matches!(err, FlowError::AlreadyPublished(id) if id == flow.id));

        let history = f
            .repo
            .list_history(&HistoryFilter::for_flow(flow.id))
            .await
            .unwrap();
        assert_eq!(history[0].action, HistoryAction::Published);
        assert_eq!(history[0].new_version, Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_is_inactive_copy() {
        let f = fixture(FlowsConfig::default()).await;
        let source = create(&f, "Main menu").await;
        f.manager.toggle_active(source.id, "ops").await.unwrap();
        f.repo
            .insert_step(MenuStep::new(source.id, "main", "Welcome", ResponseType::End))
            .await
            .unwrap();

        let copy = f.manager.duplicate(source.id, "auditor").await.unwrap();

        assert_ne!(copy.id, source.id);
        assert_eq!(copy.name, "Main menu (Copy)");
        assert!(!copy.is_active);
        assert!(!copy.is_published);
        assert!(copy.scheduled_publish_at.is_none());
        assert_eq!(copy.version, source.version + 1);
        assert_eq!(copy.service_id, source.service_id);
        assert!(f.repo.list_steps(copy.id).await.unwrap().is_empty());

        let history = f
            .repo
            .list_history(&HistoryFilter::for_flow(copy.id))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, HistoryAction::Created);
        assert!(history[0].description.contains("Main menu"));
    }

    #[tokio::test]
    async fn test_repeated_duplicates_get_distinct_versions() {
        let f = fixture(FlowsConfig::default()).await;
        let source = create(&f, "Main menu").await;

        let first = f.manager.duplicate(source.id, "ops").await.unwrap();
        let second = f.manager.duplicate(source.id, "ops").await.unwrap();
        assert_eq!(first.version, source.version + 1);
        assert_eq!(second.version, source.version + 2);

        let copy_of_copy = f.manager.duplicate(first.id, "ops").await.unwrap();
        assert_eq!(copy_of_copy.version, second.version + 1);
    }

    #[tokio::test]
    async fn test_delete_keeps_history() {
        let f = fixture(FlowsConfig::default()).await;
        let flow = create(&f, "Main menu").await;

        f.manager.delete(flow.id).await.unwrap();

        assert!(f.manager.get(flow.id).await.unwrap_err().is_not_found());
        assert_eq!(actions(&f, flow.id).await, vec![HistoryAction::Created]);
    }
}
