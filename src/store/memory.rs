//! In-memory repository, optionally mirrored to a JSON snapshot file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FlowRepository, StoreError};
use crate::types::{
    FlowFilter, FlowHistoryEntry, HistoryFilter, MenuFlow, MenuOption, MenuStep, Mno,
    UssdService,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    flows: HashMap<Uuid, MenuFlow>,
    #[serde(default)]
    steps: HashMap<Uuid, MenuStep>,
    #[serde(default)]
    options: HashMap<Uuid, MenuOption>,
    #[serde(default)]
    history: Vec<FlowHistoryEntry>,
    #[serde(default)]
    services: HashMap<Uuid, UssdService>,
    #[serde(default)]
    mnos: HashMap<Uuid, Mno>,
    /// Last step number handed out per flow
    #[serde(default)]
    step_counters: HashMap<Uuid, i32>,
}

impl Tables {
    fn flow_step_ids(&self, flow_id: Uuid) -> Vec<Uuid> {
        self.steps
            .values()
            .filter(|s| s.flow_id == flow_id)
            .map(|s| s.id)
            .collect()
    }

    fn next_step_number(&mut self, flow_id: Uuid) -> i32 {
        let highest_existing = self
            .steps
            .values()
            .filter(|s| s.flow_id == flow_id)
            .map(|s| s.step_number)
            .max()
            .unwrap_or(0);
        let counter = self.step_counters.entry(flow_id).or_insert(0);
        *counter = (*counter).max(highest_existing) + 1;
        *counter
    }

    fn remove_step(&mut self, step_id: Uuid) {
        self.steps.remove(&step_id);
        self.options.retain(|_, o| o.step_id != step_id);

        let now = Utc::now();
        for option in self.options.values_mut() {
            if option.next_step_id == Some(step_id) {
                option.next_step_id = None;
                option.updated_at = now;
            }
        }
        for step in self.steps.values_mut() {
            if step.parent_step_id == Some(step_id) {
                step.parent_step_id = None;
                step.updated_at = now;
            }
        }
    }
}

/// Repository backed by process memory.
///
/// Created with [`InMemoryFlowRepository::persistent`], every mutation also
/// rewrites a JSON snapshot so the tables survive restarts.
#[derive(Clone, Default)]
pub struct InMemoryFlowRepository {
    tables: Arc<RwLock<Tables>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryFlowRepository {
    /// Create an empty, volatile repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a repository mirrored to `path`, loading it if it exists
    pub fn persistent(path: &Path) -> Result<Self, StoreError> {
        let tables = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let tables: Tables = serde_json::from_str(&contents)?;
            tracing::info!(
                path = %path.display(),
                flows = tables.flows.len(),
                steps = tables.steps.len(),
                "Loaded flow store snapshot"
            );
            tables
        } else {
            Tables::default()
        };

        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    /// Snapshot file, if this repository is persistent
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    async fn read<T>(
        &self,
        f: impl FnOnce(&Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tables = self.tables.read().await;
        f(&*tables)
    }

    /// Apply a mutation under the write lock.
    ///
    /// Persistent stores mutate a copy and only swap it in once the snapshot
    /// is on disk, so a failed write leaves the tables untouched.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(path) = &self.snapshot_path else {
            return f(&mut *tables);
        };

        let mut staged = tables.clone();
        let result = f(&mut staged)?;
        let contents = serde_json::to_string_pretty(&staged)?;
        if let Err(e) = tokio::fs::write(path, contents).await {
            tracing::error!(path = %path.display(), error = %e, "Failed to write flow store snapshot");
            return Err(e.into());
        }
        *tables = staged;
        Ok(result)
    }
}

#[async_trait]
impl FlowRepository for InMemoryFlowRepository {
    async fn list_flows(&self, filter: &FlowFilter) -> Result<Vec<MenuFlow>, StoreError> {
        self.read(|t| {
            let mut flows: Vec<MenuFlow> = t
                .flows
                .values()
                .filter(|f| filter.matches(f))
                .cloned()
                .collect();
            flows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
            Ok(flows)
        })
        .await
    }

    async fn get_flow(&self, id: Uuid) -> Result<MenuFlow, StoreError> {
        self.read(|t| {
            t.flows
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("flow", id))
        })
        .await
    }

    async fn insert_flow(&self, flow: MenuFlow) -> Result<MenuFlow, StoreError> {
        self.mutate(|t| {
            if t.flows.contains_key(&flow.id) {
                return Err(StoreError::Conflict(format!("flow '{}' already exists", flow.id)));
            }
            t.flows.insert(flow.id, flow.clone());
            Ok(flow)
        })
        .await
    }

    async fn update_flow(&self, flow: MenuFlow) -> Result<MenuFlow, StoreError> {
        self.mutate(|t| {
            let slot = t
                .flows
                .get_mut(&flow.id)
                .ok_or_else(|| StoreError::not_found("flow", flow.id))?;
            *slot = flow.clone();
            Ok(flow)
        })
        .await
    }

    async fn delete_flow(&self, id: Uuid) -> Result<(), StoreError> {
        self.mutate(|t| {
            if t.flows.remove(&id).is_none() {
                return Err(StoreError::not_found("flow", id));
            }
            for step_id in t.flow_step_ids(id) {
                t.remove_step(step_id);
            }
            t.step_counters.remove(&id);
            Ok(())
        })
        .await
    }

    async fn list_steps(&self, flow_id: Uuid) -> Result<Vec<MenuStep>, StoreError> {
        self.read(|t| {
            let mut steps: Vec<MenuStep> = t
                .steps
                .values()
                .filter(|s| s.flow_id == flow_id)
                .cloned()
                .collect();
            steps.sort_by_key(|s| (s.step_number, s.created_at));
            Ok(steps)
        })
        .await
    }

    async fn get_step(&self, id: Uuid) -> Result<MenuStep, StoreError> {
        self.read(|t| {
            t.steps
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("step", id))
        })
        .await
    }

    async fn insert_step(&self, mut step: MenuStep) -> Result<MenuStep, StoreError> {
        self.mutate(|t| {
            if !t.flows.contains_key(&step.flow_id) {
                return Err(StoreError::not_found("flow", step.flow_id));
            }
            if t.steps.contains_key(&step.id) {
                return Err(StoreError::Conflict(format!("step '{}' already exists", step.id)));
            }
            step.step_number = t.next_step_number(step.flow_id);
            t.steps.insert(step.id, step.clone());
            Ok(step)
        })
        .await
    }

    async fn update_step(&self, step: MenuStep) -> Result<MenuStep, StoreError> {
        self.mutate(|t| {
            let slot = t
                .steps
                .get_mut(&step.id)
                .ok_or_else(|| StoreError::not_found("step", step.id))?;
            *slot = step.clone();
            Ok(step)
        })
        .await
    }

    async fn delete_step(&self, id: Uuid) -> Result<(), StoreError> {
        self.mutate(|t| {
            if !t.steps.contains_key(&id) {
                return Err(StoreError::not_found("step", id));
            }
            t.remove_step(id);
            Ok(())
        })
        .await
    }

    async fn list_options(&self, step_id: Uuid) -> Result<Vec<MenuOption>, StoreError> {
        self.read(|t| {
            let mut options: Vec<MenuOption> = t
                .options
                .values()
                .filter(|o| o.step_id == step_id)
                .cloned()
                .collect();
            options.sort_by_key(|o| (o.option_number, o.created_at));
            Ok(options)
        })
        .await
    }

    async fn list_flow_options(&self, flow_id: Uuid) -> Result<Vec<MenuOption>, StoreError> {
        self.read(|t| {
            let mut options: Vec<(i32, MenuOption)> = t
                .options
                .values()
                .filter_map(|o| {
                    t.steps
                        .get(&o.step_id)
                        .filter(|s| s.flow_id == flow_id)
                        .map(|s| (s.step_number, o.clone()))
                })
                .collect();
            options.sort_by_key(|(n, o)| (*n, o.option_number, o.created_at));
            Ok(options.into_iter().map(|(_, o)| o).collect())
        })
        .await
    }

    async fn get_option(&self, id: Uuid) -> Result<MenuOption, StoreError> {
        self.read(|t| {
            t.options
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("option", id))
        })
        .await
    }

    async fn insert_option(&self, option: MenuOption) -> Result<MenuOption, StoreError> {
        self.mutate(|t| {
            if !t.steps.contains_key(&option.step_id) {
                return Err(StoreError::not_found("step", option.step_id));
            }
            if t.options.contains_key(&option.id) {
                return Err(StoreError::Conflict(format!(
                    "option '{}' already exists",
                    option.id
                )));
            }
            t.options.insert(option.id, option.clone());
            Ok(option)
        })
        .await
    }

    async fn update_option(&self, option: MenuOption) -> Result<MenuOption, StoreError> {
        self.mutate(|t| {
            let slot = t
                .options
                .get_mut(&option.id)
                .ok_or_else(|| StoreError::not_found("option", option.id))?;
            *slot = option.clone();
            Ok(option)
        })
        .await
    }

    async fn delete_option(&self, id: Uuid) -> Result<(), StoreError> {
        self.mutate(|t| {
            t.options
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("option", id))
        })
        .await
    }

    async fn append_history(
        &self,
        entry: FlowHistoryEntry,
    ) -> Result<FlowHistoryEntry, StoreError> {
        self.mutate(|t| {
            t.history.push(entry.clone());
            Ok(entry)
        })
        .await
    }

    async fn list_history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<Vec<FlowHistoryEntry>, StoreError> {
        self.read(|t| {
            // Appended in order, so reverse iteration is newest first
            let rows = t.history.iter().rev().filter(|e| filter.matches(e)).cloned();
            Ok(match filter.limit {
                Some(limit) => rows.take(limit).collect(),
                None => rows.collect(),
            })
        })
        .await
    }

    async fn list_services(&self) -> Result<Vec<UssdService>, StoreError> {
        self.read(|t| {
            let mut services: Vec<UssdService> = t.services.values().cloned().collect();
            services.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(services)
        })
        .await
    }

    async fn get_service(&self, id: Uuid) -> Result<UssdService, StoreError> {
        self.read(|t| {
            t.services
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("service", id))
        })
        .await
    }

    async fn insert_service(&self, service: UssdService) -> Result<UssdService, StoreError> {
        self.mutate(|t| {
            if t.services.values().any(|s| s.ussd_code == service.ussd_code) {
                return Err(StoreError::Conflict(format!(
                    "USSD code '{}' is already assigned",
                    service.ussd_code
                )));
            }
            t.services.insert(service.id, service.clone());
            Ok(service)
        })
        .await
    }

    async fn list_mnos(&self) -> Result<Vec<Mno>, StoreError> {
        self.read(|t| {
            let mut mnos: Vec<Mno> = t.mnos.values().cloned().collect();
            mnos.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(mnos)
        })
        .await
    }

    async fn get_mno(&self, id: Uuid) -> Result<Mno, StoreError> {
        self.read(|t| {
            t.mnos
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("mno", id))
        })
        .await
    }

    async fn insert_mno(&self, mno: Mno) -> Result<Mno, StoreError> {
        self.mutate(|t| {
            t.mnos.insert(mno.id, mno.clone());
            Ok(mno)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HistoryAction, ResponseType};
    use tempfile::TempDir;

    async fn repo_with_flow() -> (InMemoryFlowRepository, MenuFlow) {
        let repo = InMemoryFlowRepository::new();
        let flow = MenuFlow::draft("Main", Uuid::new_v4(), "en", "test");
        let flow = repo.insert_flow(flow).await.unwrap();
        (repo, flow)
    }

    #[tokio::test]
    async fn test_step_numbers_are_monotonic() {
        let (repo, flow) = repo_with_flow().await;

        let a = repo
            .insert_step(MenuStep::new(flow.id, "a", "A", ResponseType::Selection))
            .await
            .unwrap();
        let b = repo
            .insert_step(MenuStep::new(flow.id, "b", "B", ResponseType::Input))
            .await
            .unwrap();
        assert_eq!((a.step_number, b.step_number), (1, 2));

        repo.delete_step(b.id).await.unwrap();
        let c = repo
            .insert_step(MenuStep::new(flow.id, "c", "C", ResponseType::End))
            .await
            .unwrap();
        assert_eq!(c.step_number, 3, "deleted numbers are not reused");
    }

    #[tokio::test]
    async fn test_insert_step_requires_flow() {
        let repo = InMemoryFlowRepository::new();
        let result = repo
            .insert_step(MenuStep::new(Uuid::new_v4(), "a", "A", ResponseType::End))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "flow", .. })));
    }

    #[tokio::test]
    async fn test_delete_step_clears_references() {
        let (repo, flow) = repo_with_flow().await;
        let main = repo
            .insert_step(MenuStep::new(flow.id, "main", "Menu", ResponseType::Selection))
            .await
            .unwrap();
        let mut child = MenuStep::new(flow.id, "bye", "Bye", ResponseType::End);
        child.parent_step_id = Some(main.id);
        let child = repo.insert_step(child).await.unwrap();

        let to_child = repo
            .insert_option(MenuOption::new(main.id, 1, "Exit", Some(child.id)))
            .await
            .unwrap();
        let own = repo
            .insert_option(MenuOption::new(child.id, 1, "Ignored", None))
            .await
            .unwrap();

        repo.delete_step(child.id).await.unwrap();

        let to_child = repo.get_option(to_child.id).await.unwrap();
        assert_eq!(to_child.next_step_id, None);
        assert!(repo.get_option(own.id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_flow_cascades_but_keeps_history() {
        let (repo, flow) = repo_with_flow().await;
        let step = repo
            .insert_step(MenuStep::new(flow.id, "main", "Menu", ResponseType::Selection))
            .await
            .unwrap();
        repo.insert_option(MenuOption::new(step.id, 1, "Balance", None))
            .await
            .unwrap();
        repo.append_history(FlowHistoryEntry::new(
            flow.id,
            HistoryAction::Created,
            "created",
            "test",
        ))
        .await
        .unwrap();

        repo.delete_flow(flow.id).await.unwrap();

        assert!(repo.list_steps(flow.id).await.unwrap().is_empty());
        assert!(repo.list_flow_options(flow.id).await.unwrap().is_empty());
        let history = repo
            .list_history(&HistoryFilter::for_flow(flow.id))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_newest_first_with_limit() {
        let (repo, flow) = repo_with_flow().await;
        for action in [
            HistoryAction::Created,
            HistoryAction::Updated,
            HistoryAction::Published,
        ] {
            repo.append_history(FlowHistoryEntry::new(flow.id, action, "x", "test"))
                .await
                .unwrap();
        }

        let rows = repo
            .list_history(&HistoryFilter {
                limit: Some(2),
                ..HistoryFilter::for_flow(flow.id)
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].action, HistoryAction::Published);
        assert_eq!(rows[1].action, HistoryAction::Updated);
    }

    #[tokio::test]
    async fn test_duplicate_ussd_code_conflicts() {
        let repo = InMemoryFlowRepository::new();
        repo.insert_service(UssdService::new("Wallet", "*384#"))
            .await
            .unwrap();
        let result = repo
            .insert_service(UssdService::new("Other", "*384#"))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_persistent_store_reloads_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flows.json");

        let flow_id = {
            let repo = InMemoryFlowRepository::persistent(&path).unwrap();
            let flow = MenuFlow::draft("Main", Uuid::new_v4(), "en", "test");
            let flow = repo.insert_flow(flow).await.unwrap();
            repo.insert_step(MenuStep::new(flow.id, "main", "Menu", ResponseType::End))
                .await
                .unwrap();
            flow.id
        };

        assert!(path.exists());
        let reopened = InMemoryFlowRepository::persistent(&path).unwrap();
        assert_eq!(reopened.get_flow(flow_id).await.unwrap().name, "Main");
        let step = reopened
            .insert_step(MenuStep::new(flow_id, "next", "Next", ResponseType::End))
            .await
            .unwrap();
        assert_eq!(step.step_number, 2);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_tables_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flows.json");
        let repo = InMemoryFlowRepository::persistent(&path).unwrap();
        let kept = repo
            .insert_flow(MenuFlow::draft("Kept", Uuid::new_v4(), "en", "test"))
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let lost = MenuFlow::draft("Lost", Uuid::new_v4(), "en", "test");
        let result = repo.insert_flow(lost.clone()).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(repo.get_flow(lost.id).await.is_err());
        assert!(repo.get_flow(kept.id).await.is_ok());

        let mut renamed = kept.clone();
        renamed.name = "Renamed".to_string();
        assert!(repo.update_flow(renamed).await.is_err());
        assert_eq!(repo.get_flow(kept.id).await.unwrap().name, "Kept");
    }
}
