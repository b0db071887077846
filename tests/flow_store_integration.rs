//! Integration tests for the file-backed flow store
//!
//! Seeds a flow into a snapshot file, reopens it and drives the
//! editor, simulator and scheduler against the reloaded data.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use menuflow::config::FlowsConfig;
use menuflow::flows::{sample, FlowManager, ScheduleManager, StepEditor};
use menuflow::history::HistoryLog;
use menuflow::simulator::{PreviewSimulator, SimulatorState};
use menuflow::store::{FlowRepository, InMemoryFlowRepository};
use menuflow::types::{HistoryAction, HistoryFilter};

struct Services {
    repo: Arc<dyn FlowRepository>,
    manager: FlowManager,
    editor: StepEditor,
}

fn open(dir: &TempDir) -> Services {
    let path = dir.path().join("flows.json");
    let repo: Arc<dyn FlowRepository> =
        Arc::new(InMemoryFlowRepository::persistent(&path).expect("open store"));
    Services {
        manager: FlowManager::new(repo.clone(), FlowsConfig::default()),
        editor: StepEditor::new(repo.clone()),
        repo,
    }
}

#[tokio::test]
async fn test_seeded_flow_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let flow_id = {
        let s = open(&dir);
        let summary = sample::seed(s.repo.clone(), &s.manager, &s.editor, "ops")
            .await
            .unwrap();
        summary.flow.id
    };
    assert!(dir.path().join("flows.json").exists());

    let s = open(&dir);
    let flow = s.manager.get(flow_id).await.unwrap();
    assert_eq!(flow.name, "DAPAY Main Menu");
    assert_eq!(s.editor.list_steps(flow_id).await.unwrap().len(), 5);

    let graph = s.editor.load_graph(flow_id).await.unwrap();
    assert!(graph.validate().is_valid());

    let mut sim = PreviewSimulator::new(graph);
    sim.start().unwrap();
    sim.submit("1").unwrap();
    sim.submit("0712345678").unwrap();
    assert_eq!(sim.state(), SimulatorState::Ended);
    assert_eq!(sim.history().last().unwrap().input.as_deref(), Some("0712345678"));
}

#[tokio::test]
async fn test_due_flow_is_published_after_reopen() {
    let dir = TempDir::new().unwrap();
    let flow_id = {
        let s = open(&dir);
        let summary = sample::seed(s.repo.clone(), &s.manager, &s.editor, "ops")
            .await
            .unwrap();
        let schedule = ScheduleManager::new(s.repo.clone(), s.manager.clone());
        schedule
            .schedule(summary.flow.id, Utc::now() + Duration::hours(2), "ops")
            .await
            .unwrap();
        summary.flow.id
    };

    let s = open(&dir);
    let schedule = ScheduleManager::new(s.repo.clone(), s.manager.clone());
    assert_eq!(schedule.list_scheduled(Utc::now()).await.unwrap().len(), 1);
    assert!(schedule.publish_due(Utc::now()).await.unwrap().is_empty());

    let published = schedule
        .publish_due(Utc::now() + Duration::hours(3))
        .await
        .unwrap();
    assert_eq!(published.len(), 1);
    assert!(published[0].is_published);
    assert!(schedule.list_scheduled(Utc::now()).await.unwrap().is_empty());

    let history = HistoryLog::new(s.repo.clone());
    let rows = history
        .list(&HistoryFilter {
            flow_id: Some(flow_id),
            action: Some(HistoryAction::Published),
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].performed_by, "scheduler");
}
