//! API state management for the REST server.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;

use crate::config::Config;
use crate::flows::{FlowManager, ScheduleManager, StepEditor};
use crate::history::HistoryLog;
use crate::rest::sessions::PreviewSessions;
use crate::store::{FlowRepository, InMemoryFlowRepository};

/// Header naming the dashboard user behind a request
pub const OPERATOR_HEADER: &str = "x-operator";

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    pub repo: Arc<dyn FlowRepository>,
    pub config: Arc<Config>,
    pub flows: FlowManager,
    pub editor: StepEditor,
    pub schedule: ScheduleManager,
    pub history: HistoryLog,
    pub previews: PreviewSessions,
}

impl ApiState {
    /// Create API state over a repository
    pub fn new(config: Config, repo: Arc<dyn FlowRepository>) -> Self {
        let flows = FlowManager::new(repo.clone(), config.flows.clone());
        let editor =
            StepEditor::new(repo.clone()).with_default_timeout(config.flows.default_timeout_seconds);
        let schedule = ScheduleManager::new(repo.clone(), flows.clone());
        let previews =
            PreviewSessions::new(Duration::from_secs(config.simulator.session_ttl_secs));

        Self {
            history: HistoryLog::new(repo.clone()),
            repo,
            config: Arc::new(config),
            flows,
            editor,
            schedule,
            previews,
        }
    }

    /// State over a fresh volatile store
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(InMemoryFlowRepository::new()))
    }

    /// Acting operator from the request headers, else the configured default
    pub fn operator(&self, headers: &HeaderMap) -> String {
        headers
            .get(OPERATOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.api.default_operator.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_operator_from_header() {
        let state = ApiState::in_memory(Config::default());
        let mut headers = HeaderMap::new();
        headers.insert(OPERATOR_HEADER, HeaderValue::from_static(" amina "));

        assert_eq!(state.operator(&headers), "amina");
    }

    #[test]
    fn test_operator_falls_back_to_default() {
        let mut config = Config::default();
        config.api.default_operator = "dashboard".to_string();
        let state = ApiState::in_memory(config);

        assert_eq!(state.operator(&HeaderMap::new()), "dashboard");
    }

    #[tokio::test]
    async fn test_no_preview_sessions_initially() {
        let state = ApiState::in_memory(Config::default());
        assert!(state.previews.is_empty().await);
    }

    #[test]
    fn test_preview_ttl_from_config() {
        let mut config = Config::default();
        config.simulator.session_ttl_secs = 120;
        let state = ApiState::in_memory(config);
        assert_eq!(state.previews.ttl(), Duration::from_secs(120));
    }
}
