//! Flow repository abstraction.
//!
//! Every component receives an `Arc<dyn FlowRepository>` instead of reaching
//! for a shared backend client, so tests can swap in a fresh in-memory store.
//!
//! Each call is atomic on its own. There is no transaction spanning calls:
//! writing a flow and then its history row are two independent operations.

mod memory;

pub use memory::InMemoryFlowRepository;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{Config, StoreBackend};
use crate::types::{
    FlowFilter, FlowHistoryEntry, HistoryFilter, MenuFlow, MenuOption, MenuStep, Mno,
    UssdService,
};

/// Errors returned by a repository implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { entity, id }
    }
}

/// Persistence seam for flows, steps, options, history and reference tables.
#[async_trait]
pub trait FlowRepository: Send + Sync + 'static {
    // ── Flows ────────────────────────────────────────────────────────────────

    /// List flows matching the filter, oldest first
    async fn list_flows(&self, filter: &FlowFilter) -> Result<Vec<MenuFlow>, StoreError>;

    async fn get_flow(&self, id: Uuid) -> Result<MenuFlow, StoreError>;

    /// Insert a new flow. Returns `Conflict` if the id is taken.
    async fn insert_flow(&self, flow: MenuFlow) -> Result<MenuFlow, StoreError>;

    /// Replace an existing flow record
    async fn update_flow(&self, flow: MenuFlow) -> Result<MenuFlow, StoreError>;

    /// Hard delete a flow together with its steps and options.
    ///
    /// History rows for the flow are kept.
    async fn delete_flow(&self, id: Uuid) -> Result<(), StoreError>;

    // ── Steps ────────────────────────────────────────────────────────────────

    /// Steps of a flow ordered by `step_number`
    async fn list_steps(&self, flow_id: Uuid) -> Result<Vec<MenuStep>, StoreError>;

    async fn get_step(&self, id: Uuid) -> Result<MenuStep, StoreError>;

    /// Insert a step.
    ///
    /// `step_number` is assigned from a per-flow monotonic counter; numbers are
    /// never reused, even after deletes. Any number on the input is ignored.
    async fn insert_step(&self, step: MenuStep) -> Result<MenuStep, StoreError>;

    async fn update_step(&self, step: MenuStep) -> Result<MenuStep, StoreError>;

    /// Delete a step and its options; references to it become `None`.
    async fn delete_step(&self, id: Uuid) -> Result<(), StoreError>;

    // ── Options ──────────────────────────────────────────────────────────────

    /// Options of a step ordered by `option_number`
    async fn list_options(&self, step_id: Uuid) -> Result<Vec<MenuOption>, StoreError>;

    /// Every option of every step in a flow (bulk preload)
    async fn list_flow_options(&self, flow_id: Uuid) -> Result<Vec<MenuOption>, StoreError>;

    async fn get_option(&self, id: Uuid) -> Result<MenuOption, StoreError>;

    async fn insert_option(&self, option: MenuOption) -> Result<MenuOption, StoreError>;

    async fn update_option(&self, option: MenuOption) -> Result<MenuOption, StoreError>;

    async fn delete_option(&self, id: Uuid) -> Result<(), StoreError>;

    // ── History ──────────────────────────────────────────────────────────────

    /// Append an audit row. Rows are never updated or deleted.
    async fn append_history(&self, entry: FlowHistoryEntry)
        -> Result<FlowHistoryEntry, StoreError>;

    /// Audit rows matching the filter, newest first
    async fn list_history(&self, filter: &HistoryFilter)
        -> Result<Vec<FlowHistoryEntry>, StoreError>;

    // ── Reference tables ─────────────────────────────────────────────────────

    async fn list_services(&self) -> Result<Vec<UssdService>, StoreError>;

    async fn get_service(&self, id: Uuid) -> Result<UssdService, StoreError>;

    /// Insert a service. Returns `Conflict` if the short code is taken.
    async fn insert_service(&self, service: UssdService) -> Result<UssdService, StoreError>;

    async fn list_mnos(&self) -> Result<Vec<Mno>, StoreError>;

    async fn get_mno(&self, id: Uuid) -> Result<Mno, StoreError>;

    async fn insert_mno(&self, mno: Mno) -> Result<Mno, StoreError>;
}

/// Build the repository selected by configuration
pub fn open(config: &Config) -> Result<Arc<dyn FlowRepository>, StoreError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::debug!("Using in-memory flow store");
            Ok(Arc::new(InMemoryFlowRepository::new()))
        }
        StoreBackend::File => {
            let path = config.store_path();
            tracing::debug!(path = %path.display(), "Using file-backed flow store");
            Ok(Arc::new(open_file(&path)?))
        }
    }
}

fn open_file(path: &Path) -> Result<InMemoryFlowRepository, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    InMemoryFlowRepository::persistent(path)
}
