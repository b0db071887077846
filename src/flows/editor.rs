//! Step and option editing with save-time graph checks.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::graph::{FlowGraph, GraphIssue};
use super::{load_graph, required, FlowError};
use crate::store::FlowRepository;
use crate::types::{MenuOption, MenuStep, ResponseType, DEFAULT_TIMEOUT_SECONDS, MAX_OPTION_NUMBER};

#[derive(Debug, Clone, Default)]
pub struct NewStep {
    pub step_name: String,
    pub menu_text: String,
    pub response_type: ResponseType,
    pub timeout_seconds: Option<i32>,
    pub fallback_message: Option<String>,
    pub parent_step_id: Option<Uuid>,
    pub api_endpoint: Option<String>,
    pub is_initial_step: bool,
}

/// Partial step update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct StepUpdate {
    pub step_name: Option<String>,
    pub menu_text: Option<String>,
    pub response_type: Option<ResponseType>,
    pub timeout_seconds: Option<i32>,
    pub fallback_message: Option<Option<String>>,
    pub parent_step_id: Option<Option<Uuid>>,
    pub api_endpoint: Option<Option<String>>,
    pub is_initial_step: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct NewOption {
    pub option_number: i32,
    pub option_text: String,
    pub option_value: Option<String>,
    pub next_step_id: Option<Uuid>,
    /// Defaults to active
    pub is_active: Option<bool>,
}

/// Partial option update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct OptionUpdate {
    pub option_number: Option<i32>,
    pub option_text: Option<String>,
    pub option_value: Option<Option<String>>,
    pub next_step_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// CRUD on the steps and options of a flow
#[derive(Clone)]
pub struct StepEditor {
    repo: Arc<dyn FlowRepository>,
    default_timeout_seconds: i32,
}

impl StepEditor {
    pub fn new(repo: Arc<dyn FlowRepository>) -> Self {
        Self {
            repo,
            default_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_default_timeout(mut self, seconds: i32) -> Self {
        self.default_timeout_seconds = seconds;
        self
    }

    /// Steps and options of a flow in one graph
    pub async fn load_graph(&self, flow_id: Uuid) -> Result<FlowGraph, FlowError> {
        load_graph(self.repo.as_ref(), flow_id).await
    }

    // ── Steps ────────────────────────────────────────────────────────────────

    pub async fn list_steps(&self, flow_id: Uuid) -> Result<Vec<MenuStep>, FlowError> {
        self.repo.get_flow(flow_id).await?;
        Ok(self.repo.list_steps(flow_id).await?)
    }

    pub async fn get_step(&self, step_id: Uuid) -> Result<MenuStep, FlowError> {
        Ok(self.repo.get_step(step_id).await?)
    }

    pub async fn create_step(&self, flow_id: Uuid, new: NewStep) -> Result<MenuStep, FlowError> {
        let mut step = MenuStep::new(
            flow_id,
            required("step_name", &new.step_name)?,
            required("menu_text", &new.menu_text)?,
            new.response_type,
        );
        step.timeout_seconds = check_timeout(new.timeout_seconds.unwrap_or(self.default_timeout_seconds))?;
        step.fallback_message = non_blank(new.fallback_message);
        step.api_endpoint = non_blank(new.api_endpoint);
        step.is_initial_step = new.is_initial_step;
        if let Some(parent) = new.parent_step_id {
            self.check_parent(flow_id, None, parent).await?;
            step.parent_step_id = Some(parent);
        }

        let step = self.repo.insert_step(step).await?;
        if step.is_initial_step {
            self.clear_other_initial(&step).await?;
        }

        tracing::debug!(flow_id = %flow_id, step_id = %step.id, number = step.step_number, "Step created");
        Ok(step)
    }

    pub async fn update_step(&self, step_id: Uuid, update: StepUpdate) -> Result<MenuStep, FlowError> {
        let mut step = self.repo.get_step(step_id).await?;

        if let Some(name) = update.step_name {
            step.step_name = required("step_name", &name)?;
        }
        if let Some(text) = update.menu_text {
            step.menu_text = required("menu_text", &text)?;
        }
        if let Some(response_type) = update.response_type {
            step.response_type = response_type;
        }
        if let Some(timeout) = update.timeout_seconds {
            step.timeout_seconds = check_timeout(timeout)?;
        }
        if let Some(fallback) = update.fallback_message {
            step.fallback_message = non_blank(fallback);
        }
        if let Some(endpoint) = update.api_endpoint {
            step.api_endpoint = non_blank(endpoint);
        }
        if let Some(parent) = update.parent_step_id {
            if let Some(parent) = parent {
                self.check_parent(step.flow_id, Some(step.id), parent).await?;
            }
            step.parent_step_id = parent;
        }
        if let Some(initial) = update.is_initial_step {
            step.is_initial_step = initial;
        }
        step.updated_at = Utc::now();

        let step = self.repo.update_step(step).await?;
        if step.is_initial_step {
            self.clear_other_initial(&step).await?;
        }
        Ok(step)
    }

    /// Delete a step with its options; options that led to it now end the session
    pub async fn delete_step(&self, step_id: Uuid) -> Result<(), FlowError> {
        self.repo.delete_step(step_id).await?;
        tracing::debug!(%step_id, "Step deleted");
        Ok(())
    }

    async fn check_parent(
        &self,
        flow_id: Uuid,
        step_id: Option<Uuid>,
        parent_id: Uuid,
    ) -> Result<(), FlowError> {
        if Some(parent_id) == step_id {
            return Err(FlowError::InvalidValue("a step cannot be its own parent".into()));
        }
        let parent = self.repo.get_step(parent_id).await?;
        if parent.flow_id != flow_id {
            return Err(FlowError::InvalidValue(format!(
                "parent step '{}' belongs to another flow",
                parent_id
            )));
        }
        Ok(())
    }

    /// Keep at most one initial step per flow
    async fn clear_other_initial(&self, keep: &MenuStep) -> Result<(), FlowError> {
        for mut other in self.repo.list_steps(keep.flow_id).await? {
            if other.id != keep.id && other.is_initial_step {
                other.is_initial_step = false;
                other.updated_at = Utc::now();
                self.repo.update_step(other).await?;
            }
        }
        Ok(())
    }

    // ── Options ──────────────────────────────────────────────────────────────

    pub async fn list_options(&self, step_id: Uuid) -> Result<Vec<MenuOption>, FlowError> {
        self.repo.get_step(step_id).await?;
        Ok(self.repo.list_options(step_id).await?)
    }

    pub async fn create_option(&self, step_id: Uuid, new: NewOption) -> Result<MenuOption, FlowError> {
        let step = self.repo.get_step(step_id).await?;

        let mut option = MenuOption::new(
            step.id,
            check_option_number(new.option_number)?,
            required("option_text", &new.option_text)?,
            new.next_step_id,
        );
        option.option_value = non_blank(new.option_value);
        option.is_active = new.is_active.unwrap_or(true);

        self.check_option(step.flow_id, &option).await?;
        let option = self.repo.insert_option(option).await?;

        tracing::debug!(%step_id, option_id = %option.id, number = option.option_number, "Option created");
        Ok(option)
    }

    pub async fn update_option(
        &self,
        option_id: Uuid,
        update: OptionUpdate,
    ) -> Result<MenuOption, FlowError> {
        let mut option = self.repo.get_option(option_id).await?;
        let step = self.repo.get_step(option.step_id).await?;

        if let Some(number) = update.option_number {
            option.option_number = check_option_number(number)?;
        }
        if let Some(text) = update.option_text {
            option.option_text = required("option_text", &text)?;
        }
        if let Some(value) = update.option_value {
            option.option_value = non_blank(value);
        }
        if let Some(next) = update.next_step_id {
            option.next_step_id = next;
        }
        if let Some(active) = update.is_active {
            option.is_active = active;
        }
        option.updated_at = Utc::now();

        self.check_option(step.flow_id, &option).await?;
        Ok(self.repo.update_option(option).await?)
    }

    pub async fn delete_option(&self, option_id: Uuid) -> Result<(), FlowError> {
        self.repo.delete_option(option_id).await?;
        Ok(())
    }

    /// Persist a canvas connection as an option on `source_id`.
    ///
    /// The option takes the lowest number the source step does not use yet.
    pub async fn connect_steps(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        label: Option<String>,
    ) -> Result<MenuOption, FlowError> {
        let source = self.repo.get_step(source_id).await?;
        let target = self.repo.get_step(target_id).await?;
        if source.flow_id != target.flow_id {
            return Err(FlowError::InvalidValue(
                "cannot connect steps of different flows".into(),
            ));
        }

        let used: HashSet<i32> = self
            .repo
            .list_options(source.id)
            .await?
            .iter()
            .map(|o| o.option_number)
            .collect();
        let number = (1..=MAX_OPTION_NUMBER)
            .find(|n| !used.contains(n))
            .ok_or(FlowError::OptionSlotsExhausted(source.id))?;

        let text = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| target.step_name.clone());

        if !source.response_type.uses_options() {
            tracing::warn!(
                step_id = %source.id,
                response_type = %source.response_type,
                "Connected a step whose replies never consult options"
            );
        }

        self.create_option(
            source.id,
            NewOption {
                option_number: number,
                option_text: text,
                next_step_id: Some(target.id),
                ..NewOption::default()
            },
        )
        .await
    }

    /// Reject an option write that would introduce a graph error
    async fn check_option(&self, flow_id: Uuid, option: &MenuOption) -> Result<(), FlowError> {
        let graph = self.load_graph(flow_id).await?.with_option(option.clone());
        let issues: Vec<GraphIssue> = graph
            .validate()
            .errors
            .into_iter()
            .filter(|issue| match issue {
                GraphIssue::ForeignTarget { option_id, .. } => *option_id == option.id,
                GraphIssue::DuplicateOptionNumber {
                    step_id,
                    option_number,
                } => *step_id == option.step_id && *option_number == option.option_number,
                _ => false,
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(FlowError::InvalidGraph(issues))
        }
    }
}

fn check_option_number(number: i32) -> Result<i32, FlowError> {
    if (1..=MAX_OPTION_NUMBER).contains(&number) {
        Ok(number)
    } else {
        Err(FlowError::OptionNumberOutOfRange(number))
    }
}

fn check_timeout(seconds: i32) -> Result<i32, FlowError> {
    if seconds > 0 {
        Ok(seconds)
    } else {
        Err(FlowError::InvalidValue(format!(
            "timeout_seconds must be positive, got {}",
            seconds
        )))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
