//! Preview simulator.
//!
//! Walks a preloaded flow graph the way a handset session would, one reply at
//! a time. Nothing here touches the store: the caller loads the steps and
//! options in bulk and hands over a [`FlowGraph`].

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::flows::graph::FlowGraph;
use crate::types::{MenuStep, ResponseType};

/// Shown when a selection does not match and the step has no fallback
pub const DEFAULT_INVALID_OPTION_MESSAGE: &str = "Invalid option. Please try again.";

/// Where the simulated session is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum SimulatorState {
    Idle,
    Running { step_id: Uuid },
    Ended,
}

/// One line of the session transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct SimulatorRecord {
    pub step_id: Uuid,
    pub step_name: String,
    pub menu_text: String,
    /// Reply that led here, `None` for the opening prompt
    pub input: Option<String>,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

impl SimulatorRecord {
    fn new(step: &MenuStep, input: Option<String>) -> Self {
        Self {
            step_id: step.id,
            step_name: step.step_name.clone(),
            menu_text: step.menu_text.clone(),
            input,
            timestamp: Utc::now(),
        }
    }
}

/// Result of an accepted reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Session moved to another prompt
    Advanced { step_id: Uuid },
    Ended,
}

/// Rejected operations; the session is left as it was
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    #[error("preview session is not running")]
    NotRunning,

    #[error("flow has no steps to preview")]
    EmptyFlow,

    #[error("{message}")]
    InvalidSelection { message: String },

    #[error("Please reply 1 (Yes) or 2 (No)")]
    InvalidConfirmation,

    #[error("Input cannot be empty")]
    EmptyInput,

    #[error("option leads to step '{0}' which is not part of this flow")]
    DanglingTarget(Uuid),
}

impl SimulatorError {
    /// A bad reply from the subscriber; the session can continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimulatorError::InvalidSelection { .. }
                | SimulatorError::InvalidConfirmation
                | SimulatorError::EmptyInput
        )
    }
}

/// Single-session simulator over one flow
#[derive(Debug, Clone)]
pub struct PreviewSimulator {
    graph: FlowGraph,
    invalid_option_message: String,
    state: SimulatorState,
    history: Vec<SimulatorRecord>,
}

impl PreviewSimulator {
    pub fn new(graph: FlowGraph) -> Self {
        Self {
            graph,
            invalid_option_message: DEFAULT_INVALID_OPTION_MESSAGE.to_string(),
            state: SimulatorState::Idle,
            history: Vec::new(),
        }
    }

    /// Override the generic invalid-option message
    pub fn with_invalid_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_option_message = message.into();
        self
    }

    pub fn flow_id(&self) -> Uuid {
        self.graph.flow_id()
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn history(&self) -> &[SimulatorRecord] {
        &self.history
    }

    /// Step the session is waiting on
    pub fn current_step(&self) -> Option<&MenuStep> {
        match self.state {
            SimulatorState::Running { step_id } => self.graph.step(step_id),
            _ => None,
        }
    }

    /// Begin a new session at the initial step, discarding any previous one
    pub fn start(&mut self) -> Result<Transition, SimulatorError> {
        self.reset();

        let step = self
            .graph
            .initial_step()
            .ok_or(SimulatorError::EmptyFlow)?
            .clone();
        tracing::debug!(flow_id = %self.flow_id(), step = %step.step_name, "Preview started");

        Ok(self.enter(&step, None))
    }

    /// Feed one reply to the current step
    pub fn submit(&mut self, input: &str) -> Result<Transition, SimulatorError> {
        let step = self.current_step().ok_or(SimulatorError::NotRunning)?.clone();
        let reply = input.trim();

        match step.response_type {
            ResponseType::Selection => self.select(&step, reply),
            ResponseType::Confirmation => {
                let answer = match reply.to_ascii_lowercase().as_str() {
                    "1" | "yes" | "y" => "Yes",
                    "2" | "no" | "n" => "No",
                    _ => return Err(SimulatorError::InvalidConfirmation),
                };
                Ok(self.finish(&step, answer.to_string()))
            }
            ResponseType::Input => {
                if reply.is_empty() {
                    return Err(SimulatorError::EmptyInput);
                }
                Ok(self.finish(&step, input.to_string()))
            }
            ResponseType::End => Err(SimulatorError::NotRunning),
        }
    }

    /// Back to idle with an empty transcript
    pub fn reset(&mut self) {
        self.state = SimulatorState::Idle;
        self.history.clear();
    }

    /// The current prompt as the handset would render it
    pub fn screen(&self) -> Option<String> {
        let step = self.current_step()?;
        let mut lines = vec![step.menu_text.clone()];
        if step.response_type.uses_options() {
            lines.extend(
                self.graph
                    .options_for(step.id)
                    .filter(|o| o.is_active)
                    .map(|o| o.label()),
            );
        }
        Some(lines.join("\n"))
    }

    fn select(&mut self, step: &MenuStep, reply: &str) -> Result<Transition, SimulatorError> {
        let option = self
            .graph
            .options_for(step.id)
            .find(|o| o.is_active && o.option_number.to_string() == reply)
            .cloned();

        let Some(option) = option else {
            let message = step
                .fallback_message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.invalid_option_message.clone());
            return Err(SimulatorError::InvalidSelection { message });
        };

        match option.next_step_id {
            Some(target) => {
                let next = self
                    .graph
                    .step(target)
                    .ok_or(SimulatorError::DanglingTarget(target))?
                    .clone();
                Ok(self.enter(&next, Some(reply.to_string())))
            }
            None => Ok(self.finish(step, reply.to_string())),
        }
    }

    fn enter(&mut self, step: &MenuStep, input: Option<String>) -> Transition {
        self.history.push(SimulatorRecord::new(step, input));
        if step.response_type == ResponseType::End {
            self.state = SimulatorState::Ended;
            Transition::Ended
        } else {
            self.state = SimulatorState::Running { step_id: step.id };
            Transition::Advanced { step_id: step.id }
        }
    }

    fn finish(&mut self, step: &MenuStep, recorded: String) -> Transition {
        self.history.push(SimulatorRecord::new(step, Some(recorded)));
        self.state = SimulatorState::Ended;
        Transition::Ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MenuOption;

    fn simulator(steps: Vec<MenuStep>, options: Vec<MenuOption>) -> PreviewSimulator {
        let flow_id = steps.first().map(|s| s.flow_id).unwrap_or_else(Uuid::new_v4);
        PreviewSimulator::new(FlowGraph::new(flow_id, steps, options))
    }

    struct SelectionFlow {
        sim: PreviewSimulator,
        main: MenuStep,
        b: MenuStep,
    }

    /// Main menu with {1: "A" -> B, 2: "B" -> end of session}
    fn selection_flow() -> SelectionFlow {
        let flow_id = Uuid::new_v4();
        let main = MenuStep::new(flow_id, "main", "Choose", ResponseType::Selection).initial();
        let b = MenuStep::new(flow_id, "b", "Step B", ResponseType::Selection);
        let options = vec![
            MenuOption::new(main.id, 1, "A", Some(b.id)),
            MenuOption::new(main.id, 2, "B", None),
        ];
        let sim = simulator(vec![main.clone(), b.clone()], options);
        SelectionFlow { sim, main, b }
    }

    fn single_step(response_type: ResponseType) -> (PreviewSimulator, MenuStep) {
        let step = MenuStep::new(Uuid::new_v4(), "ask", "Question?", response_type).initial();
        let mut sim = simulator(vec![step.clone()], vec![]);
        sim.start().unwrap();
        (sim, step)
    }

    #[test]
    fn test_selection_advances_to_target() {
        let mut f = selection_flow();
        f.sim.start().unwrap();

        let t = f.sim.submit("1").unwrap();
        assert_eq!(t, Transition::Advanced { step_id: f.b.id });
        assert_eq!(f.sim.state(), SimulatorState::Running { step_id: f.b.id });
        assert_eq!(f.sim.history().len(), 2);
        assert_eq!(f.sim.history()[1].step_id, f.b.id);
        assert_eq!(f.sim.history()[1].input.as_deref(), Some("1"));
    }

    #[test]
    fn test_selection_without_target_ends() {
        let mut f = selection_flow();
        f.sim.start().unwrap();

        assert_eq!(f.sim.submit(" 2 ").unwrap(), Transition::Ended);
        assert_eq!(f.sim.state(), SimulatorState::Ended);
        let last = f.sim.history().last().unwrap();
        assert_eq!(last.step_id, f.main.id);
        assert_eq!(last.input.as_deref(), Some("2"));
    }

    #[test]
    fn test_selection_mismatch_keeps_state() {
        let mut f = selection_flow();
        f.sim.start().unwrap();
        let before = f.sim.history().to_vec();

        let err = f.sim.submit("3").unwrap_err();
        assert_eq!(
            err,
            SimulatorError::InvalidSelection {
                message: DEFAULT_INVALID_OPTION_MESSAGE.to_string()
            }
        );
        assert_eq!(f.sim.state(), SimulatorState::Running { step_id: f.main.id });
        assert_eq!(f.sim.history(), before.as_slice());
    }

    #[test]
    fn test_selection_mismatch_uses_fallback_message() {
        let flow_id = Uuid::new_v4();
        let mut main = MenuStep::new(flow_id, "main", "Choose", ResponseType::Selection);
        main.fallback_message = Some("Chagua 1 au 2".to_string());
        let options = vec![MenuOption::new(main.id, 1, "A", None)];
        let mut sim = simulator(vec![main], options).with_invalid_message("unused");
        sim.start().unwrap();

        let err = sim.submit("9").unwrap_err();
        assert_eq!(err.to_string(), "Chagua 1 au 2");
    }

    #[test]
    fn test_inactive_option_is_not_selectable() {
        let flow_id = Uuid::new_v4();
        let main = MenuStep::new(flow_id, "main", "Choose", ResponseType::Selection);
        let mut hidden = MenuOption::new(main.id, 1, "Hidden", None);
        hidden.is_active = false;
        let mut sim = simulator(vec![main], vec![hidden]);
        sim.start().unwrap();

        assert!(matches!(
            sim.submit("1"),
            Err(SimulatorError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn test_entering_end_step_ends_session() {
        let flow_id = Uuid::new_v4();
        let main = MenuStep::new(flow_id, "main", "Choose", ResponseType::Selection);
        let bye = MenuStep::new(flow_id, "bye", "Thank you", ResponseType::End);
        let options = vec![MenuOption::new(main.id, 1, "Exit", Some(bye.id))];
        let mut sim = simulator(vec![main, bye.clone()], options);
        sim.start().unwrap();

        assert_eq!(sim.submit("1").unwrap(), Transition::Ended);
        assert_eq!(sim.history().last().unwrap().step_id, bye.id);
        assert_eq!(sim.submit("1"), Err(SimulatorError::NotRunning));
    }

    #[test]
    fn test_confirmation_yes_variants() {
        for reply in ["1", "yes", "Y"] {
            let (mut sim, _) = single_step(ResponseType::Confirmation);
            assert_eq!(sim.submit(reply).unwrap(), Transition::Ended, "{reply}");
            assert_eq!(sim.history().last().unwrap().input.as_deref(), Some("Yes"));
            assert_eq!(sim.state(), SimulatorState::Ended);
        }
    }

    #[test]
    fn test_confirmation_no_variants() {
        for reply in ["2", "no", "N"] {
            let (mut sim, _) = single_step(ResponseType::Confirmation);
            assert_eq!(sim.submit(reply).unwrap(), Transition::Ended, "{reply}");
            assert_eq!(sim.history().last().unwrap().input.as_deref(), Some("No"));
        }
    }

    #[test]
    fn test_confirmation_other_reply_keeps_state() {
        let (mut sim, step) = single_step(ResponseType::Confirmation);
        assert_eq!(sim.submit("maybe"), Err(SimulatorError::InvalidConfirmation));
        assert_eq!(sim.state(), SimulatorState::Running { step_id: step.id });
        assert_eq!(sim.history().len(), 1);
    }

    #[test]
    fn test_input_recorded_verbatim() {
        let (mut sim, _) = single_step(ResponseType::Input);
        assert_eq!(sim.submit(" 5000 TZS ").unwrap(), Transition::Ended);
        assert_eq!(
            sim.history().last().unwrap().input.as_deref(),
            Some(" 5000 TZS ")
        );
    }

    #[test]
    fn test_empty_input_rejected() {
        let (mut sim, step) = single_step(ResponseType::Input);
        assert_eq!(sim.submit(""), Err(SimulatorError::EmptyInput));
        assert_eq!(sim.submit("   "), Err(SimulatorError::EmptyInput));
        assert_eq!(sim.history().len(), 1);
        assert_eq!(sim.state(), SimulatorState::Running { step_id: step.id });
    }

    #[test]
    fn test_start_falls_back_to_first_step() {
        let flow_id = Uuid::new_v4();
        let first = MenuStep::new(flow_id, "first", "One", ResponseType::Input);
        let second = MenuStep::new(flow_id, "second", "Two", ResponseType::Input);
        let mut sim = simulator(vec![first.clone(), second], vec![]);

        sim.start().unwrap();
        assert_eq!(sim.state(), SimulatorState::Running { step_id: first.id });
        assert_eq!(sim.history()[0].input, None);
    }

    #[test]
    fn test_start_prefers_flagged_step() {
        let flow_id = Uuid::new_v4();
        let first = MenuStep::new(flow_id, "first", "One", ResponseType::Input);
        let flagged = MenuStep::new(flow_id, "second", "Two", ResponseType::Input).initial();
        let mut sim = simulator(vec![first, flagged.clone()], vec![]);

        sim.start().unwrap();
        assert_eq!(sim.state(), SimulatorState::Running { step_id: flagged.id });
    }

    #[test]
    fn test_start_on_end_step_ends_immediately() {
        let step = MenuStep::new(Uuid::new_v4(), "closed", "Service unavailable", ResponseType::End);
        let mut sim = simulator(vec![step], vec![]);
        assert_eq!(sim.start().unwrap(), Transition::Ended);
        assert_eq!(sim.state(), SimulatorState::Ended);
        assert_eq!(sim.history().len(), 1);
    }

    #[test]
    fn test_empty_flow_cannot_start() {
        let mut sim = PreviewSimulator::new(FlowGraph::new(Uuid::new_v4(), vec![], vec![]));
        assert_eq!(sim.start(), Err(SimulatorError::EmptyFlow));
        assert_eq!(sim.state(), SimulatorState::Idle);
    }

    #[test]
    fn test_submit_while_idle() {
        let mut f = selection_flow();
        assert_eq!(f.sim.submit("1"), Err(SimulatorError::NotRunning));
    }

    #[test]
    fn test_reset_mid_session() {
        let mut f = selection_flow();
        f.sim.start().unwrap();
        f.sim.submit("1").unwrap();

        f.sim.reset();
        assert_eq!(f.sim.state(), SimulatorState::Idle);
        assert!(f.sim.history().is_empty());
        assert!(f.sim.current_step().is_none());
    }

    #[test]
    fn test_restart_clears_history() {
        let mut f = selection_flow();
        f.sim.start().unwrap();
        f.sim.submit("1").unwrap();
        f.sim.start().unwrap();
        assert_eq!(f.sim.history().len(), 1);
    }

    #[test]
    fn test_screen_lists_active_options() {
        let mut f = selection_flow();
        assert!(f.sim.screen().is_none());
        f.sim.start().unwrap();
        assert_eq!(f.sim.screen().unwrap(), "Choose\n1. A\n2. B");
    }
}
