//! In-memory graph model of a flow.
//!
//! Steps are nodes; options with a `next_step_id` are directed edges. The graph
//! backs save-time validation, publish checks and the visual editor layout.

use std::collections::{HashMap, HashSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{MenuOption, MenuStep, ResponseType, MAX_OPTION_NUMBER};

/// Canvas nodes per row
pub const LAYOUT_COLUMNS: usize = 3;
const COLUMN_PITCH: f64 = 300.0;
const ROW_PITCH: f64 = 180.0;
const ORIGIN: f64 = 50.0;

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks saving the offending option and publishing the flow
    Error,
    Warning,
}

/// A structural finding about a flow graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum GraphIssue {
    NoSteps,
    /// No step is flagged initial; sessions start at the first step
    NoInitialStep,
    MultipleInitialSteps {
        step_ids: Vec<Uuid>,
    },
    /// Option points at a step outside the flow
    ForeignTarget {
        option_id: Uuid,
        step_id: Uuid,
        target: Uuid,
    },
    DuplicateOptionNumber {
        step_id: Uuid,
        option_number: i32,
    },
    OptionNumberOutOfRange {
        option_id: Uuid,
        option_number: i32,
    },
    SelectionWithoutOptions {
        step_id: Uuid,
    },
    /// Options on a step whose response type never consults them
    OptionsIgnored {
        step_id: Uuid,
        response_type: ResponseType,
    },
    UnreachableStep {
        step_id: Uuid,
    },
    Cycle {
        path: Vec<Uuid>,
    },
}

impl GraphIssue {
    pub fn severity(&self) -> Severity {
        match self {
            GraphIssue::NoSteps
            | GraphIssue::MultipleInitialSteps { .. }
            | GraphIssue::ForeignTarget { .. }
            | GraphIssue::DuplicateOptionNumber { .. }
            | GraphIssue::OptionNumberOutOfRange { .. } => Severity::Error,
            GraphIssue::NoInitialStep
            | GraphIssue::SelectionWithoutOptions { .. }
            | GraphIssue::OptionsIgnored { .. }
            | GraphIssue::UnreachableStep { .. }
            | GraphIssue::Cycle { .. } => Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GraphIssue::NoSteps => "no_steps",
            GraphIssue::NoInitialStep => "no_initial_step",
            GraphIssue::MultipleInitialSteps { .. } => "multiple_initial_steps",
            GraphIssue::ForeignTarget { .. } => "foreign_target",
            GraphIssue::DuplicateOptionNumber { .. } => "duplicate_option_number",
            GraphIssue::OptionNumberOutOfRange { .. } => "option_number_out_of_range",
            GraphIssue::SelectionWithoutOptions { .. } => "selection_without_options",
            GraphIssue::OptionsIgnored { .. } => "options_ignored",
            GraphIssue::UnreachableStep { .. } => "unreachable_step",
            GraphIssue::Cycle { .. } => "cycle",
        }
    }
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::NoSteps => write!(f, "flow has no steps"),
            GraphIssue::NoInitialStep => {
                write!(f, "no initial step flagged; sessions start at the first step")
            }
            GraphIssue::MultipleInitialSteps { step_ids } => {
                write!(f, "{} steps are flagged as initial", step_ids.len())
            }
            GraphIssue::ForeignTarget {
                option_id, target, ..
            } => write!(
                f,
                "option '{}' points at step '{}' outside this flow",
                option_id, target
            ),
            GraphIssue::DuplicateOptionNumber {
                step_id,
                option_number,
            } => write!(
                f,
                "step '{}' has more than one active option {}",
                step_id, option_number
            ),
            GraphIssue::OptionNumberOutOfRange {
                option_id,
                option_number,
            } => write!(
                f,
                "option '{}' uses number {} (allowed 1-{})",
                option_id, option_number, MAX_OPTION_NUMBER
            ),
            GraphIssue::SelectionWithoutOptions { step_id } => {
                write!(f, "selection step '{}' has no active options", step_id)
            }
            GraphIssue::OptionsIgnored {
                step_id,
                response_type,
            } => write!(
                f,
                "options on {} step '{}' are never used",
                response_type, step_id
            ),
            GraphIssue::UnreachableStep { step_id } => {
                write!(f, "step '{}' cannot be reached from the initial step", step_id)
            }
            GraphIssue::Cycle { path } => write!(f, "menu loops through {} steps", path.len()),
        }
    }
}

/// Outcome of validating a flow graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<GraphIssue>,
    pub warnings: Vec<GraphIssue>,
}

impl ValidationReport {
    fn push(&mut self, issue: GraphIssue) {
        if issue.is_error() {
            self.errors.push(issue);
        } else {
            self.warnings.push(issue);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A positioned node on the builder canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema, ToSchema)]
#[ts(export)]
pub struct CanvasNode {
    pub id: Uuid,
    pub step_number: i32,
    pub label: String,
    pub menu_text: String,
    #[schema(value_type = String)]
    pub response_type: ResponseType,
    pub is_initial: bool,
    pub x: f64,
    pub y: f64,
    pub color: String,
}

/// A directed, labelled edge on the builder canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema, ToSchema)]
#[ts(export)]
pub struct CanvasEdge {
    /// Id of the option record behind the edge
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    pub label: String,
    /// Inactive options render dashed
    pub dashed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, JsonSchema, ToSchema)]
#[ts(export)]
pub struct CanvasLayout {
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
}

/// Node color for a response type
pub fn node_color(response_type: ResponseType) -> &'static str {
    match response_type {
        ResponseType::Selection => "#3b82f6",
        ResponseType::Input => "#10b981",
        ResponseType::Confirmation => "#f59e0b",
        ResponseType::End => "#ef4444",
    }
}

/// Canvas position for the node at `index` in the step list
pub fn grid_position(index: usize) -> (f64, f64) {
    let column = index % LAYOUT_COLUMNS;
    let row = index / LAYOUT_COLUMNS;
    (
        ORIGIN + column as f64 * COLUMN_PITCH,
        ORIGIN + row as f64 * ROW_PITCH,
    )
}

/// Adjacency view over the steps and options of one flow
#[derive(Debug, Clone)]
pub struct FlowGraph {
    flow_id: Uuid,
    steps: Vec<MenuStep>,
    options: Vec<MenuOption>,
    index: HashMap<Uuid, usize>,
}

impl FlowGraph {
    /// Build a graph. Options belonging to steps outside `steps` are dropped.
    pub fn new(flow_id: Uuid, steps: Vec<MenuStep>, options: Vec<MenuOption>) -> Self {
        let index: HashMap<Uuid, usize> =
            steps.iter().enumerate().map(|(i, s)| (s.id, i)).collect();

        let (mut options, stray): (Vec<MenuOption>, Vec<MenuOption>) =
            options.into_iter().partition(|o| index.contains_key(&o.step_id));
        if !stray.is_empty() {
            tracing::debug!(%flow_id, count = stray.len(), "Ignoring options of unknown steps");
        }
        options.sort_by_key(|o| (index[&o.step_id], o.option_number));

        Self {
            flow_id,
            steps,
            options,
            index,
        }
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub fn steps(&self) -> &[MenuStep] {
        &self.steps
    }

    pub fn options(&self) -> &[MenuOption] {
        &self.options
    }

    pub fn contains_step(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    pub fn step(&self, id: Uuid) -> Option<&MenuStep> {
        self.index.get(&id).map(|&i| &self.steps[i])
    }

    /// Options of a step ordered by option number
    pub fn options_for(&self, step_id: Uuid) -> impl Iterator<Item = &MenuOption> {
        self.options.iter().filter(move |o| o.step_id == step_id)
    }

    /// The flagged initial step, falling back to the first step
    pub fn initial_step(&self) -> Option<&MenuStep> {
        self.steps
            .iter()
            .find(|s| s.is_initial_step)
            .or_else(|| self.steps.first())
    }

    /// Graph with `option` inserted, or replacing the option with the same id
    pub fn with_option(mut self, option: MenuOption) -> Self {
        self.options.retain(|o| o.id != option.id);
        self.options.push(option);
        let Self {
            flow_id,
            steps,
            options,
            ..
        } = self;
        Self::new(flow_id, steps, options)
    }

    /// Active transitions the simulator can follow from a step
    fn successors(&self, step_id: Uuid) -> Vec<Uuid> {
        let Some(step) = self.step(step_id) else {
            return Vec::new();
        };
        if !step.response_type.uses_options() {
            return Vec::new();
        }
        self.options_for(step_id)
            .filter(|o| o.is_active)
            .filter_map(|o| o.next_step_id)
            .filter(|target| self.contains_step(*target))
            .collect()
    }

    /// Steps reachable from the initial step
    pub fn reachable(&self) -> HashSet<Uuid> {
        let mut seen = HashSet::new();
        let Some(start) = self.initial_step() else {
            return seen;
        };

        let mut stack = vec![start.id];
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend(self.successors(id));
            }
        }
        seen
    }

    /// First cycle found by depth-first search, as a list of step ids
    pub fn find_cycle(&self) -> Option<Vec<Uuid>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }

        let mut marks: HashMap<Uuid, Mark> =
            self.steps.iter().map(|s| (s.id, Mark::Unvisited)).collect();

        for root in &self.steps {
            if marks[&root.id] != Mark::Unvisited {
                continue;
            }

            // Explicit stack of (step, successors, next successor index)
            let mut path: Vec<Uuid> = Vec::new();
            let mut stack: Vec<(Uuid, Vec<Uuid>, usize)> = vec![(root.id, self.successors(root.id), 0)];
            marks.insert(root.id, Mark::OnPath);
            path.push(root.id);

            while let Some((node, succ, next)) = stack.last_mut() {
                if *next < succ.len() {
                    let target = succ[*next];
                    *next += 1;
                    match marks[&target] {
                        Mark::OnPath => {
                            let start = path.iter().position(|id| *id == target).unwrap_or(0);
                            return Some(path[start..].to_vec());
                        }
                        Mark::Unvisited => {
                            marks.insert(target, Mark::OnPath);
                            path.push(target);
                            stack.push((target, self.successors(target), 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks.insert(*node, Mark::Done);
                    path.pop();
                    stack.pop();
                }
            }
        }

        None
    }

    /// Run every structural check
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.steps.is_empty() {
            report.push(GraphIssue::NoSteps);
            return report;
        }

        let initial: Vec<Uuid> = self
            .steps
            .iter()
            .filter(|s| s.is_initial_step)
            .map(|s| s.id)
            .collect();
        match initial.len() {
            0 => report.push(GraphIssue::NoInitialStep),
            1 => {}
            _ => report.push(GraphIssue::MultipleInitialSteps { step_ids: initial }),
        }

        for option in &self.options {
            if !(1..=MAX_OPTION_NUMBER).contains(&option.option_number) {
                report.push(GraphIssue::OptionNumberOutOfRange {
                    option_id: option.id,
                    option_number: option.option_number,
                });
            }
            if let Some(target) = option.next_step_id {
                if !self.contains_step(target) {
                    report.push(GraphIssue::ForeignTarget {
                        option_id: option.id,
                        step_id: option.step_id,
                        target,
                    });
                }
            }
        }

        for step in &self.steps {
            let active: Vec<&MenuOption> =
                self.options_for(step.id).filter(|o| o.is_active).collect();

            let mut seen = HashSet::new();
            let mut reported = HashSet::new();
            for option in &active {
                if !seen.insert(option.option_number) && reported.insert(option.option_number) {
                    report.push(GraphIssue::DuplicateOptionNumber {
                        step_id: step.id,
                        option_number: option.option_number,
                    });
                }
            }

            match step.response_type {
                ResponseType::Selection if active.is_empty() => {
                    report.push(GraphIssue::SelectionWithoutOptions { step_id: step.id });
                }
                ResponseType::Selection => {}
                other if !active.is_empty() => report.push(GraphIssue::OptionsIgnored {
                    step_id: step.id,
                    response_type: other,
                }),
                _ => {}
            }
        }

        let reachable = self.reachable();
        for step in &self.steps {
            if !reachable.contains(&step.id) {
                report.push(GraphIssue::UnreachableStep { step_id: step.id });
            }
        }

        if let Some(path) = self.find_cycle() {
            report.push(GraphIssue::Cycle { path });
        }

        report
    }

    /// Canvas layout: grid-positioned nodes and option edges
    pub fn layout(&self) -> CanvasLayout {
        let initial_id = self.initial_step().map(|s| s.id);

        let nodes = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let (x, y) = grid_position(i);
                CanvasNode {
                    id: step.id,
                    step_number: step.step_number,
                    label: step.step_name.clone(),
                    menu_text: step.menu_text.clone(),
                    response_type: step.response_type,
                    is_initial: Some(step.id) == initial_id,
                    x,
                    y,
                    color: node_color(step.response_type).to_string(),
                }
            })
            .collect();

        let edges = self
            .options
            .iter()
            .filter_map(|option| {
                option.next_step_id.map(|target| CanvasEdge {
                    id: option.id,
                    source: option.step_id,
                    target,
                    label: option.label(),
                    dashed: !option.is_active,
                })
            })
            .collect();

        CanvasLayout { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        flow_id: Uuid,
        main: MenuStep,
        amount: MenuStep,
        done: MenuStep,
    }

    fn fixture() -> Fixture {
        let flow_id = Uuid::new_v4();
        let mut main = MenuStep::new(flow_id, "main", "Welcome", ResponseType::Selection).initial();
        main.step_number = 1;
        let mut amount = MenuStep::new(flow_id, "amount", "Enter amount", ResponseType::Input);
        amount.step_number = 2;
        let mut done = MenuStep::new(flow_id, "done", "Goodbye", ResponseType::End);
        done.step_number = 3;
        Fixture {
            flow_id,
            main,
            amount,
            done,
        }
    }

    fn graph(f: &Fixture, options: Vec<MenuOption>) -> FlowGraph {
        FlowGraph::new(
            f.flow_id,
            vec![f.main.clone(), f.amount.clone(), f.done.clone()],
            options,
        )
    }

    #[test]
    fn test_valid_graph() {
        let f = fixture();
        let g = graph(
            &f,
            vec![
                MenuOption::new(f.main.id, 1, "Send", Some(f.amount.id)),
                MenuOption::new(f.main.id, 2, "Exit", Some(f.done.id)),
            ],
        );
        let report = g.validate();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_foreign_target_is_error() {
        let f = fixture();
        let elsewhere = Uuid::new_v4();
        let g = graph(&f, vec![MenuOption::new(f.main.id, 1, "Away", Some(elsewhere))]);
        let report = g.validate();
        assert!(report
            .errors
            .iter()
            .any(|i| matches!(i, GraphIssue::ForeignTarget { target, .. } if *target == elsewhere)));
    }

    #[test]
    fn test_duplicate_active_option_number_is_error() {
        let f = fixture();
        let mut inactive = MenuOption::new(f.main.id, 2, "Old exit", None);
        inactive.is_active = false;
        let g = graph(
            &f,
            vec![
                MenuOption::new(f.main.id, 1, "Send", Some(f.amount.id)),
                MenuOption::new(f.main.id, 1, "Also send", Some(f.amount.id)),
                MenuOption::new(f.main.id, 2, "Exit", Some(f.done.id)),
                inactive,
            ],
        );
        let report = g.validate();
        assert_eq!(
            report.errors,
            vec![GraphIssue::DuplicateOptionNumber {
                step_id: f.main.id,
                option_number: 1
            }]
        );
    }

    #[test]
    fn test_multiple_initial_steps_is_error() {
        let mut f = fixture();
        f.done.is_initial_step = true;
        let report = graph(&f, vec![]).validate();
        assert!(report
            .errors
            .iter()
            .any(|i| matches!(i, GraphIssue::MultipleInitialSteps { step_ids } if step_ids.len() == 2)));
    }

    #[test]
    fn test_no_initial_step_falls_back_to_first() {
        let mut f = fixture();
        f.main.is_initial_step = false;
        let g = graph(&f, vec![]);
        assert_eq!(g.initial_step().map(|s| s.id), Some(f.main.id));
        assert!(g.validate().warnings.contains(&GraphIssue::NoInitialStep));
    }

    #[test]
    fn test_empty_flow() {
        let g = FlowGraph::new(Uuid::new_v4(), vec![], vec![]);
        assert_eq!(g.validate().errors, vec![GraphIssue::NoSteps]);
        assert!(g.initial_step().is_none());
    }

    #[test]
    fn test_unreachable_and_ignored_options_are_warnings() {
        let f = fixture();
        let g = graph(
            &f,
            vec![
                MenuOption::new(f.main.id, 1, "Send", Some(f.amount.id)),
                MenuOption::new(f.amount.id, 1, "Never used", Some(f.done.id)),
            ],
        );
        let report = g.validate();
        assert!(report.is_valid());
        assert!(report
            .warnings
            .contains(&GraphIssue::UnreachableStep { step_id: f.done.id }));
        assert!(report.warnings.contains(&GraphIssue::OptionsIgnored {
            step_id: f.amount.id,
            response_type: ResponseType::Input
        }));
    }

    #[test]
    fn test_cycle_detected_as_warning() {
        let flow_id = Uuid::new_v4();
        let main = MenuStep::new(flow_id, "main", "Menu", ResponseType::Selection).initial();
        let balance = MenuStep::new(flow_id, "balance", "Balance 100", ResponseType::Selection);
        let options = vec![
            MenuOption::new(main.id, 1, "Balance", Some(balance.id)),
            MenuOption::new(balance.id, 1, "Back", Some(main.id)),
            MenuOption::new(balance.id, 2, "Exit", None),
        ];
        let g = FlowGraph::new(flow_id, vec![main.clone(), balance.clone()], options);

        let cycle = g.find_cycle().expect("cycle");
        assert_eq!(cycle, vec![main.id, balance.id]);
        let report = g.validate();
        assert!(report.is_valid());
        assert!(matches!(report.warnings.as_slice(), [GraphIssue::Cycle { .. }]));
    }

    #[test]
    fn test_inactive_options_do_not_form_cycles() {
        let flow_id = Uuid::new_v4();
        let main = MenuStep::new(flow_id, "main", "Menu", ResponseType::Selection).initial();
        let mut back = MenuOption::new(main.id, 1, "Again", Some(main.id));
        back.is_active = false;
        let g = FlowGraph::new(flow_id, vec![main], vec![back]);
        assert!(g.find_cycle().is_none());
    }

    #[test]
    fn test_with_option_replaces_by_id() {
        let f = fixture();
        let option = MenuOption::new(f.main.id, 1, "Send", Some(f.amount.id));
        let g = graph(&f, vec![option.clone()]);

        let mut edited = option.clone();
        edited.option_number = 4;
        let g = g.with_option(edited);
        let numbers: Vec<i32> = g.options_for(f.main.id).map(|o| o.option_number).collect();
        assert_eq!(numbers, vec![4]);
    }

    #[test]
    fn test_layout_grid_and_edges() {
        let f = fixture();
        let mut inactive = MenuOption::new(f.main.id, 2, "Exit", Some(f.done.id));
        inactive.is_active = false;
        let g = graph(
            &f,
            vec![
                MenuOption::new(f.main.id, 1, "Send", Some(f.amount.id)),
                inactive,
                MenuOption::new(f.main.id, 3, "Quit", None),
            ],
        );

        let layout = g.layout();
        assert_eq!(layout.nodes.len(), 3);
        assert_eq!((layout.nodes[0].x, layout.nodes[0].y), (50.0, 50.0));
        assert_eq!((layout.nodes[2].x, layout.nodes[2].y), (650.0, 50.0));
        assert!(layout.nodes[0].is_initial);
        assert_eq!(layout.nodes[1].color, node_color(ResponseType::Input));

        // The option without a target has no edge
        assert_eq!(layout.edges.len(), 2);
        assert_eq!(layout.edges[0].label, "1. Send");
        assert!(!layout.edges[0].dashed);
        assert!(layout.edges[1].dashed);
    }

    #[test]
    fn test_grid_wraps_rows() {
        assert_eq!(grid_position(3), (50.0, 230.0));
        assert_eq!(grid_position(5), (650.0, 230.0));
    }
}
