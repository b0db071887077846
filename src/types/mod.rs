//! Domain types for menu flows.
//!
//! These types use ts-rs and schemars to generate TypeScript definitions
//! and JSON schemas for the admin dashboard from a single Rust source of truth.

mod flow;
mod history;
mod service;
mod step;

pub use flow::{FlowFilter, FlowStatus, MenuFlow};
pub use history::{FlowHistoryEntry, HistoryAction, HistoryFilter};
pub use service::{is_valid_ussd_code, Mno, UssdService};
pub use step::{
    MenuOption, MenuStep, ResponseType, DEFAULT_TIMEOUT_SECONDS, MAX_OPTION_NUMBER,
};
