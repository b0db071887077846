//! Background services.
//!
//! Long-running tasks that run alongside the REST API server.

pub mod schedule_monitor;

pub use schedule_monitor::{ScheduleEvent, ScheduleMonitor};
