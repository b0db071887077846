//! menuflow - USSD menu flow builder for the DAPAY admin dashboard.
//!
//! Flows are directed graphs of menu steps joined by numbered options.
//! This crate holds the domain types, the flow store, graph validation,
//! the preview simulator, scheduled publishing and the REST API.

pub mod config;
pub mod flows;
pub mod history;
pub mod logging;
pub mod rest;
pub mod services;
pub mod simulator;
pub mod store;
pub mod types;
