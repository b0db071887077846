//! Export TypeScript definitions and JSON schemas for the dashboard.
//!
//! Usage: `generate_types [OUT_DIR]` (default `bindings`)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schemars::{schema_for, JsonSchema};
use ts_rs::TS;

use menuflow::flows::graph::{CanvasLayout, GraphIssue};
use menuflow::simulator::{SimulatorRecord, SimulatorState};
use menuflow::types::{
    FlowHistoryEntry, FlowStatus, HistoryAction, MenuFlow, MenuOption, MenuStep, Mno,
    ResponseType, UssdService,
};

fn export_ts<T: TS + 'static>(out_dir: &Path) -> Result<()> {
    T::export_all_to(out_dir).with_context(|| format!("Failed to export {}", T::name()))
}

fn export_schema<T: JsonSchema>(schema_dir: &Path, file: &str) -> Result<()> {
    let schema = schema_for!(T);
    let json = serde_json::to_string_pretty(&schema)?;
    let path = schema_dir.join(file);
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bindings"));
    let schema_dir = out_dir.join("schemas");
    fs::create_dir_all(&schema_dir)?;

    export_ts::<MenuFlow>(&out_dir)?;
    export_ts::<FlowStatus>(&out_dir)?;
    export_ts::<MenuStep>(&out_dir)?;
    export_ts::<MenuOption>(&out_dir)?;
    export_ts::<ResponseType>(&out_dir)?;
    export_ts::<FlowHistoryEntry>(&out_dir)?;
    export_ts::<HistoryAction>(&out_dir)?;
    export_ts::<UssdService>(&out_dir)?;
    export_ts::<Mno>(&out_dir)?;
    export_ts::<GraphIssue>(&out_dir)?;
    export_ts::<CanvasLayout>(&out_dir)?;
    export_ts::<SimulatorState>(&out_dir)?;
    export_ts::<SimulatorRecord>(&out_dir)?;

    export_schema::<MenuFlow>(&schema_dir, "menu_flow.json")?;
    export_schema::<MenuStep>(&schema_dir, "menu_step.json")?;
    export_schema::<MenuOption>(&schema_dir, "menu_option.json")?;
    export_schema::<FlowHistoryEntry>(&schema_dir, "flow_history_entry.json")?;
    export_schema::<UssdService>(&schema_dir, "ussd_service.json")?;
    export_schema::<Mno>(&schema_dir, "mno.json")?;
    export_schema::<CanvasLayout>(&schema_dir, "canvas_layout.json")?;

    println!("Generated types in {}", out_dir.display());
    Ok(())
}
