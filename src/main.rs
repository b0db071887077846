use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use uuid::Uuid;

use menuflow::config::Config;
use menuflow::flows::{sample, FlowManager, ScheduleManager, StepEditor};
use menuflow::history::HistoryLog;
use menuflow::services::{ScheduleEvent, ScheduleMonitor};
use menuflow::simulator::{PreviewSimulator, SimulatorState};
use menuflow::types::{FlowFilter, FlowStatus, HistoryAction, HistoryFilter};
use menuflow::{logging, rest, store};

#[derive(Parser)]
#[command(name = "menuflow")]
#[command(about = "USSD menu flow builder for the DAPAY dashboard")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server (default)
    Serve {
        /// Port to listen on (default: 7010)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List flows
    Flows {
        /// Only flows of this service
        #[arg(short, long)]
        service: Option<Uuid>,

        /// active, inactive, published, draft or scheduled
        #[arg(long)]
        status: Option<String>,
    },

    /// Validate a flow's step graph
    Validate {
        /// Flow id
        flow: Uuid,
    },

    /// Walk through a flow as a subscriber would
    Preview {
        /// Flow id
        flow: Uuid,
    },

    /// Show flows awaiting scheduled publication
    Scheduled,

    /// Show the flow audit trail
    History {
        /// Only rows for this flow
        #[arg(short, long)]
        flow: Option<Uuid>,

        /// Only rows with this action (e.g. published)
        #[arg(short, long)]
        action: Option<String>,

        /// Maximum rows
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Create a sample DAPAY service, MNO and main-menu flow
    Seed,

    /// Print the OpenAPI document
    Openapi {
        /// Emit YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let is_server_mode = matches!(cli.command, None | Some(Commands::Serve { .. }));
    let logging_handle = logging::init_logging(&config, is_server_mode, cli.debug)?;

    match cli.command {
        None => cmd_serve(config, None).await?,
        Some(Commands::Serve { port }) => cmd_serve(config, port).await?,
        Some(Commands::Flows { service, status }) => cmd_flows(&config, service, status).await?,
        Some(Commands::Validate { flow }) => cmd_validate(&config, flow).await?,
        Some(Commands::Preview { flow }) => cmd_preview(&config, flow).await?,
        Some(Commands::Scheduled) => cmd_scheduled(&config).await?,
        Some(Commands::History {
            flow,
            action,
            limit,
        }) => cmd_history(&config, flow, action, limit).await?,
        Some(Commands::Seed) => cmd_seed(&config).await?,
        Some(Commands::Openapi { yaml }) => {
            let doc = if yaml {
                rest::ApiDoc::yaml()?
            } else {
                rest::ApiDoc::json()?
            };
            println!("{}", doc);
        }
    }

    if let Some(log_path) = logging_handle.log_file_path {
        if log_path.exists() {
            eprintln!("Session log: {}", log_path.display());
        }
    }

    Ok(())
}

async fn cmd_serve(config: Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.api.port);
    let repo = store::open(&config)?;
    let state = rest::ApiState::new(config.clone(), repo);
    let previews = state.previews.clone();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let mut monitor = ScheduleMonitor::new(state.schedule.clone(), &config.schedule, event_tx)
        .with_shutdown(shutdown_rx);

    let monitor_handle = tokio::spawn(async move {
        if let Err(e) = monitor.run().await {
            tracing::error!("Schedule monitor failed: {}", e);
        }
    });
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ScheduleEvent::Published { flow_id, name } => {
                    tracing::info!(%flow_id, "Scheduled flow '{}' is now live", name);
                }
                ScheduleEvent::Refreshed(pending) => {
                    previews.sweep().await;
                    for flow in pending.iter().filter(|f| f.is_due()) {
                        tracing::warn!(flow_id = %flow.flow.id, "Scheduled flow is overdue");
                    }
                }
            }
        }
    });

    println!("menuflow listening on port {}", port);
    let result = rest::serve(state, port).await;

    let _ = shutdown_tx.send(()).await;
    let _ = monitor_handle.await;
    result
}

async fn cmd_flows(config: &Config, service: Option<Uuid>, status: Option<String>) -> Result<()> {
    let repo = store::open(config)?;
    let manager = FlowManager::new(repo, config.flows.clone());

    let status = status
        .as_deref()
        .map(str::parse::<FlowStatus>)
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let flows = manager
        .list(&FlowFilter {
            service_id: service,
            status,
        })
        .await?;

    if flows.is_empty() {
        println!("No flows");
        return Ok(());
    }

    println!("Flows ({})", flows.len());
    println!("{}", "─".repeat(72));
    for flow in &flows {
        let state = if flow.is_published {
            "published"
        } else if flow.is_scheduled() {
            "scheduled"
        } else {
            "draft"
        };
        let active = if flow.is_active { "●" } else { "○" };
        println!(
            "{} {} v{} [{}] {}",
            active, flow.id, flow.version, state, flow.name
        );
    }

    Ok(())
}

async fn cmd_validate(config: &Config, flow_id: Uuid) -> Result<()> {
    let repo = store::open(config)?;
    let editor = StepEditor::new(repo);
    let report = editor.load_graph(flow_id).await?.validate();

    for issue in &report.errors {
        println!("✗ {}", issue);
    }
    for issue in &report.warnings {
        println!("! {}", issue);
    }

    if report.is_valid() {
        println!("Flow {} is valid", flow_id);
        Ok(())
    } else {
        Err(anyhow!("flow has {} error(s)", report.errors.len()))
    }
}

async fn cmd_preview(config: &Config, flow_id: Uuid) -> Result<()> {
    use std::io::{self, BufRead, Write};

    let repo = store::open(config)?;
    let editor = StepEditor::new(repo);
    let graph = editor.load_graph(flow_id).await?;
    let mut sim = PreviewSimulator::new(graph)
        .with_invalid_message(config.simulator.invalid_option_message.clone());
    sim.start()?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut shown: Option<Uuid> = None;
    loop {
        match sim.state() {
            SimulatorState::Running { step_id } => {
                if shown != Some(step_id) {
                    if let Some(screen) = sim.screen() {
                        println!("{}", screen);
                    }
                    shown = Some(step_id);
                }
            }
            SimulatorState::Ended => {
                if let Some(last) = sim.history().last() {
                    if shown != Some(last.step_id) {
                        println!("{}", last.menu_text);
                    }
                }
                println!("-- session ended --");
                break;
            }
            SimulatorState::Idle => break,
        }

        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };

        if let Err(e) = sim.submit(&line?) {
            if !e.is_recoverable() {
                return Err(e.into());
            }
            println!("{}", e);
        }
    }

    Ok(())
}

async fn cmd_scheduled(config: &Config) -> Result<()> {
    let repo = store::open(config)?;
    let manager = FlowManager::new(repo.clone(), config.flows.clone());
    let schedule = ScheduleManager::new(repo, manager);
    let pending = schedule.list_scheduled(Utc::now()).await?;

    if pending.is_empty() {
        println!("No flows scheduled");
        return Ok(());
    }

    println!("Scheduled Flows ({})", pending.len());
    println!("{}", "─".repeat(72));
    for item in &pending {
        println!(
            "{:>8}  {}  {} ({})",
            item.countdown,
            item.scheduled_publish_at.format("%Y-%m-%d %H:%M"),
            item.flow.name,
            item.flow.id
        );
    }

    Ok(())
}

async fn cmd_history(
    config: &Config,
    flow: Option<Uuid>,
    action: Option<String>,
    limit: usize,
) -> Result<()> {
    let repo = store::open(config)?;
    let history = HistoryLog::new(repo);

    let action = action
        .as_deref()
        .map(str::parse::<HistoryAction>)
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let entries = history
        .list(&HistoryFilter {
            flow_id: flow,
            action,
            limit: Some(limit),
        })
        .await?;

    if entries.is_empty() {
        println!("No history");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  {:<18} {:<10} {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.performed_by,
            entry.description
        );
    }

    Ok(())
}

async fn cmd_seed(config: &Config) -> Result<()> {
    let repo = store::open(config)?;
    let manager = FlowManager::new(repo.clone(), config.flows.clone());
    let editor = StepEditor::new(repo.clone())
        .with_default_timeout(config.flows.default_timeout_seconds);

    let summary = sample::seed(repo, &manager, &editor, &config.api.default_operator).await?;

    println!("Seeded sample data");
    println!("  MNO:     {} ({})", summary.mno.name, summary.mno.id);
    println!(
        "  Service: {} {} ({})",
        summary.service.name, summary.service.ussd_code, summary.service.id
    );
    println!("  Flow:    {} ({})", summary.flow.name, summary.flow.id);
    println!(
        "  {} steps, {} options",
        summary.steps, summary.options
    );

    Ok(())
}
