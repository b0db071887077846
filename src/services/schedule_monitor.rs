//! Schedule Monitor Service - Background refresh of pending publications.
//!
//! - Recomputes countdowns every `schedule.refresh_interval_secs`
//! - With `schedule.auto_publish`, publishes flows whose time has passed
//! - Reports through an event channel

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::flows::{ScheduleManager, ScheduledFlow};

/// Event emitted on every refresh
#[derive(Debug, Clone)]
pub enum ScheduleEvent {
    /// Current pending publications with fresh countdowns
    Refreshed(Vec<ScheduledFlow>),
    /// A due flow was published automatically
    Published { flow_id: Uuid, name: String },
}

/// Background service that watches scheduled flows
pub struct ScheduleMonitor {
    schedule: ScheduleManager,
    refresh_interval: Duration,
    auto_publish: bool,
    event_tx: mpsc::UnboundedSender<ScheduleEvent>,
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl ScheduleMonitor {
    pub fn new(
        schedule: ScheduleManager,
        config: &ScheduleConfig,
        event_tx: mpsc::UnboundedSender<ScheduleEvent>,
    ) -> Self {
        Self {
            schedule,
            refresh_interval: Duration::from_secs(config.refresh_interval_secs.max(1)),
            auto_publish: config.auto_publish,
            event_tx,
            shutdown_rx: None,
        }
    }

    /// Set shutdown receiver
    pub fn with_shutdown(mut self, rx: mpsc::Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Run the monitor loop
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Schedule monitor started, refresh interval: {:?}, auto-publish: {}",
            self.refresh_interval, self.auto_publish
        );

        let mut interval = tokio::time::interval(self.refresh_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Error refreshing scheduled flows: {}", e);
                    }
                }
                _ = async {
                    if let Some(ref mut rx) = self.shutdown_rx {
                        rx.recv().await
                    } else {
                        std::future::pending::<Option<()>>().await
                    }
                } => {
                    info!("Schedule monitor shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// One refresh: publish what is due (if enabled), then report countdowns
    pub async fn tick(&self) -> Result<()> {
        let now = Utc::now();

        if self.auto_publish {
            for flow in self.schedule.publish_due(now).await? {
                info!(flow_id = %flow.id, "Auto-published scheduled flow");
                self.emit(ScheduleEvent::Published {
                    flow_id: flow.id,
                    name: flow.name,
                });
            }
        }

        let pending = self.schedule.list_scheduled(now).await?;
        debug!("{} flows pending publication", pending.len());
        self.emit(ScheduleEvent::Refreshed(pending));
        Ok(())
    }

    fn emit(&self, event: ScheduleEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Schedule event receiver dropped");
        }
    }
}
