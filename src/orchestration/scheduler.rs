//! # Scheduler Driver
//!
//! Fires a cleanup tick on a fixed period. Each tick selects candidates once
//! and hands them to the deletion orchestrator; nothing is carried from one
//! tick to the next except outstanding workflow checkpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

use super::deletion_orchestrator::{DeletionOrchestrator, FailedStack};
use crate::clock::Clock;
use crate::config::ReaperConfig;
use crate::error::Result;
use crate::policy::BranchDrainReport;
use crate::selection::SelectionCoordinator;

/// What one cleanup tick selected and how the deletions ended
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub selected: Vec<String>,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedStack>,
    pub resumed: usize,
    pub aborted: usize,
    pub branch_drain: Option<BranchDrainReport>,
}

pub struct SchedulerDriver {
    config: Arc<ReaperConfig>,
    selection: SelectionCoordinator,
    orchestrator: DeletionOrchestrator,
    clock: Arc<dyn Clock>,
}

impl SchedulerDriver {
    pub fn new(
        config: Arc<ReaperConfig>,
        selection: SelectionCoordinator,
        orchestrator: DeletionOrchestrator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            selection,
            orchestrator,
            clock,
        }
    }

    pub fn orchestrator(&self) -> &DeletionOrchestrator {
        &self.orchestrator
    }

    /// Select once, then run one deletion workflow per selected stack
    ///
    /// Selection failures abort the tick before any deletion is attempted.
    #[instrument(skip_all)]
    pub async fn run_cleanup_tick(&self) -> Result<TickReport> {
        let started_at = self.clock.now();
        let selection = self.selection.select().await?;
        let summary = self.orchestrator.run(&selection.candidates).await?;

        let report = TickReport {
            started_at,
            finished_at: self.clock.now(),
            selected: selection.candidates.names(),
            succeeded: summary.succeeded,
            failed: summary.failed,
            resumed: summary.resumed,
            aborted: summary.aborted,
            branch_drain: selection.branch_drain,
        };

        info!(
            selected = report.selected.len(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            resumed = report.resumed,
            "Cleanup tick finished"
        );

        Ok(report)
    }

    /// Tick every `scheduler.tick_period` until `shutdown` resolves
    ///
    /// A failed tick is logged and the loop waits for the next period. An
    /// in-flight tick is finished before shutdown is honored.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let period = self.config.scheduler.tick_period();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if !self.config.scheduler.run_on_start {
            // The first tick of an interval completes immediately
            ticker.tick().await;
        }

        info!(
            period_seconds = period.as_secs(),
            run_on_start = self.config.scheduler.run_on_start,
            "Scheduler started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cleanup_tick().await {
                        error!(error = %e, "Cleanup tick failed");
                    }
                }
            }
        }

        Ok(())
    }
}
