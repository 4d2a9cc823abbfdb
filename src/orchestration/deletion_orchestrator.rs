//! # Deletion Orchestrator
//!
//! Drives one [`DeletionWorkflow`] per selected stack, all concurrently but
//! never more than `workflow.max_concurrent_workflows` at a time. Workflows
//! beyond the cap wait for a free slot on the semaphore.
//!
//! ## Per-stack workflow
//!
//! ```text
//! Start -> AdvanceCounter -> RequestDelete -> Wait -> Poll
//!              ^                                       |
//!              +------------- still exists ------------+--> Succeeded | Failed
//! ```
//!
//! Each state performs one side effect, the result becomes a
//! [`DeletionEvent`], and the pure transition function picks the next state.
//! The workflow is checkpointed after every transition; outstanding
//! checkpoints are resumed on the next run and take precedence over a fresh
//! workflow for the same stack.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::notification::{publish_outcome, NotificationEvent};
use crate::clients::{NotificationChannel, StackDeletionRequester, StackExistenceChecker};
use crate::clock::Clock;
use crate::config::ReaperConfig;
use crate::error::{ReaperError, Result};
use crate::logging::log_stack_operation;
use crate::selection::DeletionCandidateSet;
use crate::state_machine::{
    CheckpointStore, DeletionEvent, DeletionState, DeletionWorkflow, FailureReason,
};

/// Concurrency gauges shared by all workflows of one orchestrator
#[derive(Debug, Default)]
pub struct OrchestratorStats {
    active: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl OrchestratorStats {
    fn enter(&self) {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of workflows that ever ran at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

struct ActiveGuard<'a>(&'a OrchestratorStats);

impl<'a> ActiveGuard<'a> {
    fn new(stats: &'a OrchestratorStats) -> Self {
        stats.enter();
        Self(stats)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.leave();
    }
}

/// Terminal result of one workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowOutcome {
    pub stack_name: String,
    pub attempts: u32,
    pub state: DeletionState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedStack {
    pub stack_name: String,
    pub reason: FailureReason,
}

/// Outcomes of one orchestration run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestrationSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedStack>,
    /// Workflows picked up from checkpoints rather than started fresh
    pub resumed: usize,
    /// Workflows that ended without an outcome (task panic or internal error)
    pub aborted: usize,
}

impl OrchestrationSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.aborted
    }

    fn record(&mut self, outcome: WorkflowOutcome) {
        match outcome.state {
            DeletionState::Succeeded => self.succeeded.push(outcome.stack_name),
            DeletionState::Failed { reason } => self.failed.push(FailedStack {
                stack_name: outcome.stack_name,
                reason,
            }),
            _ => self.aborted += 1,
        }
    }
}

#[derive(Clone)]
pub struct DeletionOrchestrator {
    config: Arc<ReaperConfig>,
    deleter: Arc<dyn StackDeletionRequester>,
    checker: Arc<dyn StackExistenceChecker>,
    notifier: Arc<dyn NotificationChannel>,
    checkpoints: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
    semaphore: Arc<Semaphore>,
    stats: Arc<OrchestratorStats>,
}

impl DeletionOrchestrator {
    pub fn new(
        config: Arc<ReaperConfig>,
        deleter: Arc<dyn StackDeletionRequester>,
        checker: Arc<dyn StackExistenceChecker>,
        notifier: Arc<dyn NotificationChannel>,
        checkpoints: Arc<dyn CheckpointStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.workflow.max_concurrent_workflows));
        Self {
            config,
            deleter,
            checker,
            notifier,
            checkpoints,
            clock,
            semaphore,
            stats: Arc::new(OrchestratorStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<OrchestratorStats> {
        Arc::clone(&self.stats)
    }

    pub fn max_concurrent(&self) -> usize {
        self.config.workflow.max_concurrent_workflows
    }

    /// Run every outstanding checkpoint plus one workflow per candidate
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn run(&self, candidates: &DeletionCandidateSet) -> Result<OrchestrationSummary> {
        let mut workflows: BTreeMap<String, DeletionWorkflow> = BTreeMap::new();
        let mut summary = OrchestrationSummary::default();

        for checkpoint in self.checkpoints.load_all().await? {
            if checkpoint.is_terminal() {
                self.checkpoints.remove(&checkpoint.stack_name).await?;
                continue;
            }
            debug!(
                stack_name = %checkpoint.stack_name,
                state = %checkpoint.state,
                attempt = checkpoint.counter.index,
                "Resuming checkpointed workflow"
            );
            summary.resumed += 1;
            workflows.insert(checkpoint.stack_name.clone(), checkpoint);
        }

        for name in candidates.names() {
            workflows.entry(name.clone()).or_insert_with(|| {
                DeletionWorkflow::new(name, self.config.workflow.initial_counter())
            });
        }

        info!(
            workflows = workflows.len(),
            resumed = summary.resumed,
            max_concurrent = self.max_concurrent(),
            "Starting deletion workflows"
        );

        let mut tasks = JoinSet::new();
        for workflow in workflows.into_values() {
            let orchestrator = self.clone();
            tasks.spawn(async move {
                let _permit = Arc::clone(&orchestrator.semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| ReaperError::orchestration(format!("semaphore closed: {e}")))?;
                orchestrator.drive(workflow).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => summary.record(outcome),
                Ok(Err(e)) => {
                    error!(error = %e, "Deletion workflow aborted");
                    summary.aborted += 1;
                }
                Err(e) => {
                    error!(error = %e, "Deletion workflow task panicked");
                    summary.aborted += 1;
                }
            }
        }

        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            aborted = summary.aborted,
            peak_concurrency = self.stats.peak(),
            "Deletion workflows finished"
        );

        Ok(summary)
    }

    /// Step one workflow to a terminal state
    #[instrument(skip(self, workflow), fields(stack_name = %workflow.stack_name))]
    pub async fn drive(&self, mut workflow: DeletionWorkflow) -> Result<WorkflowOutcome> {
        let _active = ActiveGuard::new(&self.stats);

        while let Some(event) = self.perform(&workflow).await? {
            let next = workflow.apply(&event)?;
            log_stack_operation(
                event.event_type(),
                &next.stack_name,
                Some(next.counter.index),
                next.state.name(),
                match &event {
                    DeletionEvent::DeleteRejected(message) | DeletionEvent::PollFailed(message) => {
                        Some(message.as_str())
                    }
                    _ => None,
                },
            );
            workflow = next;

            if !workflow.is_terminal() {
                if let Err(e) = self.checkpoints.save(&workflow).await {
                    warn!(error = %e, "Failed to checkpoint deletion workflow");
                }
            }
        }

        let notification = match &workflow.state {
            DeletionState::Failed { reason } => {
                NotificationEvent::failure(&workflow.stack_name, reason.to_string())
            }
            _ => NotificationEvent::success(&workflow.stack_name),
        };
        publish_outcome(
            self.notifier.as_ref(),
            &self.config.notification.source,
            &notification,
        )
        .await;

        if let Err(e) = self.checkpoints.remove(&workflow.stack_name).await {
            warn!(error = %e, "Failed to remove finished workflow checkpoint");
        }

        Ok(WorkflowOutcome {
            stack_name: workflow.stack_name,
            attempts: workflow.counter.index,
            state: workflow.state,
        })
    }

    /// Perform the side effect of the current state; `None` once terminal
    ///
    /// Provider failures become events. Only a resume time that cannot be
    /// represented is an error.
    async fn perform(&self, workflow: &DeletionWorkflow) -> Result<Option<DeletionEvent>> {
        let stack_name = workflow.stack_name.as_str();

        let event = match &workflow.state {
            DeletionState::Start => DeletionEvent::Begin,
            DeletionState::AdvanceCounter => DeletionEvent::CounterAdvanced,
            DeletionState::RequestDelete => match self.deleter.request_deletion(stack_name).await {
                Ok(()) => DeletionEvent::DeleteAccepted {
                    resume_at: self.resume_at()?,
                },
                Err(e) => {
                    warn!(transient = e.is_transient(), error = %e, "Delete request rejected");
                    DeletionEvent::DeleteRejected(e.to_string())
                }
            },
            DeletionState::Wait { resume_at } => {
                let remaining = (*resume_at - self.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                if !remaining.is_zero() {
                    self.clock.sleep(remaining).await;
                }
                DeletionEvent::WaitElapsed
            }
            DeletionState::Poll => match self.checker.lookup_stack(stack_name).await {
                Ok(None) => DeletionEvent::StackGone,
                Ok(Some(status)) if status.is_deleted() => DeletionEvent::StackGone,
                Ok(Some(_)) => DeletionEvent::StackPresent,
                Err(e) => {
                    debug!(transient = e.is_transient(), error = %e, "Stack lookup failed");
                    DeletionEvent::PollFailed(e.to_string())
                }
            },
            DeletionState::Succeeded | DeletionState::Failed { .. } => return Ok(None),
        };

        Ok(Some(event))
    }

    /// When the wait after an accepted delete request ends
    fn resume_at(&self) -> Result<DateTime<Utc>> {
        let wait_seconds = self.config.workflow.wait_interval_seconds;
        chrono::Duration::try_seconds(i64::try_from(wait_seconds).unwrap_or(i64::MAX))
            .and_then(|wait| self.clock.now().checked_add_signed(wait))
            .ok_or_else(|| {
                ReaperError::orchestration(format!(
                    "wait interval of {wait_seconds}s overflows the resume time"
                ))
            })
    }
}
