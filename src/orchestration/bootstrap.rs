//! # Reaper Bootstrap
//!
//! Wires the selection coordinator, deletion orchestrator and scheduler from
//! configuration plus a set of client implementations, so the binary and the
//! integration tests assemble the reaper the same way.

use std::sync::Arc;
use tracing::{info, warn};

use super::deletion_orchestrator::DeletionOrchestrator;
use super::notification::TracingNotifier;
use super::scheduler::SchedulerDriver;
use crate::clients::{
    BranchDeletionQueue, NotificationChannel, StackDeletionRequester, StackExistenceChecker,
    StackInventory,
};
use crate::clock::{Clock, SystemClock};
use crate::config::ReaperConfig;
use crate::error::Result;
use crate::selection::SelectionCoordinator;
use crate::state_machine::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};

/// Client implementations the reaper talks to
#[derive(Clone)]
pub struct ReaperComponents {
    pub inventory: Arc<dyn StackInventory>,
    pub deleter: Arc<dyn StackDeletionRequester>,
    pub checker: Arc<dyn StackExistenceChecker>,
    pub queue: Option<Arc<dyn BranchDeletionQueue>>,
    /// Falls back to logging outcomes when unset
    pub notifier: Option<Arc<dyn NotificationChannel>>,
    /// Falls back to `workflow.checkpoint_dir`, then to memory
    pub checkpoints: Option<Arc<dyn CheckpointStore>>,
    pub clock: Arc<dyn Clock>,
}

impl ReaperComponents {
    /// Components where one client provides inventory, deletion and lookup
    pub fn from_stack_client<C>(client: Arc<C>) -> Self
    where
        C: StackInventory + StackDeletionRequester + StackExistenceChecker + 'static,
    {
        Self {
            inventory: client.clone(),
            deleter: client.clone(),
            checker: client,
            queue: None,
            notifier: None,
            checkpoints: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_queue(mut self, queue: Arc<dyn BranchDeletionQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationChannel>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

pub fn build_selection(
    config: Arc<ReaperConfig>,
    components: &ReaperComponents,
) -> SelectionCoordinator {
    SelectionCoordinator::new(
        config,
        components.inventory.clone(),
        components.queue.clone(),
        components.clock.clone(),
    )
}

pub async fn build_scheduler(
    config: Arc<ReaperConfig>,
    components: ReaperComponents,
) -> Result<SchedulerDriver> {
    let checkpoints: Arc<dyn CheckpointStore> = match (
        &components.checkpoints,
        &config.workflow.checkpoint_dir,
    ) {
        (Some(store), _) => store.clone(),
        (None, Some(dir)) => {
            info!(directory = %dir.display(), "Using file workflow checkpoints");
            Arc::new(FileCheckpointStore::open(dir.clone()).await?)
        }
        (None, None) => {
            warn!("No checkpoint_dir configured; in-flight workflows will not survive a restart");
            Arc::new(InMemoryCheckpointStore::new())
        }
    };

    let notifier: Arc<dyn NotificationChannel> = components
        .notifier
        .clone()
        .unwrap_or_else(|| Arc::new(TracingNotifier));

    let selection = build_selection(config.clone(), &components);
    let orchestrator = DeletionOrchestrator::new(
        config.clone(),
        components.deleter.clone(),
        components.checker.clone(),
        notifier,
        checkpoints,
        components.clock.clone(),
    );

    Ok(SchedulerDriver::new(
        config,
        selection,
        orchestrator,
        components.clock,
    ))
}

/// Build the reaper against AWS using the standard credential chain
#[cfg(feature = "aws")]
pub async fn bootstrap_aws(config: Arc<ReaperConfig>) -> Result<SchedulerDriver> {
    let components = aws_components(&config).await;
    build_scheduler(config, components).await
}

#[cfg(feature = "aws")]
pub async fn aws_components(config: &ReaperConfig) -> ReaperComponents {
    let clients = crate::clients::aws::AwsClients::connect(config).await;

    let mut components = ReaperComponents::from_stack_client(clients.cloudformation);
    if let Some(queue) = clients.queue {
        components = components.with_queue(queue);
    }
    if let Some(notifier) = clients.notifier {
        components = components.with_notifier(notifier);
    }
    components
}
