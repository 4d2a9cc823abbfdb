//! # Orchestration
//!
//! Turns a candidate set into finished deletions.
//!
//! ## Core Components
//!
//! - **DeletionOrchestrator**: bounded-concurrency driver for the per-stack
//!   deletion workflows
//! - **SchedulerDriver**: periodic tick that runs selection, then deletion
//! - **Notification**: renders and publishes success/failure outcomes
//! - **Bootstrap**: assembles all of the above from configuration

pub mod bootstrap;
pub mod deletion_orchestrator;
pub mod notification;
pub mod scheduler;

pub use bootstrap::{build_scheduler, build_selection, ReaperComponents};
pub use deletion_orchestrator::{
    DeletionOrchestrator, FailedStack, OrchestrationSummary, OrchestratorStats, WorkflowOutcome,
};
pub use notification::{NotificationEvent, NotificationKind, TracingNotifier};
pub use scheduler::{SchedulerDriver, TickReport};
