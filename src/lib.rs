#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Stack Reaper
//!
//! Periodic cleanup service for ephemeral CloudFormation stacks.
//!
//! ## Overview
//!
//! On every tick the reaper lists the account's stacks, decides which ones
//! should go, and runs one bounded-retry deletion workflow per selected stack,
//! publishing a success or failure notification when each workflow ends.
//!
//! ## Selection Policies
//!
//! - **Time to live**: stacks tagged with a lifetime in hours that has elapsed
//! - **Quiet window**: opted-in stacks during the weekly maintenance window
//! - **Branch deletion**: stacks built from a git branch that has been deleted,
//!   driven by branch-deletion messages on a queue
//!
//! A stack selected by several policies is deleted once.
//!
//! ## Module Organization
//!
//! - [`models`] - Stack and queue message types
//! - [`clients`] - Cloud service seams plus AWS and in-memory implementations
//! - [`policy`] - The three selection policies
//! - [`selection`] - Candidate set construction
//! - [`state_machine`] - Per-stack deletion workflow and checkpoints
//! - [`orchestration`] - Deletion driver, notifications and the scheduler
//! - [`config`] - Layered TOML and environment configuration
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stack_reaper::clients::in_memory::InMemoryCloudFormation;
//! use stack_reaper::config::ReaperConfig;
//! use stack_reaper::orchestration::{build_scheduler, ReaperComponents};
//!
//! # async fn example() -> stack_reaper::Result<()> {
//! let cloud = Arc::new(InMemoryCloudFormation::new(Vec::new()));
//! let driver = build_scheduler(
//!     Arc::new(ReaperConfig::default()),
//!     ReaperComponents::from_stack_client(cloud),
//! )
//! .await?;
//!
//! let report = driver.run_cleanup_tick().await?;
//! println!("deleted {} stacks", report.succeeded.len());
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod policy;
pub mod selection;
pub mod state_machine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigLoader, ReaperConfig};
pub use error::{ReaperError, Result};
pub use models::{BranchDeletionMessage, QueueMessage, Stack, StackStatus, Tag};
pub use orchestration::{
    build_scheduler, DeletionOrchestrator, ReaperComponents, SchedulerDriver, TickReport,
};
pub use policy::PolicyKind;
pub use selection::{Candidate, DeletionCandidateSet, SelectionCoordinator, SelectionOutcome};
pub use state_machine::{DeletionState, DeletionWorkflow, RetryCounter};
