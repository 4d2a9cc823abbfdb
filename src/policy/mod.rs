//! # Eligibility Policies
//!
//! Each policy looks at the same status-filtered inventory snapshot and
//! returns the subset of stacks it considers eligible for deletion:
//!
//! - **Time-to-live**: stacks alive at least as many hours as their
//!   `time-to-live-hours` tag allows
//! - **Quiet window**: opted-in stacks, but only early Saturday morning
//!   Pacific time
//! - **Branch deletion**: stacks whose `branch` tag names a branch reported
//!   deleted on the branch-deletion queue

pub mod branch_deletion;
pub mod quiet_window;
pub mod tags;
pub mod time_to_live;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use branch_deletion::{BranchDeletionPolicy, BranchDrainReport};
pub use quiet_window::{QuietWindow, QuietWindowPolicy};
pub use time_to_live::{hours_alive, TimeToLivePolicy};

/// Which policy selected a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    TimeToLive,
    QuietWindow,
    BranchDeletion,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeToLive => "time_to_live",
            Self::QuietWindow => "quiet_window",
            Self::BranchDeletion => "branch_deletion",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
