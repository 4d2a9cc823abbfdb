//! # System Constants
//!
//! Default values and fixed vocabulary shared by the policy engine and the
//! deletion orchestrator. Everything here that an operator may want to change
//! is mirrored by a field on [`crate::config::ReaperConfig`]; these constants
//! only provide the defaults.

/// Tag keys recognised on stacks
pub mod tags {
    pub const TIME_TO_LIVE_HOURS: &str = "time-to-live-hours";
    pub const TURN_OFF_ON_FRIDAY_NIGHT: &str = "turn-off-on-friday-night";
    pub const BRANCH: &str = "branch";

    /// The only value of the quiet-window tag treated as opt-in
    pub const AFFIRMATIVE_VALUE: &str = "yes";
}

/// Branch-deletion queue defaults
pub mod queue {
    /// Branches that are never reaped through the deletion queue
    pub const PROTECTED_BRANCHES: &[&str] = &["dev", "main"];

    /// Provider limit for a single receive call
    pub const MAX_RECEIVE_BATCH_SIZE: i32 = 10;
    pub const DEFAULT_RECEIVE_BATCHES: u32 = 4;
    pub const DEFAULT_WAIT_SECONDS: i32 = 2;

    /// Receive count at which the provider routes to the dead-letter queue
    pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 3;
}

/// Deletion workflow defaults
pub mod workflow {
    pub const DEFAULT_RETRY_LIMIT: u32 = 6;
    pub const DEFAULT_RETRY_STEP: u32 = 1;
    pub const DEFAULT_WAIT_INTERVAL_SECONDS: u64 = 600;
    pub const MAX_WAIT_INTERVAL_SECONDS: u64 = 24 * 60 * 60;
    pub const DEFAULT_MAX_CONCURRENT_WORKFLOWS: usize = 50;
    pub const DEFAULT_CHECKPOINT_DIR: &str = ".stack-reaper/checkpoints";
}

/// Scheduler defaults
pub mod scheduler {
    pub const DEFAULT_TICK_PERIOD_SECONDS: u64 = 2 * 60 * 60;
}

/// Quiet-window defaults ("Friday night in LA")
pub mod quiet_window {
    pub const DEFAULT_TIMEZONE: &str = "US/Pacific";
    pub const DEFAULT_WEEKDAY: &str = "Saturday";
    pub const DEFAULT_END_HOUR: u32 = 7;
}

/// Notification envelope vocabulary
pub mod notification {
    pub const DEFAULT_SOURCE: &str = "cdk-igvf-dev.cleaner.DemoCleaner";

    pub const SUCCESS_DETAIL_TYPE: &str = "StackDeleteCompleted";
    pub const FAILURE_DETAIL_TYPE: &str = "StackDeleteFailed";

    pub const SUCCESS_PREFIX: &str = ":white_check_mark: *StackDeleteSucceeded* |";
    pub const FAILURE_PREFIX: &str = ":x: *StackDeleteFailed* |";
}

pub const SECONDS_IN_AN_HOUR: i64 = 3600;
