//! # Reaper Configuration
//!
//! Every threshold the reaper uses is explicit configuration handed to the
//! components at construction time. There is no process-wide mutable state,
//! so independent ticks with different configurations can run side by side.
//!
//! ## Sources
//!
//! - **Base file**: `config/reaper.toml`
//! - **Environment overlay**: `config/reaper.<env>.toml`, where `<env>` comes
//!   from `REAPER_ENV` (default `development`)
//! - **Variables**: `REAPER__<SECTION>__<KEY>` overrides, e.g.
//!   `REAPER__WORKFLOW__MAX_CONCURRENT_WORKFLOWS=10`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stack_reaper::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loaded = ConfigLoader::load()?;
//! let period = loaded.config().scheduler.tick_period();
//! let cap = loaded.config().workflow.max_concurrent_workflows;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{notification, queue, quiet_window, scheduler, tags, workflow};
use crate::state_machine::RetryCounter;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{ConfigLoader, LoadedConfig};

/// Root configuration structure mirroring `config/reaper.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    /// Cloud provider connection settings
    pub aws: AwsConfig,

    /// Tag keys the policies read
    pub tags: TagKeysConfig,

    /// Eligibility policy settings
    pub policies: PoliciesConfig,

    /// Per-stack deletion workflow settings
    pub workflow: WorkflowConfig,

    /// Periodic tick settings
    pub scheduler: SchedulerConfig,

    /// Outcome notification settings
    pub notification: NotificationConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: Option<String>,
    /// Alternate endpoint, e.g. a local emulator
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagKeysConfig {
    pub time_to_live_hours: String,
    pub turn_off_on_friday_night: String,
    pub branch: String,
    /// The only value of the quiet-window tag that opts a stack in
    pub affirmative_value: String,
}

impl Default for TagKeysConfig {
    fn default() -> Self {
        Self {
            time_to_live_hours: tags::TIME_TO_LIVE_HOURS.to_string(),
            turn_off_on_friday_night: tags::TURN_OFF_ON_FRIDAY_NIGHT.to_string(),
            branch: tags::BRANCH.to_string(),
            affirmative_value: tags::AFFIRMATIVE_VALUE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoliciesConfig {
    pub time_to_live: TimeToLiveConfig,
    pub quiet_window: QuietWindowConfig,
    pub branch_deletion: BranchDeletionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeToLiveConfig {
    pub enabled: bool,
}

impl Default for TimeToLiveConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietWindowConfig {
    pub enabled: bool,
    /// IANA time zone name the window is evaluated in
    pub timezone: String,
    /// Local weekday on which the window opens at midnight
    pub weekday: String,
    /// Local hour (exclusive) at which the window closes
    pub end_hour: u32,
}

impl Default for QuietWindowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: quiet_window::DEFAULT_TIMEZONE.to_string(),
            weekday: quiet_window::DEFAULT_WEEKDAY.to_string(),
            end_hour: quiet_window::DEFAULT_END_HOUR,
        }
    }
}

impl QuietWindowConfig {
    pub fn parsed_timezone(&self) -> ConfigResult<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            ConfigurationError::invalid_value(
                "policies.quiet_window.timezone",
                &self.timezone,
                "unknown IANA time zone",
            )
        })
    }

    pub fn parsed_weekday(&self) -> ConfigResult<Weekday> {
        self.weekday.parse::<Weekday>().map_err(|_| {
            ConfigurationError::invalid_value(
                "policies.quiet_window.weekday",
                &self.weekday,
                "expected a weekday name such as Saturday",
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchDeletionConfig {
    pub enabled: bool,
    /// Queue carrying branch-deletion messages; the policy is off without one
    pub queue_url: Option<String>,
    pub protected_branches: Vec<String>,
    /// Receive calls per tick
    pub max_batches: u32,
    /// Messages requested per receive call (provider maximum is 10)
    pub batch_size: i32,
    pub wait_seconds: i32,
    pub visibility_timeout_seconds: Option<i32>,
    /// Receive count at which the provider dead-letters a message
    pub max_receive_count: u32,
}

impl Default for BranchDeletionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_url: None,
            protected_branches: queue::PROTECTED_BRANCHES
                .iter()
                .map(|branch| branch.to_string())
                .collect(),
            max_batches: queue::DEFAULT_RECEIVE_BATCHES,
            batch_size: queue::MAX_RECEIVE_BATCH_SIZE,
            wait_seconds: queue::DEFAULT_WAIT_SECONDS,
            visibility_timeout_seconds: None,
            max_receive_count: queue::DEFAULT_MAX_RECEIVE_COUNT,
        }
    }
}

impl BranchDeletionConfig {
    pub fn is_protected(&self, branch: &str) -> bool {
        self.protected_branches.iter().any(|p| p == branch)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub retry_limit: u32,
    pub retry_step: u32,
    pub wait_interval_seconds: u64,
    pub max_concurrent_workflows: usize,
    /// Directory for durable workflow checkpoints; in-memory when unset
    ///
    /// Relative paths resolve against the working directory.
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            retry_limit: workflow::DEFAULT_RETRY_LIMIT,
            retry_step: workflow::DEFAULT_RETRY_STEP,
            wait_interval_seconds: workflow::DEFAULT_WAIT_INTERVAL_SECONDS,
            max_concurrent_workflows: workflow::DEFAULT_MAX_CONCURRENT_WORKFLOWS,
            checkpoint_dir: Some(PathBuf::from(workflow::DEFAULT_CHECKPOINT_DIR)),
        }
    }
}

impl WorkflowConfig {
    pub fn wait_interval(&self) -> Duration {
        Duration::from_secs(self.wait_interval_seconds)
    }

    /// Fresh counter for a new workflow
    pub fn initial_counter(&self) -> RetryCounter {
        RetryCounter::new(0, self.retry_step, self.retry_limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_period_seconds: u64,
    /// Fire the first tick immediately instead of after one period
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_seconds: scheduler::DEFAULT_TICK_PERIOD_SECONDS,
            run_on_start: true,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_period_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Publish to the event bus; outcomes are only logged otherwise
    pub enabled: bool,
    pub source: String,
    pub event_bus_name: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: notification::DEFAULT_SOURCE.to_string(),
            event_bus_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive; `RUST_LOG` still wins when set
    pub level: Option<String>,
    pub json: bool,
}

impl ReaperConfig {
    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, key) in [
            ("tags.time_to_live_hours", &self.tags.time_to_live_hours),
            (
                "tags.turn_off_on_friday_night",
                &self.tags.turn_off_on_friday_night,
            ),
            ("tags.branch", &self.tags.branch),
        ] {
            if key.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    field,
                    "tag key configuration",
                ));
            }
        }

        let quiet = &self.policies.quiet_window;
        quiet.parsed_timezone()?;
        quiet.parsed_weekday()?;
        if quiet.end_hour > 24 {
            return Err(ConfigurationError::invalid_value(
                "policies.quiet_window.end_hour",
                quiet.end_hour.to_string(),
                "hour must be between 0 and 24",
            ));
        }

        let branch = &self.policies.branch_deletion;
        if branch.batch_size <= 0 || branch.batch_size > queue::MAX_RECEIVE_BATCH_SIZE {
            return Err(ConfigurationError::invalid_value(
                "policies.branch_deletion.batch_size",
                branch.batch_size.to_string(),
                format!(
                    "batch size must be between 1 and {}",
                    queue::MAX_RECEIVE_BATCH_SIZE
                ),
            ));
        }
        if branch.wait_seconds < 0 {
            return Err(ConfigurationError::invalid_value(
                "policies.branch_deletion.wait_seconds",
                branch.wait_seconds.to_string(),
                "wait must not be negative",
            ));
        }

        if self.workflow.retry_step == 0 {
            return Err(ConfigurationError::invalid_value(
                "workflow.retry_step",
                "0",
                "retry step must be greater than 0",
            ));
        }
        if self.workflow.wait_interval_seconds > workflow::MAX_WAIT_INTERVAL_SECONDS {
            return Err(ConfigurationError::invalid_value(
                "workflow.wait_interval_seconds",
                self.workflow.wait_interval_seconds.to_string(),
                format!(
                    "wait interval must be at most {} seconds",
                    workflow::MAX_WAIT_INTERVAL_SECONDS
                ),
            ));
        }
        if self.workflow.max_concurrent_workflows == 0 {
            return Err(ConfigurationError::invalid_value(
                "workflow.max_concurrent_workflows",
                "0",
                "concurrency cap must be greater than 0",
            ));
        }

        if self.scheduler.tick_period_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduler.tick_period_seconds",
                "0",
                "tick period must be greater than 0",
            ));
        }

        if self.notification.source.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "notification.source",
                "notification configuration",
            ));
        }

        Ok(())
    }
}
