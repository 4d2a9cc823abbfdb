//! Shared fixtures for the integration tests: stack builders, fixed instants
//! and a harness that wires the in-memory clients into a scheduler.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use stack_reaper::clients::in_memory::{InMemoryCloudFormation, InMemoryNotifier, InMemoryQueue};
use stack_reaper::clock::ManualClock;
use stack_reaper::config::ReaperConfig;
use stack_reaper::constants::tags::{
    AFFIRMATIVE_VALUE, BRANCH, TIME_TO_LIVE_HOURS, TURN_OFF_ON_FRIDAY_NIGHT,
};
use stack_reaper::models::{Stack, StackStatus};
use stack_reaper::orchestration::{build_scheduler, ReaperComponents, SchedulerDriver};
use stack_reaper::selection::SelectionCoordinator;
use stack_reaper::state_machine::InMemoryCheckpointStore;

/// Saturday 2022-09-03 02:02:22 in US/Pacific (daylight time)
pub fn saturday_in_quiet_window() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 9, 3, 9, 2, 22).unwrap()
}

/// Tuesday 2022-09-06 15:04:30 in US/Pacific
pub fn tuesday_afternoon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 9, 6, 22, 4, 30).unwrap()
}

pub fn fresh_stack(name: &str, now: DateTime<Utc>) -> Stack {
    Stack::new(name, StackStatus::CreateComplete, now - Duration::minutes(5))
}

pub fn expired_stack(name: &str, now: DateTime<Utc>) -> Stack {
    Stack::new(name, StackStatus::CreateComplete, now - Duration::hours(30))
        .with_tag(TIME_TO_LIVE_HOURS, "24")
}

pub fn quiet_window_stack(name: &str, now: DateTime<Utc>) -> Stack {
    fresh_stack(name, now).with_tag(TURN_OFF_ON_FRIDAY_NIGHT, AFFIRMATIVE_VALUE)
}

pub fn branch_stack(name: &str, branch: &str, now: DateTime<Utc>) -> Stack {
    fresh_stack(name, now).with_tag(BRANCH, branch)
}

/// In-memory clients sharing one manual clock
pub struct Harness {
    pub config: ReaperConfig,
    pub cloud: Arc<InMemoryCloudFormation>,
    pub queue: Arc<InMemoryQueue>,
    pub notifier: Arc<InMemoryNotifier>,
    pub checkpoints: Arc<InMemoryCheckpointStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(stacks: Vec<Stack>, now: DateTime<Utc>) -> Self {
        Self::with_cloud(InMemoryCloudFormation::new(stacks), now)
    }

    pub fn with_cloud(cloud: InMemoryCloudFormation, now: DateTime<Utc>) -> Self {
        Self {
            config: ReaperConfig::default(),
            cloud: Arc::new(cloud),
            queue: Arc::new(InMemoryQueue::new("branch-deletions")),
            notifier: Arc::new(InMemoryNotifier::new()),
            checkpoints: Arc::new(InMemoryCheckpointStore::new()),
            clock: Arc::new(ManualClock::new(now)),
        }
    }

    pub fn components(&self) -> ReaperComponents {
        ReaperComponents::from_stack_client(self.cloud.clone())
            .with_queue(self.queue.clone())
            .with_notifier(self.notifier.clone())
            .with_checkpoints(self.checkpoints.clone())
            .with_clock(self.clock.clone())
    }

    pub fn selection(&self) -> SelectionCoordinator {
        stack_reaper::orchestration::build_selection(
            Arc::new(self.config.clone()),
            &self.components(),
        )
    }

    pub async fn driver(&self) -> SchedulerDriver {
        build_scheduler(Arc::new(self.config.clone()), self.components())
            .await
            .expect("in-memory scheduler should build")
    }
}
