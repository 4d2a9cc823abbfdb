//! End-to-end selection over the in-memory stack inventory and queue

mod common;

use common::*;
use stack_reaper::models::{Stack, StackStatus};
use stack_reaper::policy::PolicyKind;
use std::collections::HashSet;

/// 15 stacks: 5 expired, 5 opted into the quiet window, 2 on a deleted branch,
/// 3 that nothing should touch
fn mixed_inventory(now: chrono::DateTime<chrono::Utc>) -> Vec<Stack> {
    let mut stacks = Vec::new();
    for i in 0..5 {
        stacks.push(expired_stack(&format!("ttl-{i}"), now));
        stacks.push(quiet_window_stack(&format!("quiet-{i}"), now));
    }
    stacks.push(branch_stack("feature-x-backend", "feature-x", now));
    stacks.push(branch_stack("feature-x-frontend", "feature-x", now));
    stacks.push(fresh_stack("untagged", now));
    stacks.push(branch_stack("main-backend", "main", now));
    stacks.push(branch_stack("feature-y-backend", "feature-y", now));
    stacks
}

#[tokio::test]
async fn test_selection_is_union_of_policies() {
    let now = saturday_in_quiet_window();
    let harness = Harness::new(mixed_inventory(now), now);
    harness.queue.send_branch("feature-x");

    let outcome = harness.selection().select().await.unwrap();

    assert_eq!(outcome.inventory_size, 15);
    assert_eq!(outcome.candidates.len(), 12);
    assert_eq!(outcome.candidates.count_for(PolicyKind::TimeToLive), 5);
    assert_eq!(outcome.candidates.count_for(PolicyKind::QuietWindow), 5);
    assert_eq!(outcome.candidates.count_for(PolicyKind::BranchDeletion), 2);
    assert!(outcome.candidates.contains("feature-x-frontend"));
    assert!(!outcome.candidates.contains("untagged"));
    assert!(!outcome.candidates.contains("feature-y-backend"));
}

#[tokio::test]
async fn test_overlapping_policies_select_each_stack_once() {
    let now = saturday_in_quiet_window();
    let mut stacks: Vec<Stack> = (0..5)
        .map(|i| {
            expired_stack(&format!("both-{i}"), now).with_tag(
                stack_reaper::constants::tags::TURN_OFF_ON_FRIDAY_NIGHT,
                stack_reaper::constants::tags::AFFIRMATIVE_VALUE,
            )
        })
        .collect();
    stacks.push(branch_stack("feature-x-a", "feature-x", now));
    stacks.push(
        branch_stack("feature-x-b", "feature-x", now)
            .with_tag(stack_reaper::constants::tags::TIME_TO_LIVE_HOURS, "1"),
    );
    for i in 0..8 {
        stacks.push(fresh_stack(&format!("idle-{i}"), now));
    }
    assert_eq!(stacks.len(), 15);

    let harness = Harness::new(stacks, now);
    harness.queue.send_branch("feature-x");

    let outcome = harness.selection().select().await.unwrap();
    let names = outcome.candidates.names();
    let unique: HashSet<&String> = names.iter().collect();

    assert_eq!(names.len(), unique.len());
    assert_eq!(outcome.candidates.len(), 7);

    let both = outcome.candidates.get("both-0").unwrap();
    assert!(both.reasons.contains(&PolicyKind::TimeToLive));
    assert!(both.reasons.contains(&PolicyKind::QuietWindow));
}

#[tokio::test]
async fn test_quiet_window_policy_idle_outside_window() {
    let now = tuesday_afternoon();
    let harness = Harness::new(mixed_inventory(now), now);

    let outcome = harness.selection().select().await.unwrap();

    assert_eq!(outcome.candidates.count_for(PolicyKind::QuietWindow), 0);
    assert_eq!(outcome.candidates.len(), 5);
}

#[tokio::test]
async fn test_protected_branch_message_is_kept_and_selects_nothing() {
    let now = tuesday_afternoon();
    let harness = Harness::new(vec![branch_stack("main-backend", "main", now)], now);
    harness.queue.send_branch("main");

    let outcome = harness.selection().select().await.unwrap();

    assert!(outcome.candidates.is_empty());
    assert!(harness.queue.acknowledged().is_empty());
    assert_eq!(harness.queue.len(), 1);
    assert_eq!(outcome.branch_drain.unwrap().protected_skipped, 1);
}

#[tokio::test]
async fn test_zero_match_message_is_acknowledged_and_matching_is_not() {
    let now = tuesday_afternoon();
    let harness = Harness::new(vec![branch_stack("feature-x-api", "feature-x", now)], now);
    harness.queue.send_branch("feature-gone");
    harness.queue.send_branch("feature-x");

    let outcome = harness.selection().select().await.unwrap();

    assert_eq!(outcome.candidates.names(), vec!["feature-x-api".to_string()]);
    assert_eq!(harness.queue.acknowledged().len(), 1);
    assert_eq!(
        harness.queue.bodies(),
        vec![stack_reaper::models::BranchDeletionMessage::new("feature-x").to_body()]
    );

    let drain = outcome.branch_drain.unwrap();
    assert_eq!(drain.acknowledged, 1);
    assert_eq!(drain.retained, 1);
}

#[tokio::test]
async fn test_stacks_in_progress_are_never_selected() {
    let now = saturday_in_quiet_window();
    let busy = Stack::new(
        "busy",
        StackStatus::UpdateInProgress,
        now - chrono::Duration::hours(100),
    )
    .with_tag(stack_reaper::constants::tags::TIME_TO_LIVE_HOURS, "1");
    let harness = Harness::new(vec![busy], now);

    let outcome = harness.selection().select().await.unwrap();

    assert_eq!(outcome.inventory_size, 1);
    assert_eq!(outcome.eligible_size, 0);
    assert!(outcome.candidates.is_empty());
}

#[tokio::test]
async fn test_disabled_branch_policy_leaves_queue_untouched() {
    let now = tuesday_afternoon();
    let mut harness = Harness::new(vec![branch_stack("feature-x-api", "feature-x", now)], now);
    harness.config.policies.branch_deletion.enabled = false;
    harness.queue.send_branch("feature-x");

    let outcome = harness.selection().select().await.unwrap();

    assert!(outcome.candidates.is_empty());
    assert!(outcome.branch_drain.is_none());
    assert_eq!(harness.queue.receive_calls(), 0);
}

#[tokio::test]
async fn test_queue_receive_failure_aborts_selection() {
    let now = tuesday_afternoon();
    let harness = Harness::new(vec![expired_stack("old", now)], now);
    harness
        .queue
        .fail_receive(stack_reaper::clients::ClientError::timeout("ReceiveMessage", 2));

    assert!(harness.selection().select().await.is_err());
}

#[tokio::test]
async fn test_branch_message_held_while_stack_is_updating() {
    let now = tuesday_afternoon();
    let updating = Stack::new(
        "feature-x-api",
        StackStatus::UpdateInProgress,
        now - chrono::Duration::minutes(5),
    )
    .with_tag(stack_reaper::constants::tags::BRANCH, "feature-x");
    let harness = Harness::new(vec![updating], now);
    harness.queue.send_branch("feature-x");

    let outcome = harness.selection().select().await.unwrap();

    assert!(outcome.candidates.is_empty());
    assert!(harness.queue.acknowledged().is_empty());
    assert_eq!(harness.queue.len(), 1);
    assert_eq!(outcome.branch_drain.unwrap().retained, 1);
}
