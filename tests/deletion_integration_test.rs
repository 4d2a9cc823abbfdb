//! Cleanup ticks from selection through deletion and notification

mod common;

use chrono::Duration;
use std::sync::Arc;

use common::*;
use stack_reaper::clients::ClientError;
use stack_reaper::orchestration::{build_scheduler, ReaperComponents};
use stack_reaper::state_machine::{
    CheckpointStore, DeletionEvent, DeletionWorkflow, FailureReason, FileCheckpointStore,
    RetryCounter,
};

#[tokio::test]
async fn test_tick_deletes_union_and_notifies_each_stack() {
    let now = saturday_in_quiet_window();
    let harness = Harness::new(
        vec![
            expired_stack("ttl-a", now),
            quiet_window_stack("quiet-a", now),
            branch_stack("feature-x-api", "feature-x", now),
            fresh_stack("keep", now),
        ],
        now,
    );
    harness.queue.send_branch("feature-x");

    let report = harness.driver().await.run_cleanup_tick().await.unwrap();

    assert_eq!(report.selected.len(), 3);
    assert_eq!(report.succeeded.len(), 3);
    assert!(report.failed.is_empty());
    assert_eq!(harness.cloud.stack_names(), vec!["keep".to_string()]);

    let mut texts = harness.notifier.texts();
    texts.sort();
    assert_eq!(
        texts,
        vec![
            ":white_check_mark: *StackDeleteSucceeded* | feature-x-api".to_string(),
            ":white_check_mark: *StackDeleteSucceeded* | quiet-a".to_string(),
            ":white_check_mark: *StackDeleteSucceeded* | ttl-a".to_string(),
        ]
    );
    assert!(harness
        .notifier
        .published()
        .iter()
        .all(|envelope| envelope.detail_type == "StackDeleteCompleted"));
    assert!(harness.checkpoints.is_empty());
}

#[tokio::test]
async fn test_branch_message_acknowledged_once_its_stacks_are_gone() {
    let now = tuesday_afternoon();
    let harness = Harness::new(vec![branch_stack("feature-x-api", "feature-x", now)], now);
    harness.queue.send_branch("feature-x");
    let driver = harness.driver().await;

    let first = driver.run_cleanup_tick().await.unwrap();
    assert_eq!(first.succeeded, vec!["feature-x-api".to_string()]);
    assert_eq!(harness.queue.len(), 1);

    let second = driver.run_cleanup_tick().await.unwrap();
    assert!(second.selected.is_empty());
    assert_eq!(second.branch_drain.unwrap().acknowledged, 1);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn test_stuck_stack_fails_after_retry_limit_and_is_reselected() {
    let now = tuesday_afternoon();
    let harness = Harness::with_cloud(
        stack_reaper::clients::in_memory::InMemoryCloudFormation::new(vec![expired_stack(
            "stuck", now,
        )])
        .stuck("stuck"),
        now,
    );
    let driver = harness.driver().await;

    let report = driver.run_cleanup_tick().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].reason, FailureReason::RetriesExhausted);
    assert_eq!(harness.cloud.deletion_request_count("stuck"), 6);
    assert_eq!(
        harness.notifier.texts(),
        vec![":x: *StackDeleteFailed* | stuck".to_string()]
    );
    assert_eq!(harness.clock.sleeps().len(), 6);

    let again = driver.run_cleanup_tick().await.unwrap();
    assert_eq!(again.selected, vec!["stuck".to_string()]);
}

#[tokio::test]
async fn test_rejected_delete_reports_failure_without_polling() {
    let now = tuesday_afternoon();
    let harness = Harness::with_cloud(
        stack_reaper::clients::in_memory::InMemoryCloudFormation::new(vec![expired_stack(
            "locked", now,
        )])
        .fail_deletion(
            "locked",
            ClientError::service("DeleteStack", "termination protection is enabled"),
        ),
        now,
    );

    let report = harness.driver().await.run_cleanup_tick().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        &report.failed[0].reason,
        FailureReason::DeleteRejected(message) if message.contains("termination protection")
    ));
    assert_eq!(harness.cloud.lookup_count("locked"), 0);
    assert_eq!(harness.notifier.published()[0].detail_type, "StackDeleteFailed");
}

#[tokio::test]
async fn test_failing_notifier_does_not_change_outcome() {
    let now = tuesday_afternoon();
    let harness = Harness::new(vec![expired_stack("old", now)], now);
    let components = harness
        .components()
        .with_notifier(Arc::new(
            stack_reaper::clients::in_memory::InMemoryNotifier::failing(),
        ));

    let driver = build_scheduler(Arc::new(harness.config.clone()), components)
        .await
        .unwrap();
    let report = driver.run_cleanup_tick().await.unwrap();

    assert_eq!(report.succeeded, vec!["old".to_string()]);
    assert!(!harness.cloud.contains("old"));
}

#[tokio::test]
async fn test_file_checkpoint_resumes_waiting_workflow_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let now = tuesday_afternoon();

    // A previous process requested deletion and was waiting when it stopped
    let store = FileCheckpointStore::open(dir.path()).await.unwrap();
    let waiting = DeletionWorkflow::new("half-deleted", RetryCounter::new(0, 1, 6))
        .apply(&DeletionEvent::Begin)
        .unwrap()
        .apply(&DeletionEvent::CounterAdvanced)
        .unwrap()
        .apply(&DeletionEvent::DeleteAccepted {
            resume_at: now + Duration::seconds(240),
        })
        .unwrap();
    store.save(&waiting).await.unwrap();

    let harness = Harness::new(Vec::new(), now);
    let mut config = harness.config.clone();
    config.workflow.checkpoint_dir = Some(dir.path().to_path_buf());

    let components = ReaperComponents::from_stack_client(harness.cloud.clone())
        .with_notifier(harness.notifier.clone())
        .with_clock(harness.clock.clone());
    let driver = build_scheduler(Arc::new(config), components).await.unwrap();

    let report = driver.run_cleanup_tick().await.unwrap();

    assert_eq!(report.resumed, 1);
    assert_eq!(report.succeeded, vec!["half-deleted".to_string()]);
    assert_eq!(harness.clock.sleeps(), vec![std::time::Duration::from_secs(240)]);
    assert!(harness.cloud.deletion_requests().is_empty());
    assert!(store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrency_cap_bounds_active_workflows() {
    let now = tuesday_afternoon();
    let stacks = (0..20)
        .map(|i| expired_stack(&format!("old-{i:02}"), now))
        .collect();
    let mut harness = Harness::new(stacks, now);
    harness.config.workflow.max_concurrent_workflows = 3;

    let driver = harness.driver().await;
    let report = driver.run_cleanup_tick().await.unwrap();

    assert_eq!(report.succeeded.len(), 20);
    assert!(driver.orchestrator().stats().peak() <= 3);
    assert_eq!(driver.orchestrator().stats().completed(), 20);
}
