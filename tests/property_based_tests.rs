mod common;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeSet;

use common::Harness;
use stack_reaper::constants::tags::TIME_TO_LIVE_HOURS;
use stack_reaper::models::{Stack, StackStatus};
use stack_reaper::policy::{PolicyKind, TimeToLivePolicy};
use stack_reaper::selection::DeletionCandidateSet;
use stack_reaper::state_machine::RetryCounter;

fn policy_strategy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![
        Just(PolicyKind::TimeToLive),
        Just(PolicyKind::QuietWindow),
        Just(PolicyKind::BranchDeletion),
    ]
}

proptest! {
    /// Property: however policies overlap, each stack appears once
    #[test]
    fn candidate_set_never_holds_duplicates(
        picks in prop::collection::vec((0usize..12, policy_strategy()), 0..60)
    ) {
        let created = Utc.with_ymd_and_hms(2022, 9, 1, 0, 0, 0).unwrap();
        let mut set = DeletionCandidateSet::new();
        let mut expected = BTreeSet::new();

        for (index, policy) in &picks {
            let name = format!("stack-{index}");
            set.insert(Stack::new(&name, StackStatus::CreateComplete, created), *policy);
            expected.insert(name);
        }

        let names = set.names();
        prop_assert_eq!(names.len(), expected.len());
        prop_assert_eq!(names.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    /// Property: a stack is expired exactly when whole hours alive reach its TTL
    #[test]
    fn time_to_live_matches_whole_hours(ttl in 0i64..500, alive_seconds in 0i64..2_000_000) {
        let now = Utc.with_ymd_and_hms(2022, 9, 6, 12, 0, 0).unwrap();
        let stack = Stack::new("s", StackStatus::CreateComplete, now - Duration::seconds(alive_seconds))
            .with_tag(TIME_TO_LIVE_HOURS, ttl.to_string());

        let expired = TimeToLivePolicy::new(TIME_TO_LIVE_HOURS).is_expired(&stack, now);
        prop_assert_eq!(expired, alive_seconds / 3600 >= ttl);
    }

    /// Property: the counter reaches its limit in ceil(limit / step) advances
    #[test]
    fn retry_counter_terminates(step in 1u32..10, limit in 1u32..50) {
        let mut counter = RetryCounter::new(0, step, limit);
        let mut advances = 0;
        while counter.should_continue() {
            counter = counter.advance();
            advances += 1;
        }
        prop_assert_eq!(advances, limit.div_ceil(step));
        prop_assert!(counter.index >= limit);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: selection over an inventory equals the set of expired stacks
    #[test]
    fn selection_matches_expired_stacks(ages in prop::collection::vec((0i64..72, 1i64..48), 1..20)) {
        let now = common::tuesday_afternoon();
        let stacks: Vec<Stack> = ages
            .iter()
            .enumerate()
            .map(|(i, (hours, ttl))| {
                Stack::new(format!("stack-{i:02}"), StackStatus::CreateComplete, now - Duration::hours(*hours))
                    .with_tag(TIME_TO_LIVE_HOURS, ttl.to_string())
            })
            .collect();
        let expected: BTreeSet<String> = ages
            .iter()
            .enumerate()
            .filter(|(_, (hours, ttl))| hours >= ttl)
            .map(|(i, _)| format!("stack-{i:02}"))
            .collect();

        let harness = Harness::new(stacks, now);
        let outcome = tokio_test::block_on(harness.selection().select()).unwrap();

        prop_assert_eq!(outcome.candidates.names().into_iter().collect::<BTreeSet<_>>(), expected);
    }
}
