use chrono::{DateTime, Utc};

use super::tags;
use super::PolicyKind;
use crate::constants::SECONDS_IN_AN_HOUR;
use crate::logging::log_policy_decision;
use crate::models::Stack;

const MILLIS_IN_AN_HOUR: i64 = SECONDS_IN_AN_HOUR * 1000;

/// Whole hours elapsed since `creation_time`, rounded down
pub fn hours_alive(creation_time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - creation_time)
        .num_milliseconds()
        .div_euclid(MILLIS_IN_AN_HOUR)
}

/// Selects stacks that have outlived their `time-to-live-hours` tag
#[derive(Debug, Clone)]
pub struct TimeToLivePolicy {
    tag_key: String,
}

impl TimeToLivePolicy {
    pub fn new(tag_key: impl Into<String>) -> Self {
        Self {
            tag_key: tag_key.into(),
        }
    }

    pub fn is_expired(&self, stack: &Stack, now: DateTime<Utc>) -> bool {
        let Some(ttl) = tags::time_to_live_hours(stack, &self.tag_key) else {
            return false;
        };
        let alive = hours_alive(stack.creation_time, now);
        let expired = alive >= ttl;

        log_policy_decision(
            PolicyKind::TimeToLive.as_str(),
            &stack.name,
            expired,
            Some(&format!("hours alive {alive}, time to live {ttl}")),
        );
        expired
    }

    /// `now` is sampled once by the caller for the whole evaluation
    pub fn select(&self, stacks: &[Stack], now: DateTime<Utc>) -> Vec<Stack> {
        stacks
            .iter()
            .filter(|stack| stack.is_ok_to_touch() && self.is_expired(stack, now))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::tags::TIME_TO_LIVE_HOURS;
    use crate::models::StackStatus;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, 29, 21, 44, 28).unwrap()
    }

    fn stack_with_ttl(ttl: &str) -> Stack {
        Stack::new("demo", StackStatus::CreateComplete, created_at())
            .with_tag(TIME_TO_LIVE_HOURS, ttl)
    }

    #[test]
    fn test_hours_alive_rounds_down() {
        let start = created_at();
        assert_eq!(hours_alive(start, start), 0);
        assert_eq!(hours_alive(start, start + Duration::minutes(59)), 0);
        assert_eq!(hours_alive(start, start + Duration::minutes(60)), 1);
        assert_eq!(hours_alive(start, start + Duration::hours(73) - Duration::seconds(1)), 72);
        assert_eq!(hours_alive(start, start - Duration::seconds(1)), -1);
    }

    #[test]
    fn test_exact_boundary_selects() {
        let policy = TimeToLivePolicy::new(TIME_TO_LIVE_HOURS);
        let stacks = vec![stack_with_ttl("72")];

        let at_boundary = created_at() + Duration::hours(72);
        assert_eq!(policy.select(&stacks, at_boundary).len(), 1);

        let just_before = at_boundary - Duration::seconds(1);
        assert!(policy.select(&stacks, just_before).is_empty());
    }

    #[test]
    fn test_missing_or_malformed_tag_never_selects() {
        let policy = TimeToLivePolicy::new(TIME_TO_LIVE_HOURS);
        let far_future = created_at() + Duration::days(3650);
        let stacks = vec![
            Stack::new("untagged", StackStatus::CreateComplete, created_at()),
            stack_with_ttl("forever"),
        ];
        assert!(policy.select(&stacks, far_future).is_empty());
    }

    #[test]
    fn test_transitional_status_is_skipped() {
        let policy = TimeToLivePolicy::new(TIME_TO_LIVE_HOURS);
        let mut stack = stack_with_ttl("1");
        stack.status = StackStatus::UpdateInProgress;
        assert!(policy
            .select(&[stack], created_at() + Duration::hours(5))
            .is_empty());
    }

    proptest! {
        #[test]
        fn prop_selection_matches_boundary(ttl in 0i64..10_000, offset_secs in -7_200i64..7_200) {
            let policy = TimeToLivePolicy::new(TIME_TO_LIVE_HOURS);
            let stacks = vec![stack_with_ttl(&ttl.to_string())];
            let now = created_at() + Duration::hours(ttl) + Duration::seconds(offset_secs);

            let selected = !policy.select(&stacks, now).is_empty();
            prop_assert_eq!(selected, offset_secs >= 0);
        }
    }
}
