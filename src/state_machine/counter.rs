use serde::{Deserialize, Serialize};

use crate::constants::workflow::{DEFAULT_RETRY_LIMIT, DEFAULT_RETRY_STEP};

/// Bounded attempt counter carried by each deletion workflow
///
/// `advance` never mutates: every step produces a new value, and
/// `should_continue` is evaluated on that advanced value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounter {
    pub index: u32,
    pub step: u32,
    pub limit: u32,
}

impl RetryCounter {
    pub fn new(index: u32, step: u32, limit: u32) -> Self {
        Self { index, step, limit }
    }

    pub fn advance(&self) -> Self {
        Self {
            index: self.index.saturating_add(self.step),
            ..*self
        }
    }

    pub fn should_continue(&self) -> bool {
        self.index < self.limit
    }
}

impl Default for RetryCounter {
    fn default() -> Self {
        Self::new(0, DEFAULT_RETRY_STEP, DEFAULT_RETRY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_advance_from_zero() {
        let next = RetryCounter::new(0, 1, 5).advance();
        assert_eq!(next, RetryCounter::new(1, 1, 5));
        assert!(next.should_continue());
    }

    #[test]
    fn test_advance_reaching_limit_stops() {
        let next = RetryCounter::new(5, 3, 8).advance();
        assert_eq!(next, RetryCounter::new(8, 3, 8));
        assert!(!next.should_continue());
    }

    #[test]
    fn test_default_allows_six_attempts() {
        let mut counter = RetryCounter::default();
        let mut attempts = 0;
        loop {
            counter = counter.advance();
            attempts += 1;
            if !counter.should_continue() {
                break;
            }
        }
        assert_eq!(attempts, 6);
    }

    proptest! {
        #[test]
        fn prop_advance_is_pure_and_monotonic(index in 0u32..1000, step in 1u32..50, limit in 0u32..1000) {
            let counter = RetryCounter::new(index, step, limit);
            let first = counter.advance();
            let second = counter.advance();

            prop_assert_eq!(first, second);
            prop_assert_eq!(first.index, index + step);
            prop_assert_eq!(first.step, step);
            prop_assert_eq!(first.limit, limit);
            prop_assert_eq!(first.should_continue(), index + step < limit);
        }
    }
}
