use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use super::tags;
use super::PolicyKind;
use crate::config::{ConfigResult, QuietWindowConfig};
use crate::logging::log_policy_decision;
use crate::models::Stack;

/// Recurring local-time window during which opted-in stacks are reaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietWindow {
    pub timezone: Tz,
    pub weekday: Weekday,
    /// Exclusive local hour at which the window closes
    pub end_hour: u32,
}

impl QuietWindow {
    pub fn from_config(config: &QuietWindowConfig) -> ConfigResult<Self> {
        Ok(Self {
            timezone: config.parsed_timezone()?,
            weekday: config.parsed_weekday()?,
            end_hour: config.end_hour,
        })
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.timezone);
        local.weekday() == self.weekday && local.hour() < self.end_hour
    }
}

impl Default for QuietWindow {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::US::Pacific,
            weekday: Weekday::Sat,
            end_hour: crate::constants::quiet_window::DEFAULT_END_HOUR,
        }
    }
}

/// Selects opted-in stacks while the quiet window is open
#[derive(Debug, Clone)]
pub struct QuietWindowPolicy {
    window: QuietWindow,
    tag_key: String,
    affirmative_value: String,
}

impl QuietWindowPolicy {
    pub fn new(
        window: QuietWindow,
        tag_key: impl Into<String>,
        affirmative_value: impl Into<String>,
    ) -> Self {
        Self {
            window,
            tag_key: tag_key.into(),
            affirmative_value: affirmative_value.into(),
        }
    }

    pub fn window(&self) -> &QuietWindow {
        &self.window
    }

    /// The window is checked once; outside it nothing is selected
    pub fn select(&self, stacks: &[Stack], now: DateTime<Utc>) -> Vec<Stack> {
        if !self.window.is_active(now) {
            tracing::debug!(now = %now, "Quiet window closed");
            return Vec::new();
        }

        stacks
            .iter()
            .filter(|stack| {
                let opted_in = stack.is_ok_to_touch()
                    && tags::is_affirmative(stack, &self.tag_key, &self.affirmative_value);
                log_policy_decision(PolicyKind::QuietWindow.as_str(), &stack.name, opted_in, None);
                opted_in
            })
            .cloned()
            .collect()
    }
}
