//! Typed reads of the tags the policies care about.

use tracing::warn;

use crate::models::Stack;

/// Parsed `time-to-live-hours` value; malformed values count as absent
pub fn time_to_live_hours(stack: &Stack, key: &str) -> Option<i64> {
    let tag = stack.tag(key)?;
    match tag.value.trim().parse::<i64>() {
        Ok(hours) => Some(hours),
        Err(e) => {
            warn!(
                stack_name = %stack.name,
                tag = %key,
                value = %tag.value,
                error = %e,
                "Tag value not int, ignoring"
            );
            None
        }
    }
}

/// Only the exact affirmative value opts a stack in
pub fn is_affirmative(stack: &Stack, key: &str, affirmative_value: &str) -> bool {
    stack.tag_value(key) == Some(affirmative_value)
}

pub fn branch<'a>(stack: &'a Stack, key: &str) -> Option<&'a str> {
    stack.tag_value(key)
}
