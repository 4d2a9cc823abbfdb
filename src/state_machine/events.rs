use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcomes of the side effect performed in each state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DeletionEvent {
    Begin,
    CounterAdvanced,
    /// Deletion accepted; resume polling at the given instant
    DeleteAccepted { resume_at: DateTime<Utc> },
    DeleteRejected(String),
    WaitElapsed,
    StackGone,
    StackPresent,
    /// Lookup failed; treated as "still exists"
    PollFailed(String),
}

impl DeletionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::CounterAdvanced => "counter_advanced",
            Self::DeleteAccepted { .. } => "delete_accepted",
            Self::DeleteRejected(_) => "delete_rejected",
            Self::WaitElapsed => "wait_elapsed",
            Self::StackGone => "stack_gone",
            Self::StackPresent => "stack_present",
            Self::PollFailed(_) => "poll_failed",
        }
    }
}
