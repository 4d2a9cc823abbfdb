use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a deletion workflow gave up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The stack still existed after the last permitted poll
    RetriesExhausted,
    /// The provider refused the deletion request
    DeleteRejected(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriesExhausted => write!(f, "retries exhausted"),
            Self::DeleteRejected(message) => write!(f, "delete rejected: {message}"),
        }
    }
}

/// Per-stack deletion workflow states
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeletionState {
    #[default]
    Start,
    AdvanceCounter,
    RequestDelete,
    /// Suspended until `resume_at`
    Wait { resume_at: DateTime<Utc> },
    Poll,
    Succeeded,
    Failed { reason: FailureReason },
}

impl DeletionState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AdvanceCounter => "advance_counter",
            Self::RequestDelete => "request_delete",
            Self::Wait { .. } => "wait",
            Self::Poll => "poll",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for DeletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
