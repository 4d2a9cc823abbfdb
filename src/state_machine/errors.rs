use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Checkpoint operation failed for {stack_name}: {reason}")]
    PersistenceFailed { stack_name: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateMachineError {
    pub fn invalid_transition(from: impl Into<String>, event: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            event: event.into(),
        }
    }

    pub fn persistence(stack_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::PersistenceFailed {
            stack_name: stack_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
