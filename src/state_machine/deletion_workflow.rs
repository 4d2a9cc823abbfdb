use serde::{Deserialize, Serialize};

use super::counter::RetryCounter;
use super::errors::{StateMachineError, StateMachineResult};
use super::events::DeletionEvent;
use super::states::{DeletionState, FailureReason};

/// Deletion workflow for a single stack
///
/// Transitions are pure: `apply` returns the next workflow value and leaves
/// `self` untouched, so the orchestrator can checkpoint every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionWorkflow {
    pub stack_name: String,
    pub counter: RetryCounter,
    pub state: DeletionState,
}

impl DeletionWorkflow {
    pub fn new(stack_name: impl Into<String>, counter: RetryCounter) -> Self {
        Self {
            stack_name: stack_name.into(),
            counter,
            state: DeletionState::Start,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Compute the workflow that follows `event`
    pub fn apply(&self, event: &DeletionEvent) -> StateMachineResult<Self> {
        let mut counter = self.counter;

        let state = match (&self.state, event) {
            (DeletionState::Start, DeletionEvent::Begin) => DeletionState::AdvanceCounter,

            (DeletionState::AdvanceCounter, DeletionEvent::CounterAdvanced) => {
                counter = self.counter.advance();
                DeletionState::RequestDelete
            }

            (DeletionState::RequestDelete, DeletionEvent::DeleteAccepted { resume_at }) => {
                DeletionState::Wait {
                    resume_at: *resume_at,
                }
            }
            (DeletionState::RequestDelete, DeletionEvent::DeleteRejected(message)) => {
                DeletionState::Failed {
                    reason: FailureReason::DeleteRejected(message.clone()),
                }
            }

            (DeletionState::Wait { .. }, DeletionEvent::WaitElapsed) => DeletionState::Poll,

            (DeletionState::Poll, DeletionEvent::StackGone) => DeletionState::Succeeded,
            (DeletionState::Poll, DeletionEvent::StackPresent | DeletionEvent::PollFailed(_)) => {
                if self.counter.should_continue() {
                    DeletionState::AdvanceCounter
                } else {
                    DeletionState::Failed {
                        reason: FailureReason::RetriesExhausted,
                    }
                }
            }

            (from, event) => {
                return Err(StateMachineError::invalid_transition(
                    from.to_string(),
                    event.event_type(),
                ))
            }
        };

        Ok(Self {
            stack_name: self.stack_name.clone(),
            counter,
            state,
        })
    }
}
