// Per-stack deletion workflow
//
// An explicit state enum with a pure transition function, a bounded retry
// counter and pluggable checkpoint storage. Side effects live in the
// orchestrator; nothing here performs I/O except the checkpoint stores.

pub mod counter;
pub mod deletion_workflow;
pub mod errors;
pub mod events;
pub mod persistence;
pub mod states;

// Re-export main types for convenient access
pub use counter::RetryCounter;
pub use deletion_workflow::DeletionWorkflow;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::DeletionEvent;
pub use persistence::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
pub use states::{DeletionState, FailureReason};
