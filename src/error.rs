use thiserror::Error;

use crate::clients::ClientError;
use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;

/// Crate-level error for a reaper tick
#[derive(Debug, Error)]
pub enum ReaperError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    #[error("Orchestration error: {0}")]
    Orchestration(String),
}

impl ReaperError {
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::Orchestration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ReaperError>;
