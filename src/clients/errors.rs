//! # Client Error Types
//!
//! Structured error handling for the cloud provider clients using thiserror
//! instead of `Box<dyn Error>` patterns.

use thiserror::Error;

/// Errors surfaced by inventory, deletion, queue and notification clients
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Provider call failed: {operation}: {message}")]
    Service { operation: String, message: String },

    #[error("Provider throttled {operation}: {message}")]
    Throttled { operation: String, message: String },

    #[error("Network timeout: operation {operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Queue operation failed: {queue}: {operation}: {message}")]
    QueueOperation {
        queue: String,
        operation: String,
        message: String,
    },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

}

impl ClientError {
    /// Create a provider service error
    pub fn service(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a throttling error
    pub fn throttled(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Throttled {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    /// Create a queue operation error
    pub fn queue_operation(
        queue: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue: queue.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later can reasonably succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Throttled { .. } | Self::Timeout { .. } | Self::QueueOperation { .. }
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::serialization(err.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_creation() {
        let err = ClientError::service("DeleteStack", "access denied");
        assert!(matches!(err, ClientError::Service { .. }));

        let err = ClientError::queue_operation("branch-deletions", "receive", "unreachable");
        assert!(matches!(err, ClientError::QueueOperation { .. }));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ClientError::throttled("DescribeStacks", "Rate exceeded").is_transient());
        assert!(ClientError::timeout("DescribeStacks", 30).is_transient());
        assert!(!ClientError::service("DeleteStack", "access denied").is_transient());
        assert!(!ClientError::serialization("unexpected token").is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::queue_operation("my_queue", "acknowledge", "receipt expired");
        let display = format!("{err}");
        assert!(display.contains("Queue operation failed"));
        assert!(display.contains("my_queue"));
        assert!(display.contains("acknowledge"));
        assert!(display.contains("receipt expired"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Serialization { .. }));
    }
}
