//! Messages drained from the branch-deletion queue.

use serde::{Deserialize, Serialize};

/// Raw queue message with its delivery metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: String,
    /// Handle used to acknowledge (delete) this particular delivery
    pub receipt_handle: String,
    pub body: String,
    /// Approximate number of times the provider has delivered this message
    pub receive_count: u32,
}

/// Payload enqueued by the webhook collaborator when a branch is deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDeletionMessage {
    pub branch: String,
}

impl BranchDeletionMessage {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
        }
    }

    /// Parse a queue body of the form `{"branch": "..."}`
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn to_body(&self) -> String {
        serde_json::json!({ "branch": self.branch }).to_string()
    }
}
